pub mod reader;
pub mod source;
