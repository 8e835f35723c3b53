pub mod pattern;
pub mod sweep;
