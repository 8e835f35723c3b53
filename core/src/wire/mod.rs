pub mod event;
pub mod parser;
pub mod sample;

pub use event::{BusEvent, ConnectionStatus, LinkStatus, SerialData, SerialError, SerialStatus};
pub use parser::{RawLine, Recovered, SampleParser};
pub use sample::{Sample, SampleClock, SampleId};
