pub mod delay;
pub mod log;
pub mod sink;

pub use delay::{Delay, NoDelay, SleepDelay, SpinDelay};
pub use sink::{DebugSink, LogSink, NullSink, RecordingSink};
