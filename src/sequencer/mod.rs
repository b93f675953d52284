pub mod catalog;
pub mod procedures;
#[allow(clippy::module_inception)]
pub mod sequencer;
pub mod step;

pub use catalog::RegisterCatalog;
pub use sequencer::{Readback, RunReport, Sequencer};
pub use step::{ConfigStep, Procedure};
