//! Windowed per-movement flow counts.

mod counter;
mod report;

pub use counter::{FlowCounter, FlowEvent, Window};
pub use report::{FlowReport, FlowTable};
