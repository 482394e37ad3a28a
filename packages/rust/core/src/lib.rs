//! Research run orchestration for TopicDesk.
//!
//! [`Pipeline`] drives one topic through the research, ideas, format and
//! publish stages. [`RunQueue`] executes pipelines in the background so the
//! webhook can acknowledge immediately.

pub mod pipeline;
pub mod queue;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use pipeline::{PageStatus, Pipeline, RunProgress, RunReport, SilentProgress, Stage};
pub use queue::{RunHandle, RunId, RunQueue, RunRecord, RunStatus};
