// Run state and pipeline positions for the carrier migration job.
//
// The pipeline is a fixed linear sequence of four steps; the position of a run
// is derived from three monotonic completion flags held in RunState.

pub mod run_state;
pub mod states;

pub use run_state::{RunSnapshot, RunState};
pub use states::{PipelineStep, StepFlag};
