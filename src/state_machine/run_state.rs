//! # Run State
//!
//! Shared record of the single migration run: whether it is active, which
//! carrier it targets and which pipeline steps have completed.
//!
//! Every accessor is atomic on its own field. There is no cross-field
//! transaction; the controller fully initializes state before the scheduler is
//! armed and ticks never start runs, so the two writers never interleave within
//! one logical step.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::states::{PipelineStep, StepFlag};

#[derive(Debug, Default)]
pub struct RunState {
    carrier: Mutex<Option<String>>,
    run_id: Mutex<Option<Uuid>>,
    active: AtomicBool,
    step_flags: [AtomicBool; 3],
}

/// Point-in-time copy of [`RunState`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    pub carrier: Option<String>,
    pub active: bool,
    pub step_flags: [bool; 3],
}

impl RunSnapshot {
    /// Step the next tick would execute, or `None` when idle
    pub fn current_step(&self) -> Option<PipelineStep> {
        self.active.then(|| PipelineStep::from_flags(self.step_flags))
    }

    /// True when the snapshot equals the state after a full reset
    pub fn is_idle(&self) -> bool {
        *self == RunSnapshot::default()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn carrier(&self) -> Option<String> {
        self.carrier.lock().clone()
    }

    pub fn set_carrier(&self, carrier: impl Into<String>) {
        *self.carrier.lock() = Some(carrier.into());
    }

    pub fn clear_carrier(&self) {
        *self.carrier.lock() = None;
    }

    pub fn run_id(&self) -> Option<Uuid> {
        *self.run_id.lock()
    }

    pub fn set_run_id(&self, run_id: Uuid) {
        *self.run_id.lock() = Some(run_id);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn is_step_completed(&self, flag: StepFlag) -> bool {
        self.step_flags[flag.index()].load(Ordering::SeqCst)
    }

    /// Mark a step as completed. Flags only move from false to true within a
    /// run; returns whether this call changed the flag.
    pub fn mark_step_completed(&self, flag: StepFlag) -> bool {
        !self.step_flags[flag.index()].swap(true, Ordering::SeqCst)
    }

    pub fn step_flags(&self) -> [bool; 3] {
        StepFlag::ALL.map(|flag| self.is_step_completed(flag))
    }

    /// Step the next tick should execute, derived from the flags
    pub fn current_step(&self) -> PipelineStep {
        PipelineStep::from_flags(self.step_flags())
    }

    /// Clear the step flags only
    pub fn reset_flags(&self) {
        for flag in &self.step_flags {
            flag.store(false, Ordering::SeqCst);
        }
    }

    /// Clear every field back to the idle state
    pub fn reset(&self) {
        self.set_active(false);
        self.reset_flags();
        self.clear_carrier();
        *self.run_id.lock() = None;
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id(),
            carrier: self.carrier(),
            active: self.is_active(),
            step_flags: self.step_flags(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_state_is_idle() {
        let state = RunState::new();
        assert!(state.snapshot().is_idle());
        assert_eq!(state.snapshot().current_step(), None);
        assert_eq!(state.current_step(), PipelineStep::UpdateSource);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let state = RunState::new();
        assert!(state.mark_step_completed(StepFlag::SourceUpdated));
        assert!(!state.mark_step_completed(StepFlag::SourceUpdated));
        assert!(state.is_step_completed(StepFlag::SourceUpdated));
        assert_eq!(state.current_step(), PipelineStep::InsertSourceHistory);
    }

    #[test]
    fn test_reset_clears_everything() {
        let state = RunState::new();
        state.set_carrier("CARR1");
        state.set_run_id(Uuid::new_v4());
        state.set_active(true);
        for flag in StepFlag::ALL {
            state.mark_step_completed(flag);
        }
        assert_eq!(
            state.snapshot().current_step(),
            Some(PipelineStep::InsertSecondaryHistory)
        );

        state.reset();

        assert!(state.snapshot().is_idle());
        assert_eq!(state.carrier(), None);
        assert_eq!(state.run_id(), None);
    }

    #[test]
    fn test_concurrent_access_is_race_free() {
        let state = Arc::new(RunState::new());
        state.set_active(true);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        state.set_carrier(format!("CARR{i}"));
                        let _ = state.snapshot();
                        state.mark_step_completed(StepFlag::ALL[i % 3]);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.step_flags(), [true, true, true]);
        assert!(state.carrier().unwrap().starts_with("CARR"));
    }
}
