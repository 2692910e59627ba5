use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a run within the fixed four-step pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Mark source rows in chunks until none remain
    UpdateSource,
    /// Copy marked source rows into the source history table
    InsertSourceHistory,
    /// Mark secondary rows in chunks until none remain
    UpdateSecondary,
    /// Copy marked secondary rows into the secondary history table; terminal
    InsertSecondaryHistory,
}

impl PipelineStep {
    /// All steps in execution order
    pub const ALL: [PipelineStep; 4] = [
        Self::UpdateSource,
        Self::InsertSourceHistory,
        Self::UpdateSecondary,
        Self::InsertSecondaryHistory,
    ];

    /// Derive the next step from the three completion flags: the first false
    /// flag wins, and with all three set the terminal step runs.
    pub fn from_flags(flags: [bool; 3]) -> Self {
        StepFlag::ALL
            .iter()
            .find(|flag| !flags[flag.index()])
            .map(|flag| flag.step())
            .unwrap_or(Self::InsertSecondaryHistory)
    }

    /// Chunked update steps loop until they report zero affected rows
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::UpdateSource | Self::UpdateSecondary)
    }

    /// Completing the terminal step ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InsertSecondaryHistory)
    }

    /// Flag recording completion of this step, if it has one
    pub fn completion_flag(&self) -> Option<StepFlag> {
        match self {
            Self::UpdateSource => Some(StepFlag::SourceUpdated),
            Self::InsertSourceHistory => Some(StepFlag::SourceHistoryInserted),
            Self::UpdateSecondary => Some(StepFlag::SecondaryUpdated),
            Self::InsertSecondaryHistory => None,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateSource => write!(f, "update_source"),
            Self::InsertSourceHistory => write!(f, "insert_source_history"),
            Self::UpdateSecondary => write!(f, "update_secondary"),
            Self::InsertSecondaryHistory => write!(f, "insert_secondary_history"),
        }
    }
}

impl std::str::FromStr for PipelineStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update_source" => Ok(Self::UpdateSource),
            "insert_source_history" => Ok(Self::InsertSourceHistory),
            "update_secondary" => Ok(Self::UpdateSecondary),
            "insert_secondary_history" => Ok(Self::InsertSecondaryHistory),
            _ => Err(format!("Invalid pipeline step: {s}")),
        }
    }
}

/// Completion flag for one of the three non-terminal steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepFlag {
    SourceUpdated,
    SourceHistoryInserted,
    SecondaryUpdated,
}

impl StepFlag {
    pub const ALL: [StepFlag; 3] = [
        Self::SourceUpdated,
        Self::SourceHistoryInserted,
        Self::SecondaryUpdated,
    ];

    pub const fn index(&self) -> usize {
        match self {
            Self::SourceUpdated => 0,
            Self::SourceHistoryInserted => 1,
            Self::SecondaryUpdated => 2,
        }
    }

    /// Step whose completion this flag records
    pub const fn step(&self) -> PipelineStep {
        match self {
            Self::SourceUpdated => PipelineStep::UpdateSource,
            Self::SourceHistoryInserted => PipelineStep::InsertSourceHistory,
            Self::SecondaryUpdated => PipelineStep::UpdateSecondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_derivation_from_flags() {
        assert_eq!(
            PipelineStep::from_flags([false, false, false]),
            PipelineStep::UpdateSource
        );
        assert_eq!(
            PipelineStep::from_flags([true, false, false]),
            PipelineStep::InsertSourceHistory
        );
        assert_eq!(
            PipelineStep::from_flags([true, true, false]),
            PipelineStep::UpdateSecondary
        );
        assert_eq!(
            PipelineStep::from_flags([true, true, true]),
            PipelineStep::InsertSecondaryHistory
        );
    }

    #[test]
    fn test_first_false_flag_wins() {
        // Out-of-order flags cannot occur through the public API, but the
        // derivation still picks the earliest incomplete step.
        assert_eq!(
            PipelineStep::from_flags([false, true, true]),
            PipelineStep::UpdateSource
        );
    }

    #[test]
    fn test_flag_step_correspondence() {
        for flag in StepFlag::ALL {
            assert_eq!(flag.step().completion_flag(), Some(flag));
        }
        assert_eq!(PipelineStep::InsertSecondaryHistory.completion_flag(), None);
    }

    #[test]
    fn test_step_classification() {
        assert!(PipelineStep::UpdateSource.is_chunked());
        assert!(PipelineStep::UpdateSecondary.is_chunked());
        assert!(!PipelineStep::InsertSourceHistory.is_chunked());
        assert!(PipelineStep::InsertSecondaryHistory.is_terminal());
        assert!(!PipelineStep::UpdateSecondary.is_terminal());
    }

    #[test]
    fn test_step_string_conversion() {
        for step in PipelineStep::ALL {
            assert_eq!(step.to_string().parse::<PipelineStep>().unwrap(), step);
        }
        assert!("bogus".parse::<PipelineStep>().is_err());

        let json = serde_json::to_string(&PipelineStep::InsertSourceHistory).unwrap();
        assert_eq!(json, "\"insert_source_history\"");
    }
}
