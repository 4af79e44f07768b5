//! The recovery cascade as an explicit, bounded state machine.
//!
//! Stages run from least to most disruptive:
//!
//! ```text
//! RegeneratingCerts --ok--> Syncing
//!        | fail (not restarted)      | fail (restarted)
//!        v                           v
//!    Restarting --fail--> Recreating --> Syncing --ok--> Done
//!        | ok                                   \--fail--> Failed
//!        +--> RegeneratingCerts (restarted)
//! ```
//!
//! One restart and one recreate per episode at most. The longest path enters
//! six stages, so the step cap only trips on a broken transition table.

/// Upper bound on transitions in a single recovery episode.
pub const MAX_RECOVERY_STEPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    Idle,
    RegeneratingCerts,
    Restarting,
    Recreating,
    /// The terminal environment sync.
    Syncing,
    Done,
    Failed,
}

impl RecoveryStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecoveryStage::Done | RecoveryStage::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct Recovery {
    stage: RecoveryStage,
    restarted: bool,
    history: Vec<RecoveryStage>,
    max_steps: usize,
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Recovery {
    pub fn new() -> Self {
        Self::with_max_steps(MAX_RECOVERY_STEPS)
    }

    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            stage: RecoveryStage::Idle,
            restarted: false,
            history: Vec::new(),
            max_steps,
        }
    }

    pub fn stage(&self) -> RecoveryStage {
        self.stage
    }

    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Stages entered so far, in order.
    pub fn history(&self) -> &[RecoveryStage] {
        &self.history
    }

    /// Record the outcome of the current stage and move to the next one.
    ///
    /// Returns `None` once the step cap is exceeded.
    pub fn advance(&mut self, succeeded: bool) -> Option<RecoveryStage> {
        use RecoveryStage::*;

        if self.history.len() >= self.max_steps {
            return None;
        }

        let next = match (self.stage, succeeded) {
            (Idle, _) => RegeneratingCerts,
            (RegeneratingCerts, true) => Syncing,
            (RegeneratingCerts, false) if self.restarted => Recreating,
            (RegeneratingCerts, false) => Restarting,
            (Restarting, true) => {
                self.restarted = true;
                RegeneratingCerts
            }
            (Restarting, false) => {
                // A failed restart still counts as the one restart we allow.
                self.restarted = true;
                Recreating
            }
            (Recreating, _) => Syncing,
            (Syncing, true) => Done,
            (Syncing, false) => Failed,
            (terminal @ (Done | Failed), _) => terminal,
        };

        self.history.push(next);
        self.stage = next;
        Some(next)
    }
}
