//! Typed results of a consensus round.

use std::fmt;

/// Phase of the background consensus loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    /// Loop started, no round run yet.
    Idle,
    Proposing,
    Syncing,
    ReportingMetrics,
    /// Waiting out the fixed interval before the next round.
    Sleeping,
    /// Terminal: the stop signal was observed.
    Cancelled,
}

impl LoopPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopPhase::Idle => "idle",
            LoopPhase::Proposing => "proposing",
            LoopPhase::Syncing => "syncing",
            LoopPhase::ReportingMetrics => "reporting_metrics",
            LoopPhase::Sleeping => "sleeping",
            LoopPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three steps of a round, used as the `step` metric label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Propose,
    Sync,
    Report,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Propose => "propose",
            Step::Sync => "sync",
            Step::Report => "report",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step of a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work (a rejected metrics report still counts as
    /// completed; reporting is best effort).
    Completed,
    /// Nothing to do, no request sent (propose with no local state).
    Skipped,
    /// The step failed; the message is the rendered error.
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Per-round report published after every round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundSummary {
    /// 1-based round counter; `0` before the first round completes.
    pub round: u64,
    pub propose: StepOutcome,
    pub sync: StepOutcome,
    pub report: StepOutcome,
    /// Local state version after the round.
    pub version: Option<u64>,
}

impl RoundSummary {
    /// Placeholder published before any round has run.
    pub fn initial() -> Self {
        Self {
            round: 0,
            propose: StepOutcome::Skipped,
            sync: StepOutcome::Skipped,
            report: StepOutcome::Skipped,
            version: None,
        }
    }

    /// Iterates `(step, outcome)` pairs in execution order.
    pub fn steps(&self) -> impl Iterator<Item = (Step, &StepOutcome)> {
        [
            (Step::Propose, &self.propose),
            (Step::Sync, &self.sync),
            (Step::Report, &self.report),
        ]
        .into_iter()
    }

    /// `true` if no step failed.
    pub fn is_clean(&self) -> bool {
        self.steps().all(|(_, o)| !o.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_summary_is_clean_and_versionless() {
        let s = RoundSummary::initial();
        assert_eq!(s.round, 0);
        assert!(s.is_clean());
        assert_eq!(s.version, None);
    }

    #[test]
    fn any_failed_step_marks_round_unclean() {
        let s = RoundSummary {
            round: 3,
            propose: StepOutcome::Completed,
            sync: StepOutcome::Failed("503".to_string()),
            report: StepOutcome::Completed,
            version: Some(2),
        };
        assert!(!s.is_clean());

        let failed: Vec<_> = s
            .steps()
            .filter(|(_, o)| o.is_failed())
            .map(|(step, _)| step.as_str())
            .collect();
        assert_eq!(failed, vec!["sync"]);
    }

    #[test]
    fn phase_labels_are_snake_case() {
        assert_eq!(LoopPhase::ReportingMetrics.to_string(), "reporting_metrics");
        assert_eq!(LoopPhase::Cancelled.as_str(), "cancelled");
    }
}
