//! Matrix run reports.

use std::fmt;

use serde::Serialize;
use vfx_gpu::{Backend, NumericBackend};

use crate::error::ParityResult;
use crate::runner::{CaseReport, Outcome};

/// Pass/fail counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    /// Cases run.
    pub total: usize,
    /// Cases that passed.
    pub passed: usize,
    /// Cases that failed or errored.
    pub failed: usize,
}

/// Result of a matrix run, in matrix order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Backend asked for, possibly `auto`.
    pub requested: String,
    /// Backend that ran the cases.
    pub backend: String,
    /// Requested numeric backend.
    pub numeric: String,
    /// Per-case results.
    pub cases: Vec<CaseReport>,
    /// Counts.
    pub summary: Summary,
}

impl Report {
    /// Builds a report and its summary.
    pub fn new(requested: Backend, backend: Backend, numeric: NumericBackend, cases: Vec<CaseReport>) -> Self {
        let passed = cases.iter().filter(|c| c.passed()).count();
        let summary = Summary { total: cases.len(), passed, failed: cases.len() - passed };
        Self {
            requested: requested.name().to_string(),
            backend: backend.name().to_string(),
            numeric: numeric.name().to_string(),
            cases,
            summary,
        }
    }

    /// True when every case passed.
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    /// Failed or errored cases.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.passed())
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> ParityResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parity: backend={}", self.backend)?;
        if self.requested != self.backend {
            write!(f, " (requested {})", self.requested)?;
        }
        writeln!(f, " numeric={}", self.numeric)?;
        writeln!(
            f,
            "{:<42} {:<7} {:>2} {:<9} {:>10} {:>10}  result",
            "case", "mode", "v", "executor", "threshold", "max error"
        )?;

        for case in &self.cases {
            let max_error = case
                .verdict
                .as_ref()
                .map_or_else(|| "-".to_string(), |v| format!("{:.3e}", v.max_error));
            let result = match &case.outcome {
                Outcome::Passed => "ok".to_string(),
                Outcome::Failed => {
                    let failures = case.verdict.as_ref().map_or(0, |v| v.failures);
                    format!("FAILED ({failures} channels)")
                }
                Outcome::Error { stage, message } => format!("ERROR [{stage}] {message}"),
            };
            writeln!(
                f,
                "{:<42} {:<7} {:>2} {:<9} {:>10.3e} {:>10}  {}",
                case.name, case.mode, case.schema_version, case.executor, case.threshold, max_error, result
            )?;

            if let Some(verdict) = &case.verdict {
                for d in &verdict.divergences {
                    writeln!(
                        f,
                        "    pixel {} ch {}: in={:?} expected={:?} actual={:?} error={:.3e} ({:?})",
                        d.index, d.channel, d.input, d.expected, d.actual, d.error, d.kind
                    )?;
                }
                let hidden = verdict.failures.saturating_sub(verdict.divergences.len());
                if hidden > 0 {
                    writeln!(f, "    ... {hidden} more")?;
                }
            }
        }

        write!(
            f,
            "{} cases: {} passed, {} failed",
            self.summary.total, self.summary.passed, self.summary.failed
        )
    }
}
