//! Test case execution.
//!
//! [`run_case`] walks one case through a fixed sequence of stages:
//!
//! 1. build the operator and config, construct the processor
//! 2. generate the shader for the case's descriptor
//! 3. run the shader over the domain
//! 4. evaluate the CPU reference over the same domain and compare
//!
//! A failing stage ends the case and is recorded in its report; nothing
//! escapes to the other cases. [`run_matrix`] fans cases out over the rayon
//! pool with one executor per worker.

use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use vfx_gpu::{create_executor, Backend, NumericBackend, ShaderExecutor};
use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};

use crate::checker::{compare, Verdict};
use crate::domain::TestDomain;
use crate::matrix::TestCase;
use crate::report::Report;

/// Default number of divergences kept per failing case.
pub const DEFAULT_DIAGNOSTIC_BUDGET: usize = 8;

/// Runner settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Divergences kept per failing case.
    pub diagnostic_budget: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { diagnostic_budget: DEFAULT_DIAGNOSTIC_BUDGET }
    }
}

/// Pipeline stage of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Operator, config or processor construction.
    Construction,
    /// Shader generation.
    Generation,
    /// Shader execution.
    Execution,
    /// Result comparison.
    Comparison,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Construction => "construction",
            Stage::Generation => "generation",
            Stage::Execution => "execution",
            Stage::Comparison => "comparison",
        })
    }
}

/// Case result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every compared channel within tolerance.
    Passed,
    /// At least one channel diverged.
    Failed,
    /// A stage errored before a verdict was reached.
    Error {
        /// Stage that failed.
        stage: Stage,
        /// Error text.
        message: String,
    },
}

impl Outcome {
    fn error(stage: Stage, err: impl fmt::Display) -> Self {
        Outcome::Error { stage, message: err.to_string() }
    }

    /// True for [`Outcome::Passed`].
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

/// Result of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    /// Case name.
    pub name: String,
    /// Descriptor mode name.
    pub mode: &'static str,
    /// Config schema version.
    pub schema_version: u32,
    /// Executor that ran the case.
    pub executor: String,
    /// Numeric backend used to pick the threshold.
    pub numeric: String,
    /// Threshold applied.
    pub threshold: f32,
    /// Result.
    pub outcome: Outcome,
    /// Comparison details, when the case got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl CaseReport {
    fn new(case: &TestCase, executor: &str, numeric: NumericBackend) -> Self {
        Self {
            name: case.name.clone(),
            mode: case.shader.name(),
            schema_version: case.schema_version,
            executor: executor.to_string(),
            numeric: numeric.name().to_string(),
            threshold: case.threshold.for_backend(numeric),
            outcome: Outcome::Passed,
            verdict: None,
        }
    }

    fn fail(mut self, outcome: Outcome) -> Self {
        if let Outcome::Error { stage, message } = &outcome {
            warn!(case = %self.name, %stage, "{message}");
        }
        self.outcome = outcome;
        self
    }

    /// True when the case passed.
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Runs one case on `executor`.
pub fn run_case(case: &TestCase, executor: &dyn ShaderExecutor, options: &RunOptions) -> CaseReport {
    let numeric = executor.numeric_backend();
    let report = CaseReport::new(case, executor.name(), numeric);

    let processor = match case
        .validate()
        .map_err(|e| e.to_string())
        .and_then(|()| case.op.build().map_err(|e| e.to_string()))
        .and_then(|op| {
            let config = Config::with_major_version(case.schema_version).map_err(|e| e.to_string())?;
            GpuProcessor::new(&op, &config).map_err(|e| e.to_string())
        }) {
        Ok(p) => p,
        Err(e) => return report.fail(Outcome::error(Stage::Construction, e)),
    };

    let shader = match processor.generate(&GpuShaderDesc::with_mode(case.shader)) {
        Ok(s) => s,
        Err(e) => return report.fail(Outcome::error(Stage::Generation, e)),
    };

    let domain = TestDomain::for_mode(case.shader);
    let actual = match executor.run(&shader, &domain) {
        Ok(a) => a,
        Err(e) => return report.fail(Outcome::error(Stage::Execution, e)),
    };
    let expected = vfx_ops::cpu::evaluate(&domain, processor.op());

    let tolerance = case.tolerance(report.threshold);
    let verdict = match compare(&domain, &expected, &actual, &tolerance, options.diagnostic_budget) {
        Ok(v) => v,
        Err(e) => return report.fail(Outcome::error(Stage::Comparison, e)),
    };

    debug!(
        case = %case.name,
        passed = verdict.passed,
        failures = verdict.failures,
        max_error = verdict.max_error,
        "case done"
    );

    CaseReport {
        outcome: if verdict.passed { Outcome::Passed } else { Outcome::Failed },
        verdict: Some(verdict),
        ..report
    }
}

/// Runs every case in parallel, one executor per worker.
///
/// Reports keep matrix order. If a worker can't create its executor, the
/// cases it picks up fail at [`Stage::Execution`].
pub fn run_matrix(cases: &[TestCase], backend: Backend, numeric: NumericBackend, options: &RunOptions) -> Report {
    let selected = backend.select(numeric);
    info!(cases = cases.len(), %backend, %selected, %numeric, "running parity matrix");

    let reports: Vec<CaseReport> = cases
        .par_iter()
        .map_init(
            || create_executor(selected, numeric).map_err(|e| e.to_string()),
            |executor, case| match executor {
                Ok(executor) => run_case(case, executor.as_ref(), options),
                Err(message) => CaseReport::new(case, selected.name(), numeric)
                    .fail(Outcome::error(Stage::Execution, message)),
            },
        )
        .collect();

    Report::new(backend, selected, numeric, reports)
}
