use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    artifact::{CompiledScript, ScriptValue},
    cancel::CancellationToken,
    config::EvaluationConfiguration,
    diagnostics::{Diagnostic, ScriptResult},
    error::{ScriptError, panic_message},
};

/// Outcome of running a script.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub value: Option<ScriptValue>,
    pub configuration: EvaluationConfiguration,
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(
        &self,
        script: &CompiledScript,
        configuration: EvaluationConfiguration,
        cancel: &CancellationToken,
    ) -> ScriptResult<EvaluationResult>;
}

/// Instantiates the script and performs its entry action.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicScriptRunner;

#[async_trait]
impl ScriptRunner for BasicScriptRunner {
    async fn run(
        &self,
        script: &CompiledScript,
        configuration: EvaluationConfiguration,
        cancel: &CancellationToken,
    ) -> ScriptResult<EvaluationResult> {
        if let Some(failure) = cancel.failure("instantiation") {
            return failure;
        }

        let (mut instance, reports) = match script.instantiate(&configuration)
        {
            ScriptResult::Success {
                value: Some(instance),
                reports,
            } => (instance, reports),
            ScriptResult::Success { reports, .. } => {
                let mut reports = reports;
                reports.push(
                    ScriptError::instantiation("instantiation produced no instance")
                        .into(),
                );
                return ScriptResult::failure(reports);
            }
            ScriptResult::Failure { reports } => {
                return ScriptResult::Failure { reports };
            }
        };

        log::debug!("running {}", script.artifact().entry_name());
        let outcome =
            catch_unwind(AssertUnwindSafe(|| instance.run(&configuration)));
        let result = match outcome {
            Ok(Ok(value)) => ScriptResult::success(EvaluationResult {
                value,
                configuration,
            }),
            Ok(Err(err)) => ScriptResult::failure(vec![Diagnostic::from_cause(
                Arc::from(err),
                None,
                None,
            )]),
            Err(payload) => ScriptResult::from_error(ScriptError::execution(
                format!("script panicked: {}", panic_message(payload.as_ref())),
            )),
        };
        result.prepend(reports)
    }
}
