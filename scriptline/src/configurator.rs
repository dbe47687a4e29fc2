use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::{
    config::{CompileConfiguration, ProcessedScriptData},
    diagnostics::ScriptResult,
    error::{ScriptError, panic_message},
};

/// Refines a compile configuration from facts observed in the source.
///
/// Implementations may await I/O. They must not mutate what they receive;
/// a changed configuration is a new map built from the input.
#[async_trait]
pub trait Configurator: Send + Sync {
    async fn refine(
        &self,
        configuration: &CompileConfiguration,
        processed: &ProcessedScriptData,
    ) -> ScriptResult<CompileConfiguration>;
}

/// Returns the configuration it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughConfigurator;

#[async_trait]
impl Configurator for PassThroughConfigurator {
    async fn refine(
        &self,
        configuration: &CompileConfiguration,
        _processed: &ProcessedScriptData,
    ) -> ScriptResult<CompileConfiguration> {
        ScriptResult::success(configuration.clone())
    }
}

/// Runs `configurator`, failing the result if it panics.
pub(crate) async fn refine_contained(
    configurator: &dyn Configurator,
    configuration: &CompileConfiguration,
    processed: &ProcessedScriptData,
) -> ScriptResult<CompileConfiguration> {
    match AssertUnwindSafe(configurator.refine(configuration, processed))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::debug!("configurator panicked: {message}");
            ScriptResult::from_error(ScriptError::configuration(format!(
                "configurator panicked: {message}"
            )))
        }
    }
}
