//! Compile orchestration: refine, consult the cache, invoke the backend.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::{
    artifact::CompiledScript,
    backend::{CompileSession, CompilerBackend},
    cache::{CacheKey, NoopCache, ScriptCache},
    cancel::CancellationToken,
    config::{CompileConfiguration, ProcessedScriptData},
    configurator::{Configurator, refine_contained},
    diagnostics::{Diagnostic, ScriptResult},
    error::{ScriptError, panic_message},
    keys::{compile, processed},
};

pub struct ScriptCompiler {
    backend: Arc<dyn CompilerBackend>,
    cache: Arc<dyn ScriptCache>,
}

impl ScriptCompiler {
    /// A compiler that never caches.
    pub fn new(backend: Arc<dyn CompilerBackend>) -> Self {
        Self::with_cache(backend, Arc::new(NoopCache))
    }

    pub fn with_cache(
        backend: Arc<dyn CompilerBackend>,
        cache: Arc<dyn ScriptCache>,
    ) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &Arc<dyn ScriptCache> {
        &self.cache
    }

    pub async fn compile(
        &self,
        configuration: CompileConfiguration,
        configurator: Option<&dyn Configurator>,
    ) -> ScriptResult<CompiledScript> {
        self.compile_cancellable(
            configuration,
            configurator,
            &CancellationToken::new(),
        )
        .await
    }

    /// Compile `configuration`, refining it first with `configurator`.
    ///
    /// The configurator is also handed to the backend for refinements
    /// triggered by annotations discovered mid-compile. Diagnostics come
    /// back in emission order: refinement, mid-compile resolution, then
    /// backend messages.
    pub async fn compile_cancellable(
        &self,
        configuration: CompileConfiguration,
        configurator: Option<&dyn Configurator>,
        cancel: &CancellationToken,
    ) -> ScriptResult<CompiledScript> {
        let mut reports = Vec::new();
        let configuration = match configurator {
            Some(configurator) => {
                if let Some(failure) = cancel.failure("refinement") {
                    return failure;
                }
                log::debug!("refining compile configuration");
                let data = initial_script_data(&configuration);
                match refine_contained(configurator, &configuration, &data)
                    .await
                {
                    ScriptResult::Success {
                        value: Some(refined),
                        reports: refine_reports,
                    } => {
                        reports = refine_reports;
                        refined
                    }
                    ScriptResult::Success {
                        value: None,
                        reports: refine_reports,
                    } => {
                        return ScriptResult::from_error(
                            ScriptError::configuration(
                                "refinement produced no configuration",
                            ),
                        )
                        .prepend(refine_reports);
                    }
                    failure @ ScriptResult::Failure { .. } => {
                        return failure.convert();
                    }
                }
            }
            None => configuration,
        };

        let fragments = match configuration.require(compile::SOURCE_FRAGMENTS) {
            Ok(fragments) => fragments,
            Err(err) => return ScriptResult::from_error(err).prepend(reports),
        };
        let key = CacheKey::of(fragments);
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("cache hit for {}", fragments.source.name());
            return ScriptResult::success_with(cached, reports);
        }
        log::debug!("cache miss for {}", fragments.source.name());

        let text = match fragments.merged_text() {
            Ok(text) => text,
            Err(err) => {
                return ScriptResult::from_error(err.into()).prepend(reports);
            }
        };

        if let Err(err) = cancel.check("compilation") {
            return ScriptResult::from_error(err).prepend(reports);
        }

        let mut session =
            CompileSession::new(configuration, configurator, cancel);
        log::debug!("invoking backend on {} bytes", text.len());
        let outcome = AssertUnwindSafe(self.backend.compile(&text, &mut session))
            .catch_unwind()
            .await;
        let (configuration, session_reports) = session.into_parts();
        reports.extend(session_reports);

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                reports.push(Diagnostic::from_cause(Arc::from(err), None, None));
                return ScriptResult::failure(reports);
            }
            Err(payload) => {
                reports.push(
                    ScriptError::compilation(format!(
                        "backend panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                    .into(),
                );
                return ScriptResult::failure(reports);
            }
        };

        reports.extend(result.messages.iter().filter_map(|m| m.to_diagnostic()));
        let has_errors = reports.iter().any(Diagnostic::is_error);
        match result.artifact {
            Some(artifact) if result.success && !has_errors => {
                let script = CompiledScript::new(configuration, artifact);
                self.cache.store(key, script.clone());
                ScriptResult::success_with(script, reports)
            }
            _ => {
                if !has_errors {
                    reports.push(
                        ScriptError::compilation(
                            "compilation failed without reporting an error",
                        )
                        .into(),
                    );
                }
                log::debug!("compilation failed");
                ScriptResult::failure(reports)
            }
        }
    }
}

/// What is known about the script before the backend sees it: the
/// fragments selected for compilation, if any.
fn initial_script_data(
    configuration: &CompileConfiguration,
) -> ProcessedScriptData {
    match configuration
        .get_optional(compile::SOURCE_FRAGMENTS)
        .and_then(|fragments| fragments.fragments.clone())
    {
        Some(fragments) => {
            ProcessedScriptData::new().with(processed::FRAGMENTS, fragments)
        }
        None => ProcessedScriptData::new(),
    }
}
