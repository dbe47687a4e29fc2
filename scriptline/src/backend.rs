//! The interface to the code-generating backend.
//!
//! The backend is handed the merged script text and a [`CompileSession`].
//! Through the session it reads the (possibly refined) configuration and,
//! when it discovers annotations while analysing the script, asks for
//! dependency resolution; new classpath entries come back through a
//! callback into the backend's own live environment.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    artifact::Artifact,
    cancel::CancellationToken,
    config::{CompileConfiguration, ProcessedScriptData},
    configurator::{Configurator, refine_contained},
    dependencies::ResolvedDependencies,
    diagnostics::{Diagnostic, ScriptResult, Severity},
    error::{BoxError, ScriptError},
    keys::{compile, processed},
    script_data::{Annotation, flatten_classpath},
    span::Location,
};

/// Severities a backend reports with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendSeverity {
    /// An internal compiler fault.
    Exception,
    Error,
    StrongWarning,
    Warning,
    Info,
    Logging,
    /// Build output, not a diagnostic.
    Output,
}

/// `None` for messages that are not diagnostics.
pub fn map_backend_severity(severity: BackendSeverity) -> Option<Severity> {
    match severity {
        BackendSeverity::Exception | BackendSeverity::Error => {
            Some(Severity::Error)
        }
        BackendSeverity::StrongWarning | BackendSeverity::Warning => {
            Some(Severity::Warning)
        }
        BackendSeverity::Info => Some(Severity::Info),
        BackendSeverity::Logging => Some(Severity::Debug),
        BackendSeverity::Output => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendMessage {
    pub severity: BackendSeverity,
    pub text: String,
    pub location: Option<Location>,
}

impl BackendMessage {
    pub fn new(severity: BackendSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        let severity = map_backend_severity(self.severity)?;
        Some(Diagnostic {
            message: self.text.clone(),
            severity,
            location: self.location,
            cause: None,
        })
    }
}

pub struct BackendResult {
    pub success: bool,
    pub artifact: Option<Arc<dyn Artifact>>,
    pub messages: Vec<BackendMessage>,
}

impl BackendResult {
    pub fn succeeded(
        artifact: Arc<dyn Artifact>,
        messages: Vec<BackendMessage>,
    ) -> Self {
        Self {
            success: true,
            artifact: Some(artifact),
            messages,
        }
    }

    pub fn failed(messages: Vec<BackendMessage>) -> Self {
        Self {
            success: false,
            artifact: None,
            messages,
        }
    }
}

#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// Compile `source_text`. `Err` is a backend fault, reported as a
    /// compilation failure.
    async fn compile(
        &self,
        source_text: &str,
        session: &mut CompileSession<'_>,
    ) -> Result<BackendResult, BoxError>;
}

/// Per-compile state shared with the backend. Owned by exactly one
/// in-flight compilation.
pub struct CompileSession<'a> {
    configuration: CompileConfiguration,
    configurator: Option<&'a dyn Configurator>,
    cancel: &'a CancellationToken,
    reports: Vec<Diagnostic>,
}

impl<'a> CompileSession<'a> {
    pub fn new(
        configuration: CompileConfiguration,
        configurator: Option<&'a dyn Configurator>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            configuration,
            configurator,
            cancel,
            reports: Vec::new(),
        }
    }

    /// The current configuration, including anything resolved so far.
    pub fn configuration(&self) -> &CompileConfiguration {
        &self.configuration
    }

    /// Flattened classpath of the current configuration's dependencies.
    pub fn classpath(&self) -> Vec<PathBuf> {
        self.configuration
            .get_optional(compile::DEPENDENCIES)
            .map(|deps| flatten_classpath(deps))
            .unwrap_or_default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Diagnostics recorded by the session itself, e.g. from resolution.
    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(Diagnostic::is_error)
    }

    /// Refine the configuration with annotations the backend found.
    ///
    /// Only annotations listed under [`compile::UPDATE_ON_ANNOTATIONS`]
    /// are considered. When the refined classpath differs from the
    /// current one, `update_classpath` receives the new entries. Problems
    /// are recorded in the session; the current dependencies are always
    /// returned.
    pub async fn on_annotations(
        &mut self,
        annotations: Vec<Annotation>,
        update_classpath: &mut (dyn FnMut(&[PathBuf]) + Send),
    ) -> ResolvedDependencies {
        let accepted: Vec<Annotation> = match self
            .configuration
            .get_optional(compile::UPDATE_ON_ANNOTATIONS)
        {
            Some(names) => annotations
                .into_iter()
                .filter(|annotation| names.contains(&annotation.name))
                .collect(),
            None => Vec::new(),
        };

        if !accepted.is_empty() {
            if let Some(configurator) = self.configurator {
                self.refine(configurator, accepted, update_classpath).await;
            }
        }

        ResolvedDependencies {
            classpath: self.classpath(),
            imported_packages: self
                .configuration
                .get_optional(compile::IMPORTED_PACKAGES)
                .cloned()
                .unwrap_or_default(),
        }
    }

    async fn refine(
        &mut self,
        configurator: &dyn Configurator,
        annotations: Vec<Annotation>,
        update_classpath: &mut (dyn FnMut(&[PathBuf]) + Send),
    ) {
        if let Err(err) = self.cancel.check("dependency resolution") {
            self.reports.push(err.into());
            return;
        }

        log::debug!(
            "refining configuration for {} discovered annotations",
            annotations.len()
        );
        let data =
            ProcessedScriptData::new().with(processed::ANNOTATIONS, annotations);
        let refined =
            match refine_contained(configurator, &self.configuration, &data)
                .await
            {
                ScriptResult::Success {
                    value: Some(refined),
                    reports,
                } => {
                    self.reports.extend(reports);
                    refined
                }
                ScriptResult::Success { reports, .. } => {
                    self.reports.extend(reports);
                    self.reports.push(
                        ScriptError::configuration(
                            "refinement produced no configuration",
                        )
                        .into(),
                    );
                    return;
                }
                ScriptResult::Failure { reports } => {
                    self.reports.extend(reports);
                    return;
                }
            };

        if refined.ptr_eq(&self.configuration) {
            return;
        }
        let old_classpath = self.classpath();
        self.configuration = refined;
        let new_classpath = self.classpath();
        if new_classpath != old_classpath {
            let delta: Vec<PathBuf> = new_classpath
                .into_iter()
                .filter(|entry| !old_classpath.contains(entry))
                .collect();
            if !delta.is_empty() {
                log::debug!("classpath grew by {} entries", delta.len());
                update_classpath(&delta);
            }
        }
    }

    pub fn into_parts(self) -> (CompileConfiguration, Vec<Diagnostic>) {
        (self.configuration, self.reports)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::script_data::ScriptDependency;

    #[test]
    fn backend_severity_mapping() {
        let expected = [
            (BackendSeverity::Exception, Some(Severity::Error)),
            (BackendSeverity::Error, Some(Severity::Error)),
            (BackendSeverity::StrongWarning, Some(Severity::Warning)),
            (BackendSeverity::Warning, Some(Severity::Warning)),
            (BackendSeverity::Info, Some(Severity::Info)),
            (BackendSeverity::Logging, Some(Severity::Debug)),
            (BackendSeverity::Output, None),
        ];
        for (backend, severity) in expected {
            assert_eq!(map_backend_severity(backend), severity);
        }
    }

    /// Adds `lib/<arg>` for every annotation argument, counting calls.
    struct AddLibraries {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Configurator for AddLibraries {
        async fn refine(
            &self,
            configuration: &CompileConfiguration,
            data: &ProcessedScriptData,
        ) -> ScriptResult<CompileConfiguration> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut deps = configuration
                .get_optional(compile::DEPENDENCIES)
                .cloned()
                .unwrap_or_default();
            for annotation in data.get(processed::ANNOTATIONS) {
                let classpath = annotation
                    .arguments
                    .iter()
                    .map(|arg| PathBuf::from(format!("lib/{arg}")))
                    .collect();
                deps.push(ScriptDependency::new(classpath));
            }
            ScriptResult::success_with(
                configuration.with(compile::DEPENDENCIES, deps),
                vec![Diagnostic::info("resolved")],
            )
        }
    }

    fn configuration() -> CompileConfiguration {
        CompileConfiguration::new()
            .with(
                compile::DEPENDENCIES,
                vec![ScriptDependency::new(vec!["std".into()])],
            )
            .with(
                compile::UPDATE_ON_ANNOTATIONS,
                vec!["depends_on".to_string()],
            )
    }

    #[tokio::test]
    async fn discovered_annotations_push_classpath_delta() {
        let configurator = AddLibraries {
            calls: AtomicUsize::new(0),
        };
        let cancel = CancellationToken::new();
        let mut session =
            CompileSession::new(configuration(), Some(&configurator), &cancel);
        let mut pushed = Vec::new();

        let resolved = session
            .on_annotations(
                vec![
                    Annotation::new("depends_on", vec!["a".into()]),
                    Annotation::new("ignored", vec!["b".into()]),
                ],
                &mut |delta: &[PathBuf]| pushed.extend_from_slice(delta),
            )
            .await;

        assert_eq!(pushed, vec![PathBuf::from("lib/a")]);
        assert_eq!(
            resolved.classpath,
            vec![PathBuf::from("std"), PathBuf::from("lib/a")]
        );
        assert_eq!(session.reports().len(), 1);
        assert_eq!(configurator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unaccepted_annotations_skip_refinement() {
        let configurator = AddLibraries {
            calls: AtomicUsize::new(0),
        };
        let cancel = CancellationToken::new();
        let mut session =
            CompileSession::new(configuration(), Some(&configurator), &cancel);

        let resolved = session
            .on_annotations(
                vec![Annotation::new("other", vec!["a".into()])],
                &mut |_: &[PathBuf]| panic!("classpath must not change"),
            )
            .await;

        assert_eq!(resolved.classpath, vec![PathBuf::from("std")]);
        assert_eq!(configurator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_session_records_error() {
        let configurator = AddLibraries {
            calls: AtomicUsize::new(0),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut session =
            CompileSession::new(configuration(), Some(&configurator), &cancel);

        session
            .on_annotations(
                vec![Annotation::new("depends_on", vec!["a".into()])],
                &mut |_: &[PathBuf]| {},
            )
            .await;

        assert!(session.has_errors());
        assert_eq!(configurator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.reports()[0].message,
            "cancelled during dependency resolution"
        );
    }
}
