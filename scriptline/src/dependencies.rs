//! Bridge between the pipeline and external dependency resolvers.
//!
//! External resolvers speak their own small vocabulary (report
//! severities, line/column positions, a "script contents" view). The
//! [`DependencyBridge`] adapts one of them to [`ScriptResult`] and
//! [`Diagnostic`], and folds what it resolves into a new compile
//! configuration.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::{
    config::{CompileConfiguration, ProcessedScriptData},
    configurator::Configurator,
    diagnostics::{Diagnostic, ScriptResult, Severity},
    error::{BoxError, ScriptError, panic_message},
    keys::{compile, processed},
    script_data::{Annotation, ScriptDependency},
    span::{Location, Position},
};

// ═══════════════════════════════════════════════════════════════════
// Resolver vocabulary
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSeverity {
    Error,
    Warning,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportPosition {
    pub line: usize,
    pub column: usize,
}

pub fn map_legacy_severity(severity: ReportSeverity) -> Severity {
    match severity {
        ReportSeverity::Error => Severity::Error,
        ReportSeverity::Warning => Severity::Warning,
        ReportSeverity::Info => Severity::Info,
        ReportSeverity::Debug => Severity::Debug,
    }
}

pub fn to_legacy_severity(severity: Severity) -> ReportSeverity {
    match severity {
        Severity::Error => ReportSeverity::Error,
        Severity::Warning => ReportSeverity::Warning,
        Severity::Info => ReportSeverity::Info,
        Severity::Debug => ReportSeverity::Debug,
    }
}

pub fn map_legacy_position(position: Option<ReportPosition>) -> Option<Location> {
    position.map(|p| Location::at(Position::new(p.line, p.column)))
}

pub fn to_legacy_position(location: Option<Location>) -> Option<ReportPosition> {
    location.map(|l| ReportPosition {
        line: l.start.line,
        column: l.start.column,
    })
}

/// What a resolver gets to see of a script.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContents<'a> {
    pub annotations: &'a [Annotation],
    pub file: Option<&'a Path>,
    pub text: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    pub classpath: Vec<PathBuf>,
    pub imported_packages: Vec<String>,
}

impl ResolvedDependencies {
    pub fn is_empty(&self) -> bool {
        self.classpath.is_empty() && self.imported_packages.is_empty()
    }
}

/// Callback a resolver reports through.
pub type Report<'a> =
    dyn FnMut(ReportSeverity, &str, Option<ReportPosition>) + Send + 'a;

/// An external dependency resolver.
///
/// `Ok(None)` means nothing was resolved. `Err` is a fault; the bridge
/// turns it into a failed result.
#[async_trait]
pub trait ExternalResolver: Send + Sync {
    async fn resolve(
        &self,
        contents: &ScriptContents<'_>,
        environment: &HashMap<String, String>,
        report: &mut Report<'_>,
        previous: Option<&ResolvedDependencies>,
    ) -> Result<Option<ResolvedDependencies>, BoxError>;
}

// ═══════════════════════════════════════════════════════════════════
// Bridge
// ═══════════════════════════════════════════════════════════════════

pub struct DependencyBridge {
    resolver: Arc<dyn ExternalResolver>,
    environment: HashMap<String, String>,
}

impl DependencyBridge {
    pub fn new(resolver: Arc<dyn ExternalResolver>) -> Self {
        Self {
            resolver,
            environment: HashMap::new(),
        }
    }

    /// Variables handed to the resolver on every call.
    pub fn with_environment(
        mut self,
        environment: HashMap<String, String>,
    ) -> Self {
        self.environment = environment;
        self
    }

    /// Resolve what `annotations` ask for and return `configuration`
    /// extended with it.
    ///
    /// No annotations, or nothing resolved, returns the configuration
    /// unchanged. Resolver faults and panics fail the result.
    ///
    /// Any ERROR report also fails the result, even when the resolver
    /// returns a value alongside it. This is stricter than succeeding with
    /// the reports and letting the compile fail on them later: callers of
    /// the bridge see a `Failure` as soon as resolution reports an error.
    pub async fn resolve(
        &self,
        annotations: &[Annotation],
        configuration: &CompileConfiguration,
    ) -> ScriptResult<CompileConfiguration> {
        if annotations.is_empty() {
            log::trace!("no annotations, skipping dependency resolution");
            return ScriptResult::success(configuration.clone());
        }

        let contents = ScriptContents {
            annotations,
            file: None,
            text: None,
        };
        let mut reports = Vec::new();
        let mut report =
            |severity: ReportSeverity,
             message: &str,
             position: Option<ReportPosition>| {
                reports.push(Diagnostic {
                    message: message.to_string(),
                    severity: map_legacy_severity(severity),
                    location: map_legacy_position(position),
                    cause: None,
                });
            };

        log::debug!("resolving dependencies for {} annotations", annotations.len());
        let outcome = AssertUnwindSafe(self.resolver.resolve(
            &contents,
            &self.environment,
            &mut report,
            None,
        ))
        .catch_unwind()
        .await;

        let resolved = match outcome {
            Ok(Ok(resolved)) => resolved,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::debug!("dependency resolver panicked: {message}");
                reports.push(
                    ScriptError::resolution(format!(
                        "dependency resolver panicked: {message}"
                    ))
                    .into(),
                );
                return ScriptResult::failure(reports);
            }
            Ok(Err(err)) => {
                log::debug!("dependency resolver failed: {err}");
                reports.push(Diagnostic::from_cause(Arc::from(err), None, None));
                return ScriptResult::failure(reports);
            }
        };

        if reports.iter().any(Diagnostic::is_error) {
            return ScriptResult::failure(reports);
        }

        let resolved = match resolved {
            Some(resolved) if !resolved.is_empty() => resolved,
            _ => {
                return ScriptResult::success_with(
                    configuration.clone(),
                    reports,
                );
            }
        };

        log::debug!(
            "resolved {} classpath entries, {} imports",
            resolved.classpath.len(),
            resolved.imported_packages.len()
        );
        ScriptResult::success_with(
            extend_configuration(configuration, resolved),
            reports,
        )
    }
}

fn extend_configuration(
    configuration: &CompileConfiguration,
    resolved: ResolvedDependencies,
) -> CompileConfiguration {
    let mut refined = configuration.clone();

    if !resolved.classpath.is_empty() {
        let mut dependencies = configuration
            .get_optional(compile::DEPENDENCIES)
            .cloned()
            .unwrap_or_default();
        dependencies.push(ScriptDependency::new(resolved.classpath));
        refined = refined.with(compile::DEPENDENCIES, dependencies);
    }

    if !resolved.imported_packages.is_empty() {
        let mut imports = configuration
            .get_optional(compile::IMPORTED_PACKAGES)
            .cloned()
            .unwrap_or_default();
        for package in resolved.imported_packages {
            if !imports.contains(&package) {
                imports.push(package);
            }
        }
        refined = refined.with(compile::IMPORTED_PACKAGES, imports);
    }

    refined
}

/// A [`Configurator`] that resolves the annotations found in the
/// processed script data through a [`DependencyBridge`].
pub struct ResolvingConfigurator {
    bridge: DependencyBridge,
}

impl ResolvingConfigurator {
    pub fn new(bridge: DependencyBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Configurator for ResolvingConfigurator {
    async fn refine(
        &self,
        configuration: &CompileConfiguration,
        data: &ProcessedScriptData,
    ) -> ScriptResult<CompileConfiguration> {
        let annotations = data
            .get_optional(processed::ANNOTATIONS)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.bridge.resolve(annotations, configuration).await
    }
}
