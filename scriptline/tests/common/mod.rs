#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use scriptline::{
    Annotation, Artifact, BackendMessage, BackendResult, BackendSeverity,
    BoxError, CompileConfiguration, CompileSession, CompilerBackend,
    Configurator, Diagnostic, EvaluationConfiguration, ExternalResolver,
    ModuleLoader, ProcessedScriptData, Report, ReportSeverity,
    ResolvedDependencies,
    ScriptContents, ScriptModule, ScriptResult, ScriptValue, keys,
};

/// Artifact holding the text the backend compiled.
#[derive(Debug)]
pub struct TextArtifact {
    pub text: String,
}

impl Artifact for TextArtifact {
    fn entry_name(&self) -> &str {
        "TextArtifact"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Accepts any text except text containing `error`, which it rejects with
/// one error message. Counts invocations and records every text it saw.
#[derive(Default)]
pub struct CountingBackend {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
    pub annotations: Vec<Annotation>,
    pub classpath_updates: Mutex<Vec<std::path::PathBuf>>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that reports `annotations` to the session before
    /// compiling.
    pub fn discovering(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompilerBackend for CountingBackend {
    async fn compile(
        &self,
        source_text: &str,
        session: &mut CompileSession<'_>,
    ) -> Result<BackendResult, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(source_text.to_string());

        if !self.annotations.is_empty() {
            let mut updates = Vec::new();
            session
                .on_annotations(
                    self.annotations.clone(),
                    &mut |delta: &[std::path::PathBuf]| {
                        updates.extend_from_slice(delta)
                    },
                )
                .await;
            self.classpath_updates.lock().extend(updates);
        }

        if source_text.contains("error") {
            return Ok(BackendResult::failed(vec![BackendMessage::new(
                BackendSeverity::Error,
                "syntax error",
            )]));
        }
        Ok(BackendResult::succeeded(
            Arc::new(TextArtifact {
                text: source_text.to_string(),
            }),
            Vec::new(),
        ))
    }
}

/// Returns the configuration with a fixed set of warnings.
pub struct WarningConfigurator {
    pub warnings: Vec<&'static str>,
}

#[async_trait]
impl Configurator for WarningConfigurator {
    async fn refine(
        &self,
        configuration: &CompileConfiguration,
        _data: &ProcessedScriptData,
    ) -> ScriptResult<CompileConfiguration> {
        ScriptResult::success_with(
            configuration.clone(),
            self.warnings.iter().map(|w| Diagnostic::warning(*w)).collect(),
        )
    }
}

/// Resolves every `depends_on` argument to itself, counting calls.
#[derive(Default)]
pub struct CountingResolver {
    pub calls: AtomicUsize,
}

impl CountingResolver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalResolver for CountingResolver {
    async fn resolve(
        &self,
        contents: &ScriptContents<'_>,
        _environment: &HashMap<String, String>,
        _report: &mut Report<'_>,
        _previous: Option<&ResolvedDependencies>,
    ) -> Result<Option<ResolvedDependencies>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let classpath: Vec<_> = contents
            .annotations
            .iter()
            .filter(|annotation| annotation.name == "depends_on")
            .flat_map(|annotation| annotation.arguments.iter().map(Into::into))
            .collect();
        if classpath.is_empty() {
            return Ok(None);
        }
        Ok(Some(ResolvedDependencies {
            classpath,
            imported_packages: Vec::new(),
        }))
    }
}

pub struct FailingResolver;

#[async_trait]
impl ExternalResolver for FailingResolver {
    async fn resolve(
        &self,
        _contents: &ScriptContents<'_>,
        _environment: &HashMap<String, String>,
        _report: &mut Report<'_>,
        _previous: Option<&ResolvedDependencies>,
    ) -> Result<Option<ResolvedDependencies>, BoxError> {
        Err("artifact repository timed out".into())
    }
}

/// Panics inside the resolver after one informational report.
pub struct PanickingResolver;

#[async_trait]
impl ExternalResolver for PanickingResolver {
    async fn resolve(
        &self,
        _contents: &ScriptContents<'_>,
        _environment: &HashMap<String, String>,
        report: &mut Report<'_>,
        _previous: Option<&ResolvedDependencies>,
    ) -> Result<Option<ResolvedDependencies>, BoxError> {
        report(ReportSeverity::Info, "resolving from mirror", None);
        panic!("mirror index out of range");
    }
}

pub struct PanickingConfigurator;

#[async_trait]
impl Configurator for PanickingConfigurator {
    async fn refine(
        &self,
        _configuration: &CompileConfiguration,
        _processed: &ProcessedScriptData,
    ) -> ScriptResult<CompileConfiguration> {
        panic!("settings file vanished")
    }
}

pub struct PanickingLoader;

impl ModuleLoader for PanickingLoader {
    fn load(
        &self,
        _artifact: &dyn Artifact,
        _configuration: &CompileConfiguration,
    ) -> Result<Box<dyn ScriptModule>, BoxError> {
        panic!("linker state poisoned")
    }
}

/// Loads [`TextArtifact`]s as modules whose value is the text length.
pub struct TextLoader;

struct TextModule {
    length: i64,
}

impl ScriptModule for TextModule {
    fn base_type(&self) -> &str {
        "text.Script"
    }

    fn run(
        &mut self,
        _configuration: &EvaluationConfiguration,
    ) -> Result<Option<ScriptValue>, BoxError> {
        Ok(Some(ScriptValue::new(self.length)))
    }
}

impl ModuleLoader for TextLoader {
    fn load(
        &self,
        artifact: &dyn Artifact,
        _configuration: &CompileConfiguration,
    ) -> Result<Box<dyn ScriptModule>, BoxError> {
        let artifact = artifact
            .as_any()
            .downcast_ref::<TextArtifact>()
            .ok_or("not a text artifact")?;
        Ok(Box::new(TextModule {
            length: artifact.text.len() as i64,
        }))
    }
}

pub fn evaluation_configuration() -> EvaluationConfiguration {
    let loader: Arc<dyn ModuleLoader> = Arc::new(TextLoader);
    EvaluationConfiguration::new().with(keys::evaluation::BASE_LOADER, loader)
}
