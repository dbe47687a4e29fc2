//! Activation of compiled calc scripts.

use std::any::Any;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use scriptline::{
    Artifact, BoxError, CompileConfiguration, EvaluationConfiguration, Key,
    ModuleLoader, ScriptModule, ScriptValue,
};

use crate::{bytecode::Code, interpreter};

/// Base type every calc script module satisfies.
pub const BASE_TYPE: &str = "calc.Script";

/// Where `println` writes. Defaults to stdout.
pub const OUTPUT: Key<OutputSink> = Key::new("calc.output");

#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    /// Collects output in memory; clones share the buffer.
    Captured(Arc<Mutex<String>>),
}

impl OutputSink {
    pub fn captured() -> Self {
        Self::Captured(Arc::default())
    }

    /// Everything written so far; empty for stdout.
    pub fn contents(&self) -> String {
        match self {
            Self::Stdout => String::new(),
            Self::Captured(buffer) => buffer.lock().clone(),
        }
    }

    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        match self {
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{line}")?;
                stdout.flush()
            }
            Self::Captured(buffer) => {
                let mut buffer = buffer.lock();
                buffer.push_str(line);
                buffer.push('\n');
                Ok(())
            }
        }
    }
}

/// Output of a successful calc compile.
#[derive(Debug)]
pub struct CalcArtifact {
    pub name: String,
    pub code: Arc<Code>,
}

impl Artifact for CalcArtifact {
    fn entry_name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Loads [`CalcArtifact`]s; the `BASE_LOADER` of calc evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalcLoader;

impl ModuleLoader for CalcLoader {
    fn load(
        &self,
        artifact: &dyn Artifact,
        _configuration: &CompileConfiguration,
    ) -> Result<Box<dyn ScriptModule>, BoxError> {
        let artifact = artifact
            .as_any()
            .downcast_ref::<CalcArtifact>()
            .ok_or_else(|| {
                format!("{} is not a calc artifact", artifact.entry_name())
            })?;
        log::debug!(
            "loaded {} ({} instructions)",
            artifact.name,
            artifact.code.instructions.len()
        );
        Ok(Box::new(CalcModule {
            code: Arc::clone(&artifact.code),
        }))
    }
}

pub struct CalcModule {
    code: Arc<Code>,
}

impl ScriptModule for CalcModule {
    fn base_type(&self) -> &str {
        BASE_TYPE
    }

    fn run(
        &mut self,
        configuration: &EvaluationConfiguration,
    ) -> Result<Option<ScriptValue>, BoxError> {
        let output = configuration.get_optional(OUTPUT).cloned().unwrap_or_default();
        let value = interpreter::execute(&self.code, &output)?;
        Ok(value.map(ScriptValue::new))
    }
}
