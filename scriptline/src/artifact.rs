//! Compiled scripts and their activation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::{
    config::{CompileConfiguration, EvaluationConfiguration},
    diagnostics::{Diagnostic, ScriptResult},
    error::{BoxError, ScriptError, panic_message},
    keys::{compile, evaluation},
};

/// Backend output of a successful compile. Opaque to the pipeline.
pub trait Artifact: Send + Sync + fmt::Debug {
    /// Name of the script entry inside the artifact.
    fn entry_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Activates artifacts inside a runtime context.
pub trait ModuleLoader: Send + Sync {
    fn load(
        &self,
        artifact: &dyn Artifact,
        configuration: &CompileConfiguration,
    ) -> Result<Box<dyn ScriptModule>, BoxError>;
}

/// An activated artifact, ready to run its entry action.
pub trait ScriptModule: Send {
    /// Name of the base type this module satisfies.
    fn base_type(&self) -> &str;

    fn run(
        &mut self,
        configuration: &EvaluationConfiguration,
    ) -> Result<Option<ScriptValue>, BoxError>;
}

/// A value produced by a script.
#[derive(Clone)]
pub struct ScriptValue {
    value: Arc<dyn Any + Send + Sync>,
    display: String,
}

impl ScriptValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self {
            value: Arc::new(value),
            display,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptValue({})", self.display)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

struct Compiled {
    configuration: CompileConfiguration,
    artifact: Arc<dyn Artifact>,
}

/// Handle to a compiled script. Clones share the same compilation.
#[derive(Clone)]
pub struct CompiledScript {
    inner: Arc<Compiled>,
}

impl CompiledScript {
    pub fn new(
        configuration: CompileConfiguration,
        artifact: Arc<dyn Artifact>,
    ) -> Self {
        Self {
            inner: Arc::new(Compiled {
                configuration,
                artifact,
            }),
        }
    }

    /// The refined configuration the script was compiled with.
    pub fn configuration(&self) -> &CompileConfiguration {
        &self.inner.configuration
    }

    pub fn artifact(&self) -> &dyn Artifact {
        self.inner.artifact.as_ref()
    }

    pub fn ptr_eq(&self, other: &CompiledScript) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Activate the artifact through the evaluation configuration's
    /// [`evaluation::BASE_LOADER`].
    pub fn instantiate(
        &self,
        configuration: &EvaluationConfiguration,
    ) -> ScriptResult<ScriptInstance> {
        let loader = match configuration.require(evaluation::BASE_LOADER) {
            Ok(loader) => loader,
            Err(err) => return ScriptResult::from_error(err),
        };

        let entry = self.artifact().entry_name();
        log::debug!("instantiating {entry}");
        let loaded = panic::catch_unwind(AssertUnwindSafe(|| {
            loader.load(self.artifact(), self.configuration())
        }));
        let module = match loaded {
            Ok(Ok(module)) => module,
            Err(payload) => {
                return ScriptResult::from_error(ScriptError::instantiation(
                    format!(
                        "module loader panicked while instantiating {entry}: {}",
                        panic_message(payload.as_ref())
                    ),
                ));
            }
            Ok(Err(err)) => {
                let message = format!("unable to instantiate {entry}: {err}");
                return ScriptResult::failure(vec![Diagnostic::from_cause(
                    Arc::from(err),
                    Some(&message),
                    None,
                )]);
            }
        };

        if let Some(signature) =
            self.configuration().get_optional(compile::SIGNATURE)
        {
            if !signature.base_type.is_empty()
                && module.base_type() != signature.base_type
            {
                return ScriptResult::from_error(ScriptError::instantiation(
                    format!(
                        "compiled script expected to be a subtype of {}, but got {}",
                        signature.base_type,
                        module.base_type()
                    ),
                ));
            }
        }

        ScriptResult::success(ScriptInstance { module })
    }
}

impl fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledScript")
            .field("artifact", &self.inner.artifact)
            .finish()
    }
}

/// An instantiated script.
pub struct ScriptInstance {
    module: Box<dyn ScriptModule>,
}

impl ScriptInstance {
    pub fn base_type(&self) -> &str {
        self.module.base_type()
    }

    pub fn run(
        &mut self,
        configuration: &EvaluationConfiguration,
    ) -> Result<Option<ScriptValue>, BoxError> {
        self.module.run(configuration)
    }
}

impl fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("base_type", &self.base_type())
            .finish()
    }
}
