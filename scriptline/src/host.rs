use std::path::Path;
use std::sync::Arc;

use crate::{
    cancel::CancellationToken,
    compiler::ScriptCompiler,
    config::{CompileConfiguration, EvaluationConfiguration},
    configurator::Configurator,
    diagnostics::ScriptResult,
    error::ScriptError,
    runner::{EvaluationResult, ScriptRunner},
};

/// Decides which files a host treats as scripts.
pub trait ScriptSelector: Send + Sync {
    /// Extension without the leading dot, e.g. `calc`.
    fn file_extension(&self) -> &str;

    fn is_known_script(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|extension| extension == self.file_extension())
    }
}

/// Compiles and runs scripts with a fixed configurator, compiler and
/// runner.
pub struct ScriptingHost {
    configurator: Arc<dyn Configurator>,
    compiler: ScriptCompiler,
    runner: Arc<dyn ScriptRunner>,
}

impl ScriptingHost {
    pub fn new(
        configurator: Arc<dyn Configurator>,
        compiler: ScriptCompiler,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            configurator,
            compiler,
            runner,
        }
    }

    pub fn compiler(&self) -> &ScriptCompiler {
        &self.compiler
    }

    pub async fn eval(
        &self,
        compile_configuration: CompileConfiguration,
        evaluation_configuration: EvaluationConfiguration,
    ) -> ScriptResult<EvaluationResult> {
        self.eval_cancellable(
            compile_configuration,
            evaluation_configuration,
            &CancellationToken::new(),
        )
        .await
    }

    /// Compile then run. Compile diagnostics precede run diagnostics; a
    /// failed compile skips the run.
    pub async fn eval_cancellable(
        &self,
        compile_configuration: CompileConfiguration,
        evaluation_configuration: EvaluationConfiguration,
        cancel: &CancellationToken,
    ) -> ScriptResult<EvaluationResult> {
        let compiled = self
            .compiler
            .compile_cancellable(
                compile_configuration,
                Some(self.configurator.as_ref()),
                cancel,
            )
            .await;
        let (script, reports) = match compiled {
            ScriptResult::Success {
                value: Some(script),
                reports,
            } => (script, reports),
            ScriptResult::Success { reports, .. } => {
                return ScriptResult::from_error(ScriptError::compilation(
                    "compilation produced no script",
                ))
                .prepend(reports);
            }
            failure @ ScriptResult::Failure { .. } => return failure.convert(),
        };

        self.runner
            .run(&script, evaluation_configuration, cancel)
            .await
            .prepend(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Calc;

    impl ScriptSelector for Calc {
        fn file_extension(&self) -> &str {
            "calc"
        }
    }

    #[test]
    fn selects_by_extension() {
        assert!(Calc.is_known_script(Path::new("dir/a.calc")));
        assert!(!Calc.is_known_script(Path::new("dir/a.calc.txt")));
        assert!(!Calc.is_known_script(Path::new("calc")));
    }
}
