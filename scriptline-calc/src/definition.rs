//! Ready-made configurations and host wiring for calc scripts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use scriptline::keys::{compile, evaluation};
use scriptline::{
    BasicScriptRunner, CompileConfiguration, DependencyBridge,
    EvaluationConfiguration, MemoryCache, ModuleLoader, ResolvingConfigurator,
    ScriptCompiler, ScriptSelector, ScriptSignature, ScriptSource, ScriptingHost,
};

use crate::{
    backend::{CalcBackend, FILE_EXTENSION},
    loader::{BASE_TYPE, CalcLoader, OUTPUT, OutputSink},
    resolver::{DEPENDS_ON, FileResolver, REPOSITORY, SCRIPT_DIR},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct CalcSelector;

impl ScriptSelector for CalcSelector {
    fn file_extension(&self) -> &str {
        FILE_EXTENSION
    }
}

/// Compile configuration for a whole calc source. `stdlib` entries are
/// loaded as libraries ahead of anything the script depends on.
pub fn compile_configuration(
    source: ScriptSource,
    stdlib: Vec<PathBuf>,
) -> CompileConfiguration {
    scriptline::compile_configuration(source)
        .with(compile::SIGNATURE, ScriptSignature::new(BASE_TYPE))
        .with(
            compile::UPDATE_ON_ANNOTATIONS,
            vec![DEPENDS_ON.to_string(), REPOSITORY.to_string()],
        )
        .with(compile::STDLIB_PATHS, stdlib)
}

pub fn evaluation_configuration(output: OutputSink) -> EvaluationConfiguration {
    let loader: Arc<dyn ModuleLoader> = Arc::new(CalcLoader);
    EvaluationConfiguration::new()
        .with(evaluation::BASE_LOADER, loader)
        .with(OUTPUT, output)
}

#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    /// Directory `@depends_on` paths fall back to, normally the one holding
    /// the script.
    pub script_dir: Option<PathBuf>,
    /// Keep compiled scripts in a [`MemoryCache`].
    pub cache: bool,
}

/// A host that resolves dependencies with [`FileResolver`] and compiles
/// with [`CalcBackend`].
pub fn scripting_host(options: &HostOptions) -> ScriptingHost {
    let mut environment = HashMap::new();
    if let Some(dir) = &options.script_dir {
        environment.insert(SCRIPT_DIR.to_string(), dir.display().to_string());
    }
    let bridge =
        DependencyBridge::new(Arc::new(FileResolver)).with_environment(environment);

    let backend = Arc::new(CalcBackend);
    let compiler = if options.cache {
        ScriptCompiler::with_cache(backend, Arc::new(MemoryCache::new()))
    } else {
        ScriptCompiler::new(backend)
    };

    ScriptingHost::new(
        Arc::new(ResolvingConfigurator::new(bridge)),
        compiler,
        Arc::new(BasicScriptRunner),
    )
}
