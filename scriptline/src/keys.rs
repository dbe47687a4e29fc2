//! Well-known configuration keys.
//!
//! Any crate may declare further keys; these are the ones the pipeline
//! itself reads or writes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    artifact::ModuleLoader,
    config::Key,
    script_data::{
        Annotation, ResolvingRestrictions, ScriptDependency, ScriptSignature,
    },
    source::{NamedFragment, ScriptSource, ScriptSourceFragments},
};

/// Keys of a [`crate::CompileConfiguration`].
pub mod compile {
    use super::*;

    /// The source and the fragments of it to compile. Always present in
    /// configurations built with [`crate::compile_configuration`].
    pub const SOURCE_FRAGMENTS: Key<ScriptSourceFragments> =
        Key::new("compile.source_fragments");
    pub const SIGNATURE: Key<ScriptSignature> = Key::new("compile.signature");
    pub const IMPORTED_PACKAGES: Key<Vec<String>> =
        Key::new("compile.imported_packages");
    pub const RESTRICTIONS: Key<ResolvingRestrictions> =
        Key::new("compile.restrictions");
    pub const IMPORTED_SCRIPTS: Key<Vec<ScriptSource>> =
        Key::new("compile.imported_scripts");
    pub const DEPENDENCIES: Key<Vec<ScriptDependency>> =
        Key::new("compile.dependencies");
    pub const COMPILER_OPTIONS: Key<Vec<String>> =
        Key::new("compile.compiler_options");
    /// Annotation names that trigger a configuration refinement when the
    /// backend finds them.
    pub const UPDATE_ON_ANNOTATIONS: Key<Vec<String>> =
        Key::new("compile.update_on_annotations");
    pub const UPDATE_ON_SECTIONS: Key<Vec<String>> =
        Key::new("compile.update_on_sections");
    /// Paths of the runtime's own standard library, resolved by the host.
    pub const STDLIB_PATHS: Key<Vec<PathBuf>> = Key::new("compile.stdlib_paths");
}

/// Keys of an [`crate::EvaluationConfiguration`].
pub mod evaluation {
    use super::*;

    /// The loader artifacts are activated through.
    pub const BASE_LOADER: Key<Arc<dyn ModuleLoader>> =
        Key::new("evaluation.base_loader");
}

/// Keys of [`crate::ProcessedScriptData`].
pub mod processed {
    use super::*;

    pub const ANNOTATIONS: Key<Vec<Annotation>> =
        Key::new("processed.annotations");
    pub const FRAGMENTS: Key<Vec<NamedFragment>> =
        Key::new("processed.fragments");
}
