//! A script compilation-and-execution pipeline around a pluggable backend.
//!
//! Source and configuration flow through a [`Configurator`], a
//! [`ScriptCompiler`] (with an optional [`ScriptCache`]) and a
//! [`ScriptRunner`]. Every stage returns a [`ScriptResult`], so warnings
//! and errors accumulate into one ordered diagnostics trail.

mod artifact;
mod backend;
mod cache;
mod cancel;
mod compiler;
mod config;
mod configurator;
mod dependencies;
mod diagnostics;
mod error;
mod host;
pub mod keys;
mod runner;
mod script_data;
mod source;
mod span;

pub use artifact::*;
pub use backend::*;
pub use cache::*;
pub use cancel::CancellationToken;
pub use compiler::ScriptCompiler;
pub use config::*;
pub use configurator::*;
pub use dependencies::*;
pub use diagnostics::*;
pub use error::{BoxError, ScriptError, SourceError};
pub use host::*;
pub use runner::*;
pub use script_data::*;
pub use source::*;
pub use span::*;

/// A compile configuration for the whole of `source`.
pub fn compile_configuration(source: ScriptSource) -> CompileConfiguration {
    CompileConfiguration::new()
        .with(keys::compile::SOURCE_FRAGMENTS, ScriptSourceFragments::whole(source))
}
