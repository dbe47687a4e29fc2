//! The calc [`CompilerBackend`].
//!
//! Compilation runs in four steps: parse the merged text, hand the file
//! annotations to the session (which may grow the classpath), load every
//! classpath entry as a library, then lower libraries and script together
//! into one bytecode body. Imported packages name libraries that must have
//! been loaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use scriptline::keys::compile;
use scriptline::{
    Annotation, BackendMessage, BackendResult, BackendSeverity, BoxError,
    CompileSession, CompilerBackend, Location, ScriptSource,
};

use crate::{
    compiler::{BytecodeCompiler, CompilerOptions, Library},
    loader::{BASE_TYPE, CalcArtifact},
    parser::{ParseError, parse},
};

pub const FILE_EXTENSION: &str = "calc";

#[derive(Debug, Clone, Copy, Default)]
pub struct CalcBackend;

fn parse_message(err: ParseError) -> BackendMessage {
    BackendMessage::new(BackendSeverity::Error, err.message)
        .at(Location::spanning(err.span))
}

fn is_calc_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
}

/// Parse one library text. Problems are reported against `name` since a
/// library position means nothing in the script being compiled.
fn parse_library(
    name: String,
    text: &str,
    messages: &mut Vec<BackendMessage>,
) -> Option<Library> {
    let (script, errors) = parse(text);
    if !errors.is_empty() {
        messages.extend(errors.into_iter().map(|err| {
            BackendMessage::new(
                BackendSeverity::Error,
                format!("{name}:{}: {}", err.span.start, err.message),
            )
        }));
        return None;
    }
    Some(Library { name, script })
}

fn read_library(path: &Path, messages: &mut Vec<BackendMessage>) -> Option<Library> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match std::fs::read_to_string(path) {
        Ok(text) => parse_library(name, &text, messages),
        Err(err) => {
            messages.push(BackendMessage::new(
                BackendSeverity::Error,
                format!("unable to read library {}: {err}", path.display()),
            ));
            None
        }
    }
}

/// Load a classpath entry: a `.calc` file, or every `.calc` file of a
/// directory in name order.
fn load_entry(
    entry: &Path,
    libraries: &mut Vec<Library>,
    messages: &mut Vec<BackendMessage>,
) {
    if entry.is_file() {
        libraries.extend(read_library(entry, messages));
        return;
    }
    if !entry.is_dir() {
        messages.push(BackendMessage::new(
            BackendSeverity::Error,
            format!("classpath entry not found: {}", entry.display()),
        ));
        return;
    }

    let mut files: Vec<PathBuf> = match std::fs::read_dir(entry) {
        Ok(dir) => dir
            .filter_map(Result::ok)
            .map(|item| item.path())
            .filter(|path| path.is_file() && is_calc_file(path))
            .collect(),
        Err(err) => {
            messages.push(BackendMessage::new(
                BackendSeverity::Error,
                format!("unable to list {}: {err}", entry.display()),
            ));
            return;
        }
    };
    files.sort();
    log::trace!("{} libraries in {}", files.len(), entry.display());
    for file in files {
        libraries.extend(read_library(&file, messages));
    }
}

fn load_imported(
    source: &ScriptSource,
    libraries: &mut Vec<Library>,
    messages: &mut Vec<BackendMessage>,
) {
    match source.text() {
        Ok(text) => {
            libraries.extend(parse_library(source.name().to_string(), &text, messages))
        }
        Err(err) => messages.push(BackendMessage::new(
            BackendSeverity::Error,
            format!("unable to import {}: {err}", source.name()),
        )),
    }
}

fn has_errors(messages: &[BackendMessage]) -> bool {
    messages.iter().any(|message| {
        matches!(
            message.severity,
            BackendSeverity::Error | BackendSeverity::Exception
        )
    })
}

/// `hello.calc` becomes `hello`.
fn stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn entry_name(source: &ScriptSource) -> String {
    stem(source.name())
}

/// Each imported package must name a loaded library by its stem.
fn check_imports(
    imports: &[String],
    libraries: &[Library],
    messages: &mut Vec<BackendMessage>,
) {
    for package in imports {
        if !libraries.iter().any(|library| stem(&library.name) == *package) {
            messages.push(BackendMessage::new(
                BackendSeverity::Error,
                format!("imported package `{package}` not found"),
            ));
        }
    }
}

#[async_trait]
impl CompilerBackend for CalcBackend {
    async fn compile(
        &self,
        source_text: &str,
        session: &mut CompileSession<'_>,
    ) -> Result<BackendResult, BoxError> {
        let (script, errors) = parse(source_text);
        if !errors.is_empty() {
            log::debug!("{} parse errors", errors.len());
            return Ok(BackendResult::failed(
                errors.into_iter().map(parse_message).collect(),
            ));
        }

        let mut classpath: Vec<PathBuf> = session
            .configuration()
            .get_optional(compile::STDLIB_PATHS)
            .cloned()
            .unwrap_or_default();
        classpath.extend(session.classpath());

        if !script.annotations.is_empty() {
            let annotations = script
                .annotations
                .iter()
                .map(|node| Annotation {
                    name: node.name.clone(),
                    arguments: node.arguments.clone(),
                    location: Some(Location::spanning(node.span)),
                })
                .collect();
            session
                .on_annotations(annotations, &mut |delta: &[PathBuf]| {
                    classpath.extend_from_slice(delta)
                })
                .await;
            if session.has_errors() {
                return Ok(BackendResult::failed(Vec::new()));
            }
        }

        let configuration = session.configuration().clone();
        let mut messages = Vec::new();

        if let Some(signature) = configuration.get_optional(compile::SIGNATURE) {
            if signature.base_type != BASE_TYPE {
                messages.push(BackendMessage::new(
                    BackendSeverity::Error,
                    format!("unsupported script base type `{}`", signature.base_type),
                ));
                return Ok(BackendResult::failed(messages));
            }
        }

        let mut libraries = Vec::new();
        for entry in &classpath {
            load_entry(entry, &mut libraries, &mut messages);
        }
        for source in configuration
            .get_optional(compile::IMPORTED_SCRIPTS)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            load_imported(source, &mut libraries, &mut messages);
        }
        check_imports(
            configuration
                .get_optional(compile::IMPORTED_PACKAGES)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            &libraries,
            &mut messages,
        );

        let (options, option_messages) = CompilerOptions::parse(
            configuration
                .get_optional(compile::COMPILER_OPTIONS)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        );
        messages.extend(option_messages);

        let mut compiler = BytecodeCompiler::new(
            options,
            configuration.get_optional(compile::RESTRICTIONS),
        );
        for library in &libraries {
            compiler.compile_library(library);
        }
        compiler.compile_script(&script);
        let (code, compile_messages) = compiler.finish();
        messages.extend(compile_messages);

        if has_errors(&messages) {
            return Ok(BackendResult::failed(messages));
        }

        let name = entry_name(&configuration.get(compile::SOURCE_FRAGMENTS).source);
        log::debug!(
            "compiled {name}: {} libraries, {} instructions",
            libraries.len(),
            code.instructions.len()
        );
        log::trace!("{name}:\n{}", code.disassemble());
        Ok(BackendResult::succeeded(
            Arc::new(CalcArtifact {
                name,
                code: Arc::new(code),
            }),
            messages,
        ))
    }
}
