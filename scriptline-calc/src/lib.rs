//! # scriptline-calc
//!
//! A small arithmetic scripting language run through the scriptline
//! pipeline.
//!
//! ## Architecture
//!
//! ```text
//!  merged text
//!      │
//!      ▼
//!  ┌────────┐  tokens  ┌────────┐  Script  ┌──────────────────┐  Code
//!  │ Lexer  │ ───────▶ │ Parser │ ───────▶ │ BytecodeCompiler │ ─────▶ CalcArtifact
//!  └────────┘          └────────┘          └──────────────────┘
//!                          │ @depends_on / @repository
//!                          ▼
//!                 CompileSession::on_annotations ──▶ FileResolver
//! ```
//!
//! At run time [`CalcLoader`] turns a [`CalcArtifact`] into a module whose
//! entry action interprets the code, writing `println` output to the
//! evaluation's [`OutputSink`].
//!
//! ```rust
//! let (script, errors) = scriptline_calc::parse("let a = 1\nprintln(a + 1)");
//! assert!(errors.is_empty());
//! assert_eq!(script.statements.len(), 2);
//! ```

pub mod ast;
mod backend;
pub mod bytecode;
mod compiler;
mod definition;
pub mod interpreter;
pub mod lexer;
mod loader;
pub mod parser;
mod resolver;
pub mod token;

pub use backend::{CalcBackend, FILE_EXTENSION};
pub use compiler::{BytecodeCompiler, CompilerOptions, Library, WarningMode};
pub use definition::*;
pub use lexer::Lexer;
pub use loader::*;
pub use parser::{ParseError, Parser, parse};
pub use resolver::*;
pub use token::{Token, TokenKind};
