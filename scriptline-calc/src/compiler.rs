//! Lowers parsed calc scripts to [`Code`].
//!
//! Names are resolved statically against the bindings made so far:
//! library preludes first, then the script's own `let`s in order.

use std::collections::HashMap;
use std::sync::Arc;

use scriptline::{BackendMessage, BackendSeverity, Location, ResolvingRestrictions};

use crate::{
    ast::{BinaryOp, Expr, ExprKind, Script, StatementKind},
    bytecode::{Code, Instruction},
    token::Span,
};

/// What to do with warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningMode {
    #[default]
    Report,
    /// `-Werror`
    AsErrors,
    /// `-nowarn`
    Suppress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    pub warnings: WarningMode,
}

impl CompilerOptions {
    /// Parse compiler option strings. Unknown options are reported and
    /// otherwise ignored.
    pub fn parse(arguments: &[String]) -> (Self, Vec<BackendMessage>) {
        let mut options = Self::default();
        let mut messages = Vec::new();
        for argument in arguments {
            match argument.as_str() {
                "-Werror" => options.warnings = WarningMode::AsErrors,
                "-nowarn" => options.warnings = WarningMode::Suppress,
                other => messages.push(BackendMessage::new(
                    BackendSeverity::Warning,
                    format!("unknown compiler option `{other}`"),
                )),
            }
        }
        (options, messages)
    }
}

/// A parsed library whose bindings are visible to the script.
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    pub script: Script,
}

struct Binding {
    name: String,
    span: Span,
    used: bool,
}

pub struct BytecodeCompiler<'a> {
    options: CompilerOptions,
    restrictions: Option<&'a ResolvingRestrictions>,
    code: Code,
    scope: HashMap<String, usize>,
    /// Script bindings, checked for use at the end.
    bindings: Vec<Binding>,
    current: HashMap<String, usize>,
    messages: Vec<BackendMessage>,
}

impl<'a> BytecodeCompiler<'a> {
    pub fn new(
        options: CompilerOptions,
        restrictions: Option<&'a ResolvingRestrictions>,
    ) -> Self {
        Self {
            options,
            restrictions,
            code: Code::default(),
            scope: HashMap::new(),
            bindings: Vec::new(),
            current: HashMap::new(),
            messages: Vec::new(),
        }
    }

    fn error(&mut self, text: impl Into<String>, span: Option<Span>) {
        let mut message = BackendMessage::new(BackendSeverity::Error, text);
        if let Some(span) = span {
            message = message.at(Location::spanning(span));
        }
        self.messages.push(message);
    }

    fn warn(&mut self, text: impl Into<String>, span: Option<Span>) {
        let severity = match self.options.warnings {
            WarningMode::Report => BackendSeverity::Warning,
            WarningMode::AsErrors => BackendSeverity::Error,
            WarningMode::Suppress => return,
        };
        let mut message = BackendMessage::new(severity, text);
        if let Some(span) = span {
            message = message.at(Location::spanning(span));
        }
        self.messages.push(message);
    }

    fn define(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.scope.get(name) {
            return slot;
        }
        let slot = self.code.slots.len();
        self.code.slots.push(name.to_string());
        self.scope.insert(name.to_string(), slot);
        slot
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.instructions.push(instruction);
    }

    fn is_restricted(&self, name: &str) -> bool {
        self.restrictions
            .is_some_and(|restrictions| !restrictions.is_allowed(name))
    }

    /// Compile the `let` bindings of a library. Library diagnostics carry
    /// the library name and position in their text, not a script location.
    pub fn compile_library(&mut self, library: &Library) {
        log::trace!("compiling library {}", library.name);
        let start = self.messages.len();
        for statement in &library.script.statements {
            match &statement.kind {
                StatementKind::Let { name, value, .. } => {
                    self.compile_expr(value);
                    let slot = self.define(name);
                    self.emit(Instruction::Store { slot });
                }
                _ => self.warn(
                    "only `let` bindings are imported from a library",
                    Some(statement.span),
                ),
            }
        }
        for message in &mut self.messages[start..] {
            if let Some(location) = message.location.take() {
                message.text =
                    format!("{}:{}: {}", library.name, location.start, message.text);
            } else {
                message.text = format!("{}: {}", library.name, message.text);
            }
        }
    }

    pub fn compile_script(&mut self, script: &Script) {
        for statement in &script.statements {
            match &statement.kind {
                StatementKind::Let {
                    name,
                    name_span,
                    value,
                } => {
                    self.compile_expr(value);
                    let slot = self.define(name);
                    self.emit(Instruction::Store { slot });
                    self.current.insert(name.clone(), self.bindings.len());
                    self.bindings.push(Binding {
                        name: name.clone(),
                        span: *name_span,
                        used: false,
                    });
                }
                StatementKind::Print(value) => {
                    if self.is_restricted("println") {
                        self.error(
                            "access to `println` is restricted",
                            Some(statement.span),
                        );
                    }
                    self.compile_expr(value);
                    self.emit(Instruction::Print);
                }
                StatementKind::Expression(value) => {
                    self.compile_expr(value);
                    self.emit(Instruction::SetResult);
                }
            }
        }
        self.emit(Instruction::Return);
    }

    fn compile_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Integer(value) => {
                self.emit(Instruction::PushInteger { value: *value })
            }
            ExprKind::String(value) => self.emit(Instruction::PushString {
                value: Arc::from(value.as_str()),
            }),
            ExprKind::Identifier(name) => self.compile_reference(name, expr.span),
            ExprKind::Negate(operand) => {
                self.compile_expr(operand);
                self.emit(Instruction::Negate);
            }
            ExprKind::Binary { op, left, right } => {
                self.compile_expr(left);
                self.compile_expr(right);
                self.emit(match op {
                    BinaryOp::Add => Instruction::Add,
                    BinaryOp::Subtract => Instruction::Subtract,
                    BinaryOp::Multiply => Instruction::Multiply,
                    BinaryOp::Divide => Instruction::Divide,
                    BinaryOp::Remainder => Instruction::Remainder,
                });
            }
        }
    }

    fn compile_reference(&mut self, name: &str, span: Span) {
        if self.is_restricted(name) {
            self.error(format!("access to `{name}` is restricted"), Some(span));
        }
        match self.scope.get(name) {
            Some(&slot) => {
                if let Some(&index) = self.current.get(name) {
                    self.bindings[index].used = true;
                }
                self.emit(Instruction::Load { slot });
            }
            None => {
                self.error(format!("unresolved reference: {name}"), Some(span));
                // keeps the stack shape for the rest of the body
                self.emit(Instruction::PushInteger { value: 0 });
            }
        }
    }

    /// Report unused script bindings and hand back the code.
    pub fn finish(mut self) -> (Code, Vec<BackendMessage>) {
        let unused: Vec<(String, Span)> = self
            .bindings
            .iter()
            .filter(|binding| !binding.used)
            .map(|binding| (binding.name.clone(), binding.span))
            .collect();
        for (name, span) in unused {
            self.warn(format!("variable `{name}` is never used"), Some(span));
        }
        (self.code, self.messages)
    }
}
