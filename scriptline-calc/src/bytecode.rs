use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    PushInteger { value: i64 },
    PushString { value: Arc<str> },
    /// Push the value of a variable slot.
    Load { slot: usize },
    /// Pop into a variable slot.
    Store { slot: usize },
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Negate,
    /// Pop and write a line to the output sink.
    Print,
    /// Pop and remember as the script's value.
    SetResult,
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushInteger { value } => write!(f, "push_integer {value}"),
            Self::PushString { value } => write!(f, "push_string {value:?}"),
            Self::Load { slot } => write!(f, "load {slot}"),
            Self::Store { slot } => write!(f, "store {slot}"),
            Self::Add => f.write_str("add"),
            Self::Subtract => f.write_str("subtract"),
            Self::Multiply => f.write_str("multiply"),
            Self::Divide => f.write_str("divide"),
            Self::Remainder => f.write_str("remainder"),
            Self::Negate => f.write_str("negate"),
            Self::Print => f.write_str("print"),
            Self::SetResult => f.write_str("set_result"),
            Self::Return => f.write_str("return"),
        }
    }
}

/// A compiled script body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    pub instructions: Vec<Instruction>,
    /// Variable names by slot index.
    pub slots: Vec<String>,
}

impl Code {
    /// One instruction per line, for debugging.
    pub fn disassemble(&self) -> String {
        self.instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| format!("{index:4} {instruction}\n"))
            .collect()
    }
}
