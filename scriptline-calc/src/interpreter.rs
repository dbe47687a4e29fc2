use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::{bytecode::{Code, Instruction}, loader::OutputSink};

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    String(Arc<str>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntegerError {
    Overflow,
    DivisionByZero,
}

impl fmt::Display for IntegerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => f.write_str("integer overflow"),
            Self::DivisionByZero => f.write_str("division by zero"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Integer(IntegerError),
    #[error("cannot apply `{operator}` to {left} and {right}")]
    TypeMismatch {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot negate a {0}")]
    InvalidNegation(&'static str),
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("variable `{0}` read before assignment")]
    Unassigned(String),
    #[error("unable to write script output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<IntegerError> for ExecutionError {
    fn from(err: IntegerError) -> Self {
        Self::Integer(err)
    }
}

#[derive(Debug, Default)]
pub struct ExecutionState {
    pub stack: Vec<Value>,
    pub slots: Vec<Option<Value>>,
    pub result: Option<Value>,
}

impl ExecutionState {
    pub fn new(slot_count: usize) -> Self {
        Self {
            stack: Vec::with_capacity(16),
            slots: vec![None; slot_count],
            result: None,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, ExecutionError> {
        self.stack.pop().ok_or(ExecutionError::StackUnderflow)
    }

    /// Pop the right then the left operand of a binary instruction.
    fn pop_pair(&mut self) -> Result<(Value, Value), ExecutionError> {
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

fn integer_op(
    operator: &'static str,
    left: Value,
    right: Value,
    op: fn(i64, i64) -> Result<i64, IntegerError>,
) -> Result<Value, ExecutionError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(op(a, b)?)),
        (left, right) => Err(ExecutionError::TypeMismatch {
            operator,
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn add(left: Value, right: Value) -> Result<Value, ExecutionError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(b)
            .map(Value::Integer)
            .ok_or(IntegerError::Overflow.into()),
        (left, right) => Ok(Value::String(Arc::from(format!("{left}{right}")))),
    }
}

fn checked_div(a: i64, b: i64) -> Result<i64, IntegerError> {
    if b == 0 {
        return Err(IntegerError::DivisionByZero);
    }
    a.checked_div(b).ok_or(IntegerError::Overflow)
}

fn checked_rem(a: i64, b: i64) -> Result<i64, IntegerError> {
    if b == 0 {
        return Err(IntegerError::DivisionByZero);
    }
    a.checked_rem(b).ok_or(IntegerError::Overflow)
}

/// Execute `code`, writing `println` output to `output`. Returns the
/// value of the last bare expression statement.
pub fn execute(
    code: &Code,
    output: &OutputSink,
) -> Result<Option<Value>, ExecutionError> {
    let mut state = ExecutionState::new(code.slots.len());

    for instruction in &code.instructions {
        match instruction {
            Instruction::PushInteger { value } => {
                state.push(Value::Integer(*value))
            }
            Instruction::PushString { value } => {
                state.push(Value::String(Arc::clone(value)))
            }
            Instruction::Load { slot } => {
                let value = state.slots[*slot].clone().ok_or_else(|| {
                    ExecutionError::Unassigned(code.slots[*slot].clone())
                })?;
                state.push(value);
            }
            Instruction::Store { slot } => {
                let value = state.pop()?;
                state.slots[*slot] = Some(value);
            }
            Instruction::Add => {
                let (left, right) = state.pop_pair()?;
                state.push(add(left, right)?);
            }
            Instruction::Subtract => {
                let (left, right) = state.pop_pair()?;
                state.push(integer_op("-", left, right, |a, b| {
                    a.checked_sub(b).ok_or(IntegerError::Overflow)
                })?);
            }
            Instruction::Multiply => {
                let (left, right) = state.pop_pair()?;
                state.push(integer_op("*", left, right, |a, b| {
                    a.checked_mul(b).ok_or(IntegerError::Overflow)
                })?);
            }
            Instruction::Divide => {
                let (left, right) = state.pop_pair()?;
                state.push(integer_op("/", left, right, checked_div)?);
            }
            Instruction::Remainder => {
                let (left, right) = state.pop_pair()?;
                state.push(integer_op("%", left, right, checked_rem)?);
            }
            Instruction::Negate => match state.pop()? {
                Value::Integer(value) => state.push(Value::Integer(
                    value.checked_neg().ok_or(IntegerError::Overflow)?,
                )),
                other => {
                    return Err(ExecutionError::InvalidNegation(other.type_name()));
                }
            },
            Instruction::Print => {
                let value = state.pop()?;
                output.write_line(&value.to_string())?;
            }
            Instruction::SetResult => {
                state.result = Some(state.pop()?);
            }
            Instruction::Return => break,
        }
    }

    Ok(state.result)
}
