//! Tree-walking evaluator over [`ast`](super::ast) nodes.

use std::{collections::HashMap, fmt};

use super::{
  CipherInterpreter,
  ast::{Arg, Expr, Function, MemberOp, Statement},
  error::CipherError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Int(i64),
  Str(String),
  /// Ordered single-character strings, as produced by `split("")`.
  Seq(Vec<String>),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Int(_) => "integer",
      Value::Str(_) => "string",
      Value::Seq(_) => "sequence",
    }
  }

  pub fn into_string(self) -> Result<String, CipherError> {
    match self {
      Value::Str(s) => Ok(s),
      other => Err(mismatch("result", "string", &other)),
    }
  }

  /// Integer coercion used by `%` and by indices. Numeric strings convert.
  fn as_int(&self, operation: &'static str) -> Result<i64, CipherError> {
    match self {
      Value::Int(n) => Ok(*n),
      Value::Str(s) => s
        .trim()
        .parse::<i64>()
        .map_err(|_| mismatch(operation, "integer", self)),
      Value::Seq(_) => Err(mismatch(operation, "integer", self)),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Int(n) => write!(f, "{}", n),
      Value::Str(s) => write!(f, "{}", s),
      Value::Seq(items) => write!(f, "{}", items.join(",")),
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Str(s.to_string())
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self {
    Value::Int(n)
  }
}

/// Upper bound for sequences grown by indexed assignment.
const MAX_SEQUENCE_LEN: usize = 1 << 16;

/// Variables of one function invocation. Flat: `var` does not open a scope.
#[derive(Debug, Default, Clone)]
pub struct Environment {
  vars: HashMap<String, Value>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds parameters positionally. Missing arguments stay unbound, extra
  /// ones are dropped.
  pub fn bind(params: &[String], args: Vec<Value>) -> Self {
    let vars = params.iter().cloned().zip(args).collect();
    Self { vars }
  }

  pub fn get(&self, name: &str) -> Result<&Value, CipherError> {
    self
      .vars
      .get(name)
      .ok_or_else(|| CipherError::UnboundVariable(name.to_string()))
  }

  pub fn set(&mut self, name: impl Into<String>, value: Value) {
    self.vars.insert(name.into(), value);
  }

  fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
    self.vars.get_mut(name)
  }
}

fn mismatch(operation: &'static str, expected: &'static str, found: &Value) -> CipherError {
  CipherError::TypeMismatch {
    operation,
    expected,
    found: found.type_name(),
  }
}

fn to_index(n: i64, len: usize) -> Result<usize, CipherError> {
  usize::try_from(n)
    .ok()
    .filter(|i| *i < len)
    .ok_or(CipherError::IndexOutOfRange { index: n, len })
}

/// Runs `function` to its first `return`.
pub fn run(
  interp: &mut CipherInterpreter,
  function: &Function,
  env: &mut Environment,
  depth: usize,
) -> Result<Value, CipherError> {
  for statement in &function.body {
    if let Some(value) = execute(interp, statement, env, depth)? {
      return Ok(value);
    }
  }
  Err(CipherError::MissingReturn(function.name.clone()))
}

/// Executes one statement; `Some` carries the value of a `return`.
pub fn execute(
  interp: &mut CipherInterpreter,
  statement: &Statement,
  env: &mut Environment,
  depth: usize,
) -> Result<Option<Value>, CipherError> {
  match statement {
    Statement::Return(expr) => evaluate(interp, expr, env, depth).map(Some),
    Statement::Assign {
      target,
      index: None,
      value,
    } => {
      let value = evaluate(interp, value, env, depth)?;
      env.set(target.clone(), value);
      Ok(None)
    }
    Statement::Assign {
      target,
      index: Some(index),
      value,
    } => {
      let value = evaluate(interp, value, env, depth)?;
      let index = evaluate(interp, index, env, depth)?.as_int("indexed assignment")?;
      assign_element(env, target, index, value)?;
      Ok(None)
    }
  }
}

fn assign_element(
  env: &mut Environment,
  target: &str,
  index: i64,
  value: Value,
) -> Result<(), CipherError> {
  let element = match value {
    Value::Str(s) => s,
    Value::Int(n) => n.to_string(),
    other => return Err(mismatch("indexed assignment", "string", &other)),
  };
  let slot = usize::try_from(index).map_err(|_| CipherError::IndexOutOfRange { index, len: 0 })?;

  if env.get_mut(target).is_none() {
    env.set(target, Value::Seq(Vec::new()));
  }

  match env.get_mut(target) {
    Some(Value::Seq(items)) => {
      if slot >= MAX_SEQUENCE_LEN {
        return Err(CipherError::IndexOutOfRange {
          index,
          len: items.len(),
        });
      }
      if slot >= items.len() {
        items.resize(slot + 1, String::new());
      }
      items[slot] = element;
      Ok(())
    }
    Some(other) => Err(mismatch("indexed assignment", "sequence", other)),
    None => Err(CipherError::UnboundVariable(target.to_string())),
  }
}

pub fn evaluate(
  interp: &mut CipherInterpreter,
  expr: &Expr,
  env: &mut Environment,
  depth: usize,
) -> Result<Value, CipherError> {
  match expr {
    Expr::Literal(n) => Ok(Value::Int(*n)),
    Expr::Variable(name) => env.get(name).cloned(),
    Expr::Member { object, op } => member(interp, object, op, env, depth),
    Expr::Index { object, index } => {
      let index = evaluate(interp, index, env, depth)?.as_int("index")?;
      match env.get(object)? {
        Value::Seq(items) => Ok(Value::Str(items[to_index(index, items.len())?].clone())),
        Value::Str(s) => {
          let len = s.chars().count();
          let i = to_index(index, len)?;
          Ok(Value::Str(s.chars().nth(i).map(String::from).unwrap_or_default()))
        }
        other => Err(mismatch("index", "sequence", other)),
      }
    }
    Expr::Modulo(a, b) => {
      let a = evaluate(interp, a, env, depth)?.as_int("%")?;
      let b = evaluate(interp, b, env, depth)?.as_int("%")?;
      a.checked_rem(b)
        .map(Value::Int)
        .ok_or(CipherError::DivisionByZero)
    }
    Expr::Call { function, args } => {
      let args = args
        .iter()
        .map(|arg| match arg {
          Arg::Literal(n) => Ok(Value::Int(*n)),
          Arg::Variable(name) => env.get(name).cloned(),
        })
        .collect::<Result<Vec<_>, _>>()?;
      interp.call_at(function, args, depth + 1)
    }
  }
}

fn member(
  interp: &mut CipherInterpreter,
  object: &str,
  op: &MemberOp,
  env: &mut Environment,
  depth: usize,
) -> Result<Value, CipherError> {
  match op {
    MemberOp::Split => match env.get(object)? {
      Value::Str(s) => Ok(Value::Seq(s.chars().map(String::from).collect())),
      other => Err(mismatch("split", "string", other)),
    },
    MemberOp::Reverse => match env.get_mut(object) {
      // reverses in place and hands back the same sequence
      Some(Value::Seq(items)) => {
        items.reverse();
        Ok(Value::Seq(items.clone()))
      }
      Some(other) => Err(mismatch("reverse", "sequence", other)),
      None => Err(CipherError::UnboundVariable(object.to_string())),
    },
    MemberOp::Join => match env.get(object)? {
      Value::Seq(items) => Ok(Value::Str(items.concat())),
      other => Err(mismatch("join", "sequence", other)),
    },
    MemberOp::Length => match env.get(object)? {
      Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
      Value::Seq(items) => Ok(Value::Int(items.len() as i64)),
      other => Err(mismatch("length", "string or sequence", other)),
    },
    MemberOp::Slice(start) => {
      let start = evaluate(interp, start, env, depth)?.as_int("slice")?;
      match env.get(object)? {
        Value::Seq(items) => Ok(Value::Seq(items[slice_start(start, items.len())..].to_vec())),
        Value::Str(s) => {
          let skip = slice_start(start, s.chars().count());
          Ok(Value::Str(s.chars().skip(skip).collect()))
        }
        other => Err(mismatch("slice", "string or sequence", other)),
      }
    }
  }
}

/// `slice` clamps like the scripting language does: negative counts from the
/// end, past-the-end yields empty.
fn slice_start(start: i64, len: usize) -> usize {
  if start < 0 {
    len.saturating_sub(start.unsigned_abs() as usize)
  } else {
    (start as usize).min(len)
  }
}
