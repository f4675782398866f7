//! Interpreter for the signature-scrambling functions of the player script.
//!
//! Only a closed subset of the scripting language is understood: string
//! splitting, reversal, slicing, element swaps through `%` indices and calls
//! between such helpers. Anything else fails with
//! [`CipherError::UnsupportedConstruct`] instead of being guessed at.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::{collections::HashMap, sync::Arc};

use regex::Regex;
use tracing::trace;

pub use self::{
  ast::Function,
  error::CipherError,
  eval::{Environment, Value},
};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 50;

pub struct CipherInterpreter {
  script: String,
  programs: HashMap<String, Arc<Function>>,
  max_depth: usize,
}

impl CipherInterpreter {
  pub fn new(script: impl Into<String>) -> Self {
    Self {
      script: script.into(),
      programs: HashMap::new(),
      max_depth: DEFAULT_MAX_CALL_DEPTH,
    }
  }

  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Parsed body of `name`, located in the script on first use.
  pub fn program(&mut self, name: &str) -> Result<Arc<Function>, CipherError> {
    if let Some(program) = self.programs.get(name) {
      return Ok(program.clone());
    }

    let (params, body) = locate_function(&self.script, name)?;
    let program = Arc::new(parser::parse_function(name, &params, &body)?);
    trace!(
      "Parsed cipher function {} ({} statements)",
      name,
      program.body.len()
    );
    self.programs.insert(name.to_string(), program.clone());
    Ok(program)
  }

  pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, CipherError> {
    self.call_at(name, args, 0)
  }

  pub(crate) fn call_at(
    &mut self,
    name: &str,
    args: Vec<Value>,
    depth: usize,
  ) -> Result<Value, CipherError> {
    if depth >= self.max_depth {
      return Err(CipherError::RecursionLimitExceeded(self.max_depth));
    }

    let program = self.program(name)?;
    let mut env = Environment::bind(&program.params, args);
    eval::run(self, &program, &mut env, depth)
  }

  /// Runs `name` with the scrambled signature as its only argument.
  pub fn decipher(&mut self, name: &str, scrambled: &str) -> Result<String, CipherError> {
    self.call(name, vec![Value::from(scrambled)])?.into_string()
  }
}

/// Finds `function N(..){..}`, `N=function(..){..}` or
/// `var N=function(..){..}` and returns the raw parameter and body text.
fn locate_function(script: &str, name: &str) -> Result<(String, String), CipherError> {
  if !parser::is_identifier(name) {
    return Err(CipherError::FunctionNotFound(name.to_string()));
  }

  let escaped = regex::escape(name);
  let pattern = format!(
    r"(?:function\s+{0}|(?:^|[^\w$.]){0}\s*=\s*function)\s*\(([^)]*)\)\s*\{{([^}}]*)\}}",
    escaped
  );
  let re = Regex::new(&pattern).map_err(|_| CipherError::FunctionNotFound(name.to_string()))?;

  re.captures(script)
    .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    .ok_or_else(|| CipherError::FunctionNotFound(name.to_string()))
}
