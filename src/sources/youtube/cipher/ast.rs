//! Syntax tree of the signature-function subset.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Literal(i64),
  Variable(String),
  Member { object: String, op: MemberOp },
  Index { object: String, index: Box<Expr> },
  Modulo(Box<Expr>, Box<Expr>),
  Call { function: String, args: Vec<Arg> },
}

/// The only member accesses the interpreter knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOp {
  /// `split("")`
  Split,
  /// `reverse()`
  Reverse,
  /// `join("")`
  Join,
  /// `length`
  Length,
  /// `slice(<expr>)`
  Slice(Box<Expr>),
}

/// Call arguments are restricted to literals and plain variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
  Literal(i64),
  Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
  Return(Expr),
  Assign {
    target: String,
    index: Option<Expr>,
    value: Expr,
  },
}

/// A parsed player-script function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
  pub name: String,
  pub params: Vec<String>,
  pub body: Vec<Statement>,
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::Literal(n) => write!(f, "{}", n),
      Expr::Variable(name) => write!(f, "{}", name),
      Expr::Member { object, op } => write!(f, "{}.{}", object, op),
      Expr::Index { object, index } => write!(f, "{}[{}]", object, index),
      Expr::Modulo(a, b) => write!(f, "{}%{}", a, b),
      Expr::Call { function, args } => {
        write!(f, "{}(", function)?;
        for (i, arg) in args.iter().enumerate() {
          if i > 0 {
            write!(f, ",")?;
          }
          match arg {
            Arg::Literal(n) => write!(f, "{}", n)?,
            Arg::Variable(name) => write!(f, "{}", name)?,
          }
        }
        write!(f, ")")
      }
    }
  }
}

impl fmt::Display for MemberOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MemberOp::Split => write!(f, "split(\"\")"),
      MemberOp::Reverse => write!(f, "reverse()"),
      MemberOp::Join => write!(f, "join(\"\")"),
      MemberOp::Length => write!(f, "length"),
      MemberOp::Slice(start) => write!(f, "slice({})", start),
    }
  }
}
