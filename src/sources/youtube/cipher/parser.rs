//! Recursive-descent parser for the signature-function subset.
//!
//! ```text
//! statement := "return" expr | ["var"] ident ["[" expr "]"] "=" expr
//! expr      := postfix ("%" postfix)*
//! postfix   := number | ident [ "." member | "[" expr "]" | "(" args ")" ]
//! member    := split("") | reverse() | join("") | length | slice(expr)
//! args      := [arg ("," arg)*]      arg := number | ident
//! ```

use super::{
  ast::{Arg, Expr, Function, MemberOp, Statement},
  error::CipherError,
  lexer::{Token, is_ident_char, is_ident_start, render, tokenize},
};

/// Deepest expression tree accepted, counting `[..]`, `slice(..)` and `%`.
const MAX_NESTING: usize = 64;

const RESERVED: &[&str] = &["function", "var", "return", "new", "this", "typeof", "delete"];

pub fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if is_ident_start(c) => chars.all(is_ident_char),
    _ => false,
  }
}

/// Parses a function from its raw parameter list and body text.
pub fn parse_function(name: &str, params: &str, body: &str) -> Result<Function, CipherError> {
  let params = parse_params(params)?;
  let tokens = tokenize(body)?;

  let mut statements = Vec::new();
  for chunk in tokens.split(|t| *t == Token::Semicolon) {
    if chunk.is_empty() {
      continue;
    }
    statements.push(parse_statement_tokens(chunk)?);
  }

  Ok(Function {
    name: name.to_string(),
    params,
    body: statements,
  })
}

fn parse_params(params: &str) -> Result<Vec<String>, CipherError> {
  let params = params.trim();
  if params.is_empty() {
    return Ok(Vec::new());
  }

  params
    .split(',')
    .map(|p| {
      let p = p.trim();
      if is_identifier(p) && !RESERVED.contains(&p) {
        Ok(p.to_string())
      } else {
        Err(CipherError::unsupported(format!("parameter `{}`", p)))
      }
    })
    .collect()
}

pub fn parse_statement(src: &str) -> Result<Statement, CipherError> {
  let tokens = tokenize(src)?;
  if tokens.contains(&Token::Semicolon) {
    return Err(CipherError::unsupported(format!("multiple statements in `{}`", src)));
  }
  parse_statement_tokens(&tokens)
}

pub fn parse_expression(src: &str) -> Result<Expr, CipherError> {
  let tokens = tokenize(src)?;
  let mut parser = Parser::new(&tokens);
  let expr = parser.expression()?;
  parser.finish()?;
  Ok(expr)
}

fn parse_statement_tokens(tokens: &[Token]) -> Result<Statement, CipherError> {
  let mut parser = Parser::new(tokens);

  if parser.eat_keyword("return") {
    if parser.at_end() {
      return Err(CipherError::unsupported("bare `return`"));
    }
    let value = parser.expression()?;
    parser.finish()?;
    return Ok(Statement::Return(value));
  }

  parser.eat_keyword("var");

  let target = parser.identifier()?;
  let index = if parser.eat(&Token::LBracket) {
    let index = parser.expression()?;
    parser.expect(&Token::RBracket)?;
    Some(index)
  } else {
    None
  };
  parser.expect(&Token::Assign)?;
  let value = parser.expression()?;
  parser.finish()?;

  Ok(Statement::Assign {
    target,
    index,
    value,
  })
}

struct Parser<'t> {
  tokens: &'t [Token],
  pos: usize,
  depth: usize,
}

impl<'t> Parser<'t> {
  fn new(tokens: &'t [Token]) -> Self {
    Self {
      tokens,
      pos: 0,
      depth: 0,
    }
  }

  fn peek(&self) -> Option<&'t Token> {
    self.tokens.get(self.pos)
  }

  fn at_end(&self) -> bool {
    self.pos >= self.tokens.len()
  }

  fn eat(&mut self, expected: &Token) -> bool {
    if self.peek() == Some(expected) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn eat_keyword(&mut self, keyword: &str) -> bool {
    match self.peek() {
      Some(Token::Ident(name)) if name == keyword => {
        self.pos += 1;
        true
      }
      _ => false,
    }
  }

  fn unexpected(&self) -> CipherError {
    match self.peek() {
      Some(token) => CipherError::unsupported(format!(
        "unexpected `{}` in `{}`",
        token,
        render(self.tokens)
      )),
      None => CipherError::unsupported(format!(
        "unexpected end of `{}`",
        render(self.tokens)
      )),
    }
  }

  fn expect(&mut self, expected: &Token) -> Result<(), CipherError> {
    if self.eat(expected) {
      Ok(())
    } else {
      Err(self.unexpected())
    }
  }

  fn finish(&self) -> Result<(), CipherError> {
    if self.at_end() {
      Ok(())
    } else {
      Err(self.unexpected())
    }
  }

  fn identifier(&mut self) -> Result<String, CipherError> {
    match self.peek() {
      Some(Token::Ident(name)) if !RESERVED.contains(&name.as_str()) => {
        self.pos += 1;
        Ok(name.clone())
      }
      _ => Err(self.unexpected()),
    }
  }

  fn too_deep(&self) -> CipherError {
    CipherError::unsupported(format!(
      "expression nested deeper than {} levels",
      MAX_NESTING
    ))
  }

  fn expression(&mut self) -> Result<Expr, CipherError> {
    if self.depth >= MAX_NESTING {
      return Err(self.too_deep());
    }
    self.depth += 1;
    let expr = self.modulo_chain();
    self.depth -= 1;
    expr
  }

  fn modulo_chain(&mut self) -> Result<Expr, CipherError> {
    let mut lhs = self.postfix()?;
    let mut operators = 0;
    while self.eat(&Token::Percent) {
      operators += 1;
      // the chain folds to the left, so each `%` adds a tree level
      if self.depth + operators > MAX_NESTING {
        return Err(self.too_deep());
      }
      let rhs = self.postfix()?;
      lhs = Expr::Modulo(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
  }

  fn postfix(&mut self) -> Result<Expr, CipherError> {
    let expr = match self.peek() {
      Some(Token::Number(n)) => {
        self.pos += 1;
        return Ok(Expr::Literal(*n));
      }
      Some(Token::Ident(_)) => {
        let name = self.identifier()?;
        match self.peek() {
          Some(Token::Dot) => {
            self.pos += 1;
            let op = self.member()?;
            Expr::Member { object: name, op }
          }
          Some(Token::LBracket) => {
            self.pos += 1;
            let index = self.expression()?;
            self.expect(&Token::RBracket)?;
            Expr::Index {
              object: name,
              index: Box::new(index),
            }
          }
          Some(Token::LParen) => {
            self.pos += 1;
            let args = self.arguments()?;
            Expr::Call {
              function: name,
              args,
            }
          }
          _ => return Ok(Expr::Variable(name)),
        }
      }
      _ => return Err(self.unexpected()),
    };

    // no chaining: `a.split("").reverse()` is outside the grammar
    if matches!(
      self.peek(),
      Some(Token::Dot | Token::LBracket | Token::LParen)
    ) {
      return Err(self.unexpected());
    }
    Ok(expr)
  }

  fn member(&mut self) -> Result<MemberOp, CipherError> {
    let name = match self.peek() {
      Some(Token::Ident(name)) => {
        self.pos += 1;
        name.as_str()
      }
      _ => return Err(self.unexpected()),
    };

    match name {
      "split" => {
        self.empty_string_call()?;
        Ok(MemberOp::Split)
      }
      "join" => {
        self.empty_string_call()?;
        Ok(MemberOp::Join)
      }
      "reverse" => {
        self.expect(&Token::LParen)?;
        self.expect(&Token::RParen)?;
        Ok(MemberOp::Reverse)
      }
      "length" => Ok(MemberOp::Length),
      "slice" => {
        self.expect(&Token::LParen)?;
        let start = self.expression()?;
        self.expect(&Token::RParen)?;
        Ok(MemberOp::Slice(Box::new(start)))
      }
      other => Err(CipherError::unsupported(format!(
        "member `{}` in `{}`",
        other,
        render(self.tokens)
      ))),
    }
  }

  fn empty_string_call(&mut self) -> Result<(), CipherError> {
    self.expect(&Token::LParen)?;
    match self.peek() {
      Some(Token::Str(s)) if s.is_empty() => self.pos += 1,
      _ => return Err(self.unexpected()),
    }
    self.expect(&Token::RParen)
  }

  fn arguments(&mut self) -> Result<Vec<Arg>, CipherError> {
    let mut args = Vec::new();
    if self.eat(&Token::RParen) {
      return Ok(args);
    }

    loop {
      let arg = match self.peek() {
        Some(Token::Number(n)) => {
          self.pos += 1;
          Arg::Literal(*n)
        }
        Some(Token::Ident(_)) => Arg::Variable(self.identifier()?),
        _ => return Err(self.unexpected()),
      };
      args.push(arg);

      if self.eat(&Token::RParen) {
        return Ok(args);
      }
      self.expect(&Token::Comma)?;
    }
  }
}
