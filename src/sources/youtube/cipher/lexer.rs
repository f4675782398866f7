use std::fmt;

use super::error::CipherError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  Ident(String),
  Number(i64),
  Str(String),
  Dot,
  LParen,
  RParen,
  LBracket,
  RBracket,
  Comma,
  Percent,
  Assign,
  Semicolon,
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Token::Ident(name) => write!(f, "{}", name),
      Token::Number(n) => write!(f, "{}", n),
      Token::Str(s) => write!(f, "\"{}\"", s),
      Token::Dot => write!(f, "."),
      Token::LParen => write!(f, "("),
      Token::RParen => write!(f, ")"),
      Token::LBracket => write!(f, "["),
      Token::RBracket => write!(f, "]"),
      Token::Comma => write!(f, ","),
      Token::Percent => write!(f, "%"),
      Token::Assign => write!(f, "="),
      Token::Semicolon => write!(f, ";"),
    }
  }
}

/// Joins tokens back into compact source text for error messages.
pub fn render(tokens: &[Token]) -> String {
  let mut out = String::new();
  for (i, token) in tokens.iter().enumerate() {
    // keep `var a` and `return a` readable
    if i > 0 {
      if let (Token::Ident(_), Token::Ident(_) | Token::Number(_)) = (&tokens[i - 1], token) {
        out.push(' ');
      }
    }
    out.push_str(&token.to_string());
  }
  out
}

pub(crate) fn is_ident_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, CipherError> {
  let mut tokens = Vec::new();
  let mut chars = src.char_indices().peekable();

  while let Some(&(start, c)) = chars.peek() {
    if c.is_whitespace() {
      chars.next();
      continue;
    }

    if is_ident_start(c) {
      let mut end = start;
      while let Some(&(i, c)) = chars.peek() {
        if !is_ident_char(c) {
          break;
        }
        end = i + c.len_utf8();
        chars.next();
      }
      tokens.push(Token::Ident(src[start..end].to_string()));
      continue;
    }

    if c.is_ascii_digit() {
      let mut end = start;
      while let Some(&(i, c)) = chars.peek() {
        if is_ident_char(c) && !c.is_ascii_digit() {
          return Err(CipherError::unsupported(format!(
            "malformed number near `{}`",
            &src[start..i + c.len_utf8()]
          )));
        }
        if !c.is_ascii_digit() {
          break;
        }
        end = i + 1;
        chars.next();
      }
      let text = &src[start..end];
      let value = text
        .parse::<i64>()
        .map_err(|_| CipherError::unsupported(format!("integer literal `{}` out of range", text)))?;
      tokens.push(Token::Number(value));
      continue;
    }

    if c == '"' || c == '\'' {
      chars.next();
      let mut value = String::new();
      let mut closed = false;
      for (_, ch) in chars.by_ref() {
        if ch == c {
          closed = true;
          break;
        }
        if ch == '\\' {
          return Err(CipherError::unsupported("escape sequence in string literal"));
        }
        value.push(ch);
      }
      if !closed {
        return Err(CipherError::unsupported("unterminated string literal"));
      }
      tokens.push(Token::Str(value));
      continue;
    }

    let token = match c {
      '.' => Token::Dot,
      '(' => Token::LParen,
      ')' => Token::RParen,
      '[' => Token::LBracket,
      ']' => Token::RBracket,
      ',' => Token::Comma,
      '%' => Token::Percent,
      ';' => Token::Semicolon,
      '=' => Token::Assign,
      other => {
        return Err(CipherError::unsupported(format!(
          "unexpected character `{}`",
          other
        )));
      }
    };
    chars.next();

    // `==` and `%=` style operators are outside the grammar
    if matches!(token, Token::Assign | Token::Percent) {
      if let Some(&(_, '=')) = chars.peek() {
        return Err(CipherError::unsupported(format!("operator `{}=`", c)));
      }
    }

    tokens.push(token);
  }

  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokenizes_statement_forms() {
    let tokens = tokenize(r#"var b=a.split("");a[0]=b[c%a.length]"#).expect("valid source");
    assert_eq!(
      tokens,
      vec![
        Token::Ident("var".into()),
        Token::Ident("b".into()),
        Token::Assign,
        Token::Ident("a".into()),
        Token::Dot,
        Token::Ident("split".into()),
        Token::LParen,
        Token::Str(String::new()),
        Token::RParen,
        Token::Semicolon,
        Token::Ident("a".into()),
        Token::LBracket,
        Token::Number(0),
        Token::RBracket,
        Token::Assign,
        Token::Ident("b".into()),
        Token::LBracket,
        Token::Ident("c".into()),
        Token::Percent,
        Token::Ident("a".into()),
        Token::Dot,
        Token::Ident("length".into()),
        Token::RBracket,
      ]
    );
  }

  #[test]
  fn dollar_and_underscore_are_identifier_chars() {
    let tokens = tokenize("$a_1").expect("valid identifier");
    assert_eq!(tokens, vec![Token::Ident("$a_1".into())]);
  }

  #[test]
  fn rejects_operators_outside_grammar() {
    for src in ["a+b", "a-1", "a==b", "a%=2", "{", "a?b:c", "1a"] {
      assert!(
        matches!(tokenize(src), Err(CipherError::UnsupportedConstruct(_))),
        "{} should be rejected",
        src
      );
    }
  }

  #[test]
  fn rejects_unterminated_strings() {
    assert!(tokenize(r#"a.split("")"#).is_ok());
    assert!(tokenize(r#"a.split(")"#).is_err());
  }

  #[test]
  fn render_restores_keyword_spacing() {
    let tokens = tokenize("return  a.join('')").expect("valid source");
    assert_eq!(render(&tokens), r#"return a.join("")"#);
  }
}
