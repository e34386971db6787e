//! Expression syntax.
//!
//! Precedence, loosest first:
//!
//! - `||`
//! - `&&`
//! - `==` `!=`
//! - `<` `>` `<=` `>=`
//! - `+` `-`
//! - `*` `/`
//! - unary `-` `!`
//! - literals, identifiers, `( expr )`
//!
//! Binary operators are left-associative. Every parenthesized
//! sub-expression becomes a `Group` node so that the source shape survives
//! into generated code.

use crate::error::LoadError;
use fsml_core::{BinOp, Expr, PrintValue};

/// Parses an expression.
pub fn parse_expr(input: &str) -> Result<Expr, LoadError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Parses one print argument: a double-quoted string or an expression.
pub fn parse_print_value(input: &str) -> Result<PrintValue, LoadError> {
    let trimmed = input.trim();
    if trimmed.starts_with('"') {
        let mut parser = Parser::new(trimmed);
        let text = parser.parse_string_value()?;
        parser.skip_whitespace();
        if parser.pos < trimmed.len() {
            return Err(parser.error("unexpected input after string"));
        }
        return Ok(PrintValue::Text(text));
    }
    parse_expr(input).map(PrintValue::Expr)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> LoadError {
        LoadError::Syntax {
            text: self.input.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_and()?;
        while self.eat_op(&[BinOp::Or]).is_some() {
            let right = self.parse_and()?;
            left = Expr::bin(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_equality()?;
        while self.eat_op(&[BinOp::And]).is_some() {
            let right = self.parse_equality()?;
            left = Expr::bin(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_relational()?;
        while let Some(op) = self.eat_op(&[BinOp::Eq, BinOp::Ne]) {
            let right = self.parse_relational()?;
            left = Expr::bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_additive()?;
        // Two-character operators first so `<=` is not read as `<`.
        while let Some(op) = self.eat_op(&[BinOp::Le, BinOp::Ge, BinOp::Lt, BinOp::Gt]) {
            let right = self.parse_additive()?;
            left = Expr::bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.eat_op(&[BinOp::Add, BinOp::Sub]) {
            let right = self.parse_multiplicative()?;
            left = Expr::bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, LoadError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.eat_op(&[BinOp::Mul, BinOp::Div]) {
            let right = self.parse_unary()?;
            left = Expr::bin(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, LoadError> {
        self.skip_whitespace();

        if self.peek_char() == Some('-') {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::neg(operand));
        }

        if self.peek_char() == Some('!') && !self.peek_str("!=") {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::not(operand));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, LoadError> {
        self.skip_whitespace();

        match self.peek_char() {
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.skip_whitespace();
                if self.peek_char() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(Expr::group(inner))
            }
            Some(c) if c.is_ascii_digit() => self.parse_integer(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.parse_identifier();
                Ok(match ident {
                    "true" => Expr::bool(true),
                    "false" => Expr::bool(false),
                    name => Expr::reference(name),
                })
            }
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_integer(&mut self) -> Result<Expr, LoadError> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }

        let digits = &self.input[start..self.pos];
        digits.parse::<i64>().map(Expr::int).map_err(|_| LoadError::Syntax {
            text: self.input.to_string(),
            position: start,
            reason: format!("integer literal out of range: '{}'", digits),
        })
    }

    fn parse_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_string_value(&mut self) -> Result<String, LoadError> {
        if self.peek_char() != Some('"') {
            return Err(self.error("expected string"));
        }
        self.pos += 1;

        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok(value),
                '\\' => {
                    let escaped = self
                        .peek_char()
                        .ok_or_else(|| self.error("unterminated escape sequence"))?;
                    self.pos += escaped.len_utf8();
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c => value.push(c),
            }
        }

        Err(self.error("unterminated string"))
    }

    /// Consumes the first operator of `ops` found at the cursor.
    fn eat_op(&mut self, ops: &[BinOp]) -> Option<BinOp> {
        self.skip_whitespace();
        let op = ops.iter().copied().find(|op| self.peek_str(op.symbol()))?;
        self.pos += op.symbol().len();
        Some(op)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_and_refs() {
        assert_eq!(parse_expr("42").unwrap(), Expr::int(42));
        assert_eq!(parse_expr(" true ").unwrap(), Expr::bool(true));
        assert_eq!(parse_expr("is_on").unwrap(), Expr::reference("is_on"));
        assert_eq!(parse_expr("trueish").unwrap(), Expr::reference("trueish"));
    }

    #[test]
    fn test_precedence() {
        // cnt > 10 || cnt < 20-7
        let expr = parse_expr("cnt > 10 || cnt < 20-7").unwrap();
        assert_eq!(
            expr,
            Expr::bin(
                BinOp::Or,
                Expr::bin(BinOp::Gt, Expr::reference("cnt"), Expr::int(10)),
                Expr::bin(
                    BinOp::Lt,
                    Expr::reference("cnt"),
                    Expr::bin(BinOp::Sub, Expr::int(20), Expr::int(7)),
                ),
            )
        );

        let expr = parse_expr("a + b * c == d && e").unwrap();
        assert_eq!(expr.to_string(), "a + b * c == d && e");
        assert!(matches!(expr, Expr::Bin { op: BinOp::And, .. }));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expr("10 - 3 - 2").unwrap();
        assert_eq!(
            expr,
            Expr::bin(
                BinOp::Sub,
                Expr::bin(BinOp::Sub, Expr::int(10), Expr::int(3)),
                Expr::int(2),
            )
        );
    }

    #[test]
    fn test_groups_are_kept() {
        let expr = parse_expr("20 * (cnt + 1)").unwrap();
        assert_eq!(
            expr,
            Expr::bin(
                BinOp::Mul,
                Expr::int(20),
                Expr::group(Expr::bin(BinOp::Add, Expr::reference("cnt"), Expr::int(1))),
            )
        );
        assert_eq!(parse_expr("((x))").unwrap(), Expr::group(Expr::group(Expr::reference("x"))));
    }

    #[test]
    fn test_unary() {
        assert_eq!(parse_expr("-5").unwrap(), Expr::neg(Expr::int(5)));
        assert_eq!(parse_expr("!!on").unwrap(), Expr::not(Expr::not(Expr::reference("on"))));
        assert_eq!(
            parse_expr("a != -b").unwrap(),
            Expr::bin(BinOp::Ne, Expr::reference("a"), Expr::neg(Expr::reference("b")))
        );
    }

    #[test]
    fn test_relational_two_char_ops() {
        assert_eq!(
            parse_expr("a <= 3").unwrap(),
            Expr::bin(BinOp::Le, Expr::reference("a"), Expr::int(3))
        );
        assert_eq!(
            parse_expr("a>=3").unwrap(),
            Expr::bin(BinOp::Ge, Expr::reference("a"), Expr::int(3))
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_expr("(a + 1"),
            Err(LoadError::Syntax { reason, .. }) if reason == "expected ')'"
        ));
        assert!(matches!(
            parse_expr("a +"),
            Err(LoadError::Syntax { reason, .. }) if reason == "unexpected end of expression"
        ));
        assert!(matches!(
            parse_expr("a b"),
            Err(LoadError::Syntax { position: 2, .. })
        ));
        assert!(matches!(parse_expr("a % 2"), Err(LoadError::Syntax { .. })));
        assert!(matches!(parse_expr(""), Err(LoadError::Syntax { .. })));
        assert!(matches!(
            parse_expr("99999999999999999999"),
            Err(LoadError::Syntax { .. })
        ));
    }

    #[test]
    fn test_print_values() {
        assert_eq!(
            parse_print_value("\"count=\"").unwrap(),
            PrintValue::Text("count=".to_string())
        );
        assert_eq!(
            parse_print_value(r#""say \"hi\"""#).unwrap(),
            PrintValue::Text("say \"hi\"".to_string())
        );
        assert_eq!(
            parse_print_value("count + 1").unwrap(),
            PrintValue::Expr(Expr::bin(BinOp::Add, Expr::reference("count"), Expr::int(1)))
        );
        assert!(parse_print_value("\"open").is_err());
        assert!(parse_print_value("\"a\" b").is_err());
    }
}
