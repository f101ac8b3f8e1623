//! Recursive-descent parser for closed arithmetic expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! comparison := additive (("<" | "<=" | ">" | ">=" | "==" | "!=") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := primary ("^" unary)?
//! primary    := NUMBER | "(" comparison ")" | FUNCTION "(" args ")"
//! ```

use super::lexer::{tokenize, Token};

/// Deepest expression tree the parser will build. Parentheses, unary signs,
/// powers, function calls and each chained binary operator all count.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    If,
    Min,
    Max,
    Abs,
    Round,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "IF" => Some(Function::If),
            "MIN" => Some(Function::Min),
            "MAX" => Some(Function::Max),
            "ABS" => Some(Function::Abs),
            "ROUND" => Some(Function::Round),
            _ => None,
        }
    }

    /// Accepted argument counts as (min, max).
    fn arity(&self) -> (usize, usize) {
        match self {
            Function::If => (3, 3),
            Function::Min | Function::Max => (1, usize::MAX),
            Function::Abs => (1, 1),
            Function::Round => (1, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Negate(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { func: Function, args: Vec<Expr> },
}

pub fn parse(source: &str) -> Result<Expr, String> {
    let tokens = tokenize(source).map_err(|offset| {
        let ch = source[offset..].chars().next().unwrap_or('?');
        format!("unexpected character '{}' at offset {}", ch, offset)
    })?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }

    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(format!("unexpected {} after end of expression", describe(tok))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn deeper(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(format!("expression nested deeper than {} levels", MAX_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(format!("expected {}, found {}", describe(&expected), describe(&tok))),
            None => Err(format!("expected {}, found end of expression", describe(&expected))),
        }
    }

    // Each rule restores the depth it started from before returning a node.
    // Errors abort the whole parse, so they skip the restore. A left-leaning
    // chain grows the tree by one level per operator, so chained operators
    // count too.
    fn comparison(&mut self) -> Result<Expr, String> {
        let saved = self.depth;
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Less,
                Some(Token::Le) => BinaryOp::LessEqual,
                Some(Token::Gt) => BinaryOp::Greater,
                Some(Token::Ge) => BinaryOp::GreaterEqual,
                Some(Token::EqEq) => BinaryOp::Equal,
                Some(Token::NotEq) => BinaryOp::NotEqual,
                _ => break,
            };
            self.pos += 1;
            self.deeper()?;
            let rhs = self.additive()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = saved;
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let saved = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.pos += 1;
            self.deeper()?;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = saved;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let saved = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => break,
            };
            self.pos += 1;
            self.deeper()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        self.depth = saved;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        let negate = match self.peek() {
            Some(Token::Minus) => true,
            Some(Token::Plus) => false,
            _ => return self.power(),
        };
        self.pos += 1;
        let saved = self.depth;
        self.deeper()?;
        let inner = self.unary()?;
        self.depth = saved;
        Ok(if negate { Expr::Negate(Box::new(inner)) } else { inner })
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if self.peek() != Some(&Token::Caret) {
            return Ok(base);
        }
        self.pos += 1;
        let saved = self.depth;
        self.deeper()?;
        // Right-associative: 2^3^2 == 2^(3^2)
        let exponent = self.unary()?;
        self.depth = saved;
        Ok(Expr::Binary { op: BinaryOp::Power, lhs: Box::new(base), rhs: Box::new(exponent) })
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let saved = self.depth;
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                self.deeper()?;
                let inner = self.comparison()?;
                self.expect(Token::RParen)?;
                self.depth = saved;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(format!("unknown reference '{}'", name));
                }
                let func = Function::from_name(&name).ok_or_else(|| format!("unknown function '{}'", name))?;
                self.pos += 1;
                self.deeper()?;
                let args = self.arguments()?;
                self.depth = saved;
                let (min, max) = func.arity();
                if args.len() < min || args.len() > max {
                    return Err(format!("{} takes {} argument(s), got {}", name.to_ascii_uppercase(), arity_text(min, max), args.len()));
                }
                Ok(Expr::Call { func, args })
            }
            Some(tok) => Err(format!("unexpected {}", describe(&tok))),
            None => Err("unexpected end of expression".into()),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.comparison()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(tok) => return Err(format!("expected ',' or ')', found {}", describe(&tok))),
                None => return Err("unterminated argument list".into()),
            }
        }
    }
}

fn arity_text(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else if max == usize::MAX {
        format!("at least {}", min)
    } else {
        format!("{} to {}", min, max)
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Number(n) => format!("number {}", n),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
        Token::Caret => "'^'".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Lt => "'<'".into(),
        Token::Le => "'<='".into(),
        Token::Gt => "'>'".into(),
        Token::Ge => "'>='".into(),
        Token::EqEq => "'=='".into(),
        Token::NotEq => "'!='".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence_multiplication_over_addition() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary { op: BinaryOp::Multiply, lhs: num(2.0), rhs: num(3.0) }),
            }
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse("-2^2").unwrap();
        assert_eq!(
            expr,
            Expr::Negate(Box::new(Expr::Binary { op: BinaryOp::Power, lhs: num(2.0), rhs: num(2.0) }))
        );
    }

    #[test]
    fn test_leftover_identifier_is_unknown_reference() {
        assert_eq!(parse("Students * 2").unwrap_err(), "unknown reference 'Students'");
    }

    #[test]
    fn test_function_arity_is_checked() {
        assert!(parse("IF(1, 2)").unwrap_err().contains("takes 3 argument"));
        assert!(parse("max(1, 2, 3)").is_ok());
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert!(parse(&ok).is_ok());

        let deep_parens = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        let negations = format!("{}1", "- ".repeat(5000));
        let powers = format!("{}2", "2 ^ ".repeat(5000));
        let calls = format!("{}1{}", "ABS(".repeat(1000), ")".repeat(1000));
        for source in [deep_parens, negations, powers, calls] {
            assert!(parse(&source).unwrap_err().contains("nested deeper than"));
        }
    }

    #[test]
    fn test_long_operator_chains_are_bounded() {
        let short = vec!["1"; 200].join(" + ");
        assert!(parse(&short).is_ok());
        let long = vec!["1"; 100_000].join(" + ");
        assert!(parse(&long).unwrap_err().contains("nested deeper than"));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(parse("(1 + 2").is_err());
        assert!(parse("1 + 2)").is_err());
    }
}
