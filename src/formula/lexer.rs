//! Tokens of the arithmetic formula language.
//!
//! The lexer only ever sees text after reference substitution, so driver names
//! have already been replaced by numeric literals. Identifiers that survive are
//! function names or unresolved references.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
}

/// Tokenizes `source`, returning the byte offset of the first unrecognised character on failure.
pub fn tokenize(source: &str) -> Result<Vec<Token>, usize> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(t) => tokens.push(t),
            Err(()) => return Err(lexer.span().start),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_operators() {
        let tokens = tokenize("(500000.0) * 1e-3 <= .5").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Number(500000.0),
                Token::RParen,
                Token::Star,
                Token::Number(1e-3),
                Token::Le,
                Token::Number(0.5),
            ]
        );
    }

    #[test]
    fn test_unknown_character_reports_offset() {
        assert_eq!(tokenize("1 + $x"), Err(4));
    }
}
