//! Formula tokenizer
//!
//! Two scanners live here. [`tokenize`] is the strict tokenizer used by the
//! parser: it accepts only the formula grammar and fails on anything else.
//! [`scan_references`] is a lenient scanner used when rewriting formula text:
//! it finds cell and range references outside string literals and ignores
//! everything else, so formulas that no longer parse (for example ones that
//! already contain `#REF!`) can still be rewritten.

use crate::error::{FormulaError, FormulaResult};
use comment_sheet_core::{CellAddress, CellError};
use std::ops::Range;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Token kinds produced by [`tokenize`]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    String(String),
    Boolean(bool),
    Cell(CellAddress),
    CellRange(CellAddress, CellAddress),
    /// Function name (uppercased); the `(` follows as its own token
    Function(String),
    CmpOp(CmpOp),
    /// `+` (false) or `-` (true)
    AddOp { minus: bool },
    /// `*` (false) or `/` (true)
    MulOp { divide: bool },
    Pow,
    LParen,
    RParen,
    Comma,
    /// Bare word not followed by `(` (uppercased)
    Identifier(String),
    /// Error literal such as `#REF!`
    Error(CellError),
}

/// A token with its byte span in the formula body
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize a formula body (the text after the leading `=`)
///
/// # Example
/// ```rust
/// use comment_sheet_formula::lexer::{tokenize, Token};
///
/// let tokens = tokenize("SUM(A1:b2)").unwrap();
/// assert!(matches!(tokens[0].token, Token::Function(ref name) if name == "SUM"));
/// assert!(matches!(tokens[2].token, Token::CellRange(_, _)));
/// assert!(tokenize("1 & 2").is_err());
/// ```
pub fn tokenize(body: &str) -> FormulaResult<Vec<SpannedToken>> {
    Lexer::new(body).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<SpannedToken>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> FormulaResult<Vec<SpannedToken>> {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
                continue;
            }

            let start = self.pos;
            let token = match c {
                '+' | '-' => {
                    self.advance();
                    Token::AddOp { minus: c == '-' }
                }
                '*' | '/' => {
                    self.advance();
                    Token::MulOp { divide: c == '/' }
                }
                '^' => {
                    self.advance();
                    Token::Pow
                }
                '(' => {
                    self.advance();
                    Token::LParen
                }
                ')' => {
                    self.advance();
                    Token::RParen
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '<' | '>' | '=' | '!' => self.scan_comparison()?,
                '"' => self.scan_string()?,
                '#' => self.scan_error()?,
                c if c.is_ascii_digit() => self.scan_number(),
                '.' if self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()) => {
                    self.scan_number()
                }
                c if c.is_ascii_alphabetic() || c == '$' || c == '_' => self.scan_word()?,
                other => {
                    return Err(FormulaError::UnexpectedChar {
                        ch: other,
                        pos: start,
                    })
                }
            };

            self.tokens.push(SpannedToken {
                token,
                span: start..self.pos,
            });
        }

        Ok(self.tokens)
    }

    fn scan_comparison(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        let first = self.peek_char();
        self.advance();
        let second = self.peek_char();

        let (op, two) = match (first, second) {
            (Some('<'), Some('=')) => (CmpOp::Le, true),
            (Some('>'), Some('=')) => (CmpOp::Ge, true),
            (Some('<'), Some('>')) => (CmpOp::Ne, true),
            (Some('!'), Some('=')) => (CmpOp::Ne, true),
            (Some('='), Some('=')) => (CmpOp::Eq, true),
            (Some('<'), _) => (CmpOp::Lt, false),
            (Some('>'), _) => (CmpOp::Gt, false),
            (Some('='), _) => (CmpOp::Eq, false),
            _ => {
                return Err(FormulaError::UnexpectedChar {
                    ch: first.unwrap_or('!'),
                    pos: start,
                })
            }
        };

        if two {
            self.advance();
        }
        Ok(Token::CmpOp(op))
    }

    fn scan_error(&mut self) -> FormulaResult<Token> {
        let rest = &self.input[self.pos..];
        let found = CellError::ALL.into_iter().find(|e| {
            let marker = e.as_str();
            rest.get(..marker.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(marker))
        });
        match found {
            Some(error) => {
                self.pos += error.as_str().len();
                Ok(Token::Error(error))
            }
            None => Err(FormulaError::UnexpectedChar {
                ch: '#',
                pos: self.pos,
            }),
        }
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let content_start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '"' {
                let s = self.input[content_start..self.pos].to_string();
                self.advance();
                return Ok(Token::String(s));
            }
            self.advance();
        }

        Err(FormulaError::Parse(format!(
            "Unterminated string starting at position {}",
            start
        )))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits actually follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self
                .peek_char_at(1)
                .map_or(false, |c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(0.0))
    }

    fn scan_word(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        let end = word_end(self.input, start);
        let word = &self.input[start..end];
        self.pos = end;

        if self.peek_char() == Some('(') {
            if word.contains('$') {
                return Err(FormulaError::Parse(format!(
                    "Invalid function name '{}'",
                    word
                )));
            }
            return Ok(Token::Function(word.to_ascii_uppercase()));
        }

        if let Some(addr) = parse_reference(word) {
            // A cell immediately followed by `:` and another cell is a range
            if self.peek_char() == Some(':') {
                let second_start = self.pos + 1;
                let second_end = word_end(self.input, second_start);
                if second_end > second_start {
                    if let Some(end_addr) = parse_reference(&self.input[second_start..second_end]) {
                        self.pos = second_end;
                        return Ok(Token::CellRange(addr, end_addr));
                    }
                }
                return Err(FormulaError::Parse(format!(
                    "Invalid range starting at position {}",
                    start
                )));
            }
            return Ok(Token::Cell(addr));
        }

        if word.contains('$') {
            return Err(FormulaError::Parse(format!("Invalid reference '{}'", word)));
        }

        let upper = word.to_ascii_uppercase();
        match upper.as_str() {
            "TRUE" => Ok(Token::Boolean(true)),
            "FALSE" => Ok(Token::Boolean(false)),
            _ => Ok(Token::Identifier(upper)),
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// End of the identifier-like run starting at `start`
fn word_end(input: &str, start: usize) -> usize {
    input[start..]
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(input.len(), |(i, _)| start + i)
}

/// Parse `[$]letters[$]digits` occupying the whole word
fn parse_reference(word: &str) -> Option<CellAddress> {
    let bytes = word.as_bytes();
    let mut i = 0;

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let letters = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letters {
        return None;
    }
    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let digits = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits || i != bytes.len() {
        return None;
    }

    CellAddress::parse(word).ok()
}

/// What a reference found by [`scan_references`] looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Cell(CellAddress),
    Range(CellAddress, CellAddress),
}

/// A cell or range reference located in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub kind: ReferenceKind,
    /// Byte span of the whole reference text
    pub span: Range<usize>,
}

/// Find every cell and range reference outside string literals
///
/// Words immediately followed by `(` are function names and are skipped, as
/// are words glued to a preceding identifier character.
pub fn scan_references(text: &str) -> Vec<ReferenceToken> {
    let mut refs = Vec::new();
    let mut pos = 0;
    let mut prev: Option<char> = None;

    while let Some(c) = text[pos..].chars().next() {
        if c == '"' {
            // Skip the literal; an unterminated one runs to the end
            pos = text[pos + 1..]
                .find('"')
                .map_or(text.len(), |i| pos + 1 + i + 1);
            prev = Some('"');
            continue;
        }

        let glued = prev.map_or(false, |p| is_word_char(p) || p == '#');
        if !glued && (c.is_ascii_alphabetic() || c == '$') {
            let end = word_end(text, pos);
            let word = &text[pos..end];
            let is_call = text[end..].starts_with('(');

            if !is_call {
                if let Some(addr) = parse_reference(word) {
                    let mut span_end = end;
                    let mut kind = ReferenceKind::Cell(addr);

                    if text[end..].starts_with(':') {
                        let second_end = word_end(text, end + 1);
                        if let Some(end_addr) = parse_reference(&text[end + 1..second_end]) {
                            kind = ReferenceKind::Range(addr, end_addr);
                            span_end = second_end;
                        }
                    }

                    refs.push(ReferenceToken {
                        kind,
                        span: pos..span_end,
                    });
                    prev = text[..span_end].chars().next_back();
                    pos = span_end;
                    continue;
                }
            }

            prev = word.chars().next_back();
            pos = end;
            continue;
        }

        prev = Some(c);
        pos += c.len_utf8();
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(body: &str) -> Vec<Token> {
        tokenize(body).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            kinds("1 + 2.5*3^2"),
            vec![
                Token::Number(1.0),
                Token::AddOp { minus: false },
                Token::Number(2.5),
                Token::MulOp { divide: false },
                Token::Number(3.0),
                Token::Pow,
                Token::Number(2.0),
            ]
        );
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
        assert_eq!(kinds("1e3"), vec![Token::Number(1000.0)]);
    }

    #[test]
    fn test_tokenize_comparisons() {
        let ops: Vec<Token> = kinds("1<=2>=3<>4!=5==6<7>8=9")
            .into_iter()
            .filter(|t| matches!(t, Token::CmpOp(_)))
            .collect();
        assert_eq!(
            ops,
            vec![
                Token::CmpOp(CmpOp::Le),
                Token::CmpOp(CmpOp::Ge),
                Token::CmpOp(CmpOp::Ne),
                Token::CmpOp(CmpOp::Ne),
                Token::CmpOp(CmpOp::Eq),
                Token::CmpOp(CmpOp::Lt),
                Token::CmpOp(CmpOp::Gt),
                Token::CmpOp(CmpOp::Eq),
            ]
        );
    }

    #[test]
    fn test_tokenize_words() {
        assert_eq!(
            kinds("if(true, a1, $B$2:c3) + foo"),
            vec![
                Token::Function("IF".into()),
                Token::LParen,
                Token::Boolean(true),
                Token::Comma,
                Token::Cell(CellAddress::new(0, 0)),
                Token::Comma,
                Token::CellRange(
                    CellAddress::with_absolute(1, 1, true, true),
                    CellAddress::new(2, 2)
                ),
                Token::RParen,
                Token::AddOp { minus: false },
                Token::Identifier("FOO".into()),
            ]
        );

        // A cell-shaped name followed by a paren is a function
        assert_eq!(kinds("LOG10(1)")[0], Token::Function("LOG10".into()));
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(
            kinds("\"a, b\" \"\""),
            vec![Token::String("a, b".into()), Token::String(String::new())]
        );
        assert!(tokenize("\"open").is_err());
    }

    #[test]
    fn test_tokenize_rejects_unknown_characters() {
        assert!(matches!(
            tokenize("1 & 2"),
            Err(FormulaError::UnexpectedChar { ch: '&', pos: 2 })
        ));
        assert!(tokenize("#REF!").is_err());
        assert!(tokenize("50%").is_err());
        assert!(tokenize("A1:").is_err());
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("SUM( A1 )").unwrap();
        assert_eq!(tokens[0].span, 0..3);
        assert_eq!(tokens[2].span, 5..7);
    }

    #[test]
    fn test_scan_references() {
        let text = "=SUM(A1:B2) + \"C3\" + $D$4 + LOG10(2) + #REF! + x1y";
        let refs = scan_references(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(&text[refs[0].span.clone()], "A1:B2");
        assert!(matches!(refs[0].kind, ReferenceKind::Range(_, _)));
        assert_eq!(&text[refs[1].span.clone()], "$D$4");
    }

    #[test]
    fn test_scan_references_skips_glued_words() {
        assert!(scan_references("=ABC_A1 + 2A1").is_empty());
        assert_eq!(scan_references("=a1*2").len(), 1);
    }
}
