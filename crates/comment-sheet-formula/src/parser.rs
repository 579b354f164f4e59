//! Formula parser
//!
//! A recursive descent parser over the token stream produced by
//! [`tokenize`](crate::lexer::tokenize).
//!
//! Precedence (lowest to highest):
//! 1. Comparison: `=`, `==`, `<>`, `!=`, `<`, `<=`, `>`, `>=`
//! 2. Addition/Subtraction: `+`, `-`
//! 3. Multiplication/Division: `*`, `/`
//! 4. Exponentiation: `^` (right associative)
//! 5. Atoms: literals, references, calls, parentheses and unary `+`/`-`

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, CmpOp, SpannedToken, Token};
use comment_sheet_core::CellRange;

/// Default limit on nested parentheses, calls, unary signs and `^` chains
pub const DEFAULT_MAX_NESTING: usize = 64;

/// Parse a formula string into an AST
///
/// The leading `=` is required.
///
/// # Example
/// ```rust
/// use comment_sheet_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// assert!(parse_formula("1+2").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    parse_formula_with_nesting(formula, DEFAULT_MAX_NESTING)
}

/// Parse a formula string, failing once nesting exceeds `max_nesting`
pub fn parse_formula_with_nesting(
    formula: &str,
    max_nesting: usize,
) -> FormulaResult<FormulaExpr> {
    let body = formula
        .trim_start()
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;
    parse_body_with_nesting(body, max_nesting)
}

/// Parse a formula body (the text after the leading `=`)
pub fn parse_body(body: &str) -> FormulaResult<FormulaExpr> {
    parse_body_with_nesting(body, DEFAULT_MAX_NESTING)
}

fn parse_body_with_nesting(body: &str, max_nesting: usize) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(body)?;
    let mut parser = FormulaParser::new(tokens, max_nesting);

    if parser.is_at_end() {
        return Err(FormulaError::Parse("Empty formula".into()));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(tok) = parser.peek() {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} at position {}",
            tok.token, tok.span.start
        )));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
    max_nesting: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<SpannedToken>, max_nesting: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_nesting: max_nesting.max(1),
        }
    }

    // === Helper methods ===

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn current_token(&self) -> Option<&Token> {
        self.peek().map(|t| &t.token)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> FormulaResult<T>,
    ) -> FormulaResult<T> {
        if self.depth >= self.max_nesting {
            return Err(FormulaError::Parse(format!(
                "Formula nested deeper than {} levels",
                self.max_nesting
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.nested(Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while let Some(Token::CmpOp(cmp)) = self.current_token() {
            let op = match cmp {
                CmpOp::Eq => BinaryOperator::Equal,
                CmpOp::Ne => BinaryOperator::NotEqual,
                CmpOp::Lt => BinaryOperator::LessThan,
                CmpOp::Le => BinaryOperator::LessEqual,
                CmpOp::Gt => BinaryOperator::GreaterThan,
                CmpOp::Ge => BinaryOperator::GreaterEqual,
            };

            self.consume();
            let right = self.parse_additive()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        while let Some(Token::AddOp { minus }) = self.current_token() {
            let op = if *minus {
                BinaryOperator::Subtract
            } else {
                BinaryOperator::Add
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_power()?;

        while let Some(Token::MulOp { divide }) = self.current_token() {
            let op = if *divide {
                BinaryOperator::Divide
            } else {
                BinaryOperator::Multiply
            };

            self.consume();
            let right = self.parse_power()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_atom()?;

        if matches!(self.current_token(), Some(Token::Pow)) {
            self.consume();
            let right = self.nested(Self::parse_power)?; // Right associative
            return Ok(FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_atom(&mut self) -> FormulaResult<FormulaExpr> {
        let token = self
            .consume()
            .ok_or_else(|| FormulaError::Parse("Unexpected end of formula".into()))?;

        match token {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::Error(e) => Ok(FormulaExpr::Error(e)),
            Token::Cell(addr) => Ok(FormulaExpr::CellRef(addr)),
            Token::CellRange(start, end) => Ok(FormulaExpr::RangeRef(CellRange::new(start, end))),

            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }

            Token::AddOp { minus } => {
                let operand = self.nested(Self::parse_atom)?;
                Ok(FormulaExpr::UnaryOp {
                    op: if minus {
                        UnaryOperator::Negate
                    } else {
                        UnaryOperator::Plus
                    },
                    operand: Box::new(operand),
                })
            }

            Token::Function(name) => self.parse_function_call(name),

            Token::Identifier(name) => Ok(FormulaExpr::Name(name)),

            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Some(Token::RParen)) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Some(Token::Comma)) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RParen)?;

        Ok(FormulaExpr::Function { name, args })
    }
}
