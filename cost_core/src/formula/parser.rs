//! Recursive-descent parser from tokens to [`Expr`].
//!
//! Precedence, loosest first:
//!
//! ```text
//! conditional   a ? b : c          (right associative)
//! or            a || b
//! and           a && b
//! equality      == != === !==
//! relational    < <= > >=
//! additive      + -
//! multiplicative * / %
//! unary         - + !
//! primary       number, identifier, call, Math.x, ( expr ), (() => body)()
//! ```
//!
//! Both parser recursion and the depth of the resulting tree are capped at
//! [`MAX_DEPTH`], so evaluation recursion is bounded as well.

use super::ast::{BinaryOp, Builtin, Expr, UnaryOp};
use super::lexer::{Spanned, Token};
use super::FormulaError;

/// Deepest nesting accepted, counted both as parser recursion and as
/// expression-tree depth.
pub const MAX_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// `tokens` normally comes from the lexer; a missing trailing
    /// [`Token::Eof`] is added.
    pub fn new(mut tokens: Vec<Spanned>) -> Self {
        if tokens.last().map(|t| &t.token) != Some(&Token::Eof) {
            let position = tokens.last().map_or(0, |t| t.position);
            tokens.push(Spanned { token: Token::Eof, position });
        }
        Parser { tokens, pos: 0, depth: 0 }
    }

    /// Parse a whole formula: a bare expression, a statement body
    /// (`const x = …; return …;`), a braced block, or an arrow IIFE.
    pub fn parse_program(mut self) -> Result<Expr, FormulaError> {
        let expr = if self.at_keyword("const") || self.at_keyword("let") || self.at_keyword("var") || self.at_keyword("return") {
            self.parse_statements(&Token::Eof)?
        } else if self.peek() == &Token::LBrace {
            self.advance();
            let body = self.parse_statements(&Token::RBrace)?;
            self.expect(Token::RBrace)?;
            body
        } else {
            self.parse_expression()?
        };

        while self.peek() == &Token::Semicolon {
            self.advance();
        }
        if self.peek() != &Token::Eof {
            return Err(self.unexpected("end of formula"));
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.describe()))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    /// Run `parse` one nesting level deeper.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr, FormulaError>) -> Result<Expr, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::syntax(self.position(), "formula nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Reject a freshly built node whose tree is deeper than [`MAX_DEPTH`].
    fn bounded(&self, expr: Expr, position: usize) -> Result<Expr, FormulaError> {
        if expr.depth() > MAX_DEPTH {
            return Err(FormulaError::syntax(position, "formula nested too deeply"));
        }
        Ok(expr)
    }

    fn unexpected(&self, wanted: &str) -> FormulaError {
        FormulaError::syntax(
            self.position(),
            format!("expected {}, found {}", wanted, self.peek().describe()),
        )
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// `(const|let|var) name = expr;`* then `return expr;`, stopping before `end`.
    fn parse_statements(&mut self, end: &Token) -> Result<Expr, FormulaError> {
        let mut bindings: Vec<(String, Expr)> = Vec::new();
        let start = self.position();

        loop {
            if self.at_keyword("return") {
                self.advance();
                let result = self.parse_expression()?;
                while self.peek() == &Token::Semicolon {
                    self.advance();
                }
                if self.peek() != end {
                    return Err(self.unexpected(&format!("{} after return", end.describe())));
                }
                if bindings.is_empty() {
                    return Ok(result);
                }
                return self.bounded(Expr::Block { bindings, result: Box::new(result) }, start);
            }

            if self.at_keyword("const") || self.at_keyword("let") || self.at_keyword("var") {
                self.advance();
                let position = self.position();
                let name = match self.advance() {
                    Token::Ident(name) if !is_reserved(&name) && name != "PI" => name,
                    other => {
                        return Err(FormulaError::syntax(
                            position,
                            format!("expected binding name, found {}", other.describe()),
                        ))
                    }
                };
                if bindings.iter().any(|(existing, _)| existing == &name) {
                    return Err(FormulaError::syntax(position, format!("'{}' is already declared", name)));
                }
                self.expect(Token::Assign)?;
                let value = self.parse_expression()?;
                while self.peek() == &Token::Semicolon {
                    self.advance();
                }
                bindings.push((name, value));
                continue;
            }

            return Err(self.unexpected("'const', 'let' or 'return'"));
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, FormulaError> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, FormulaError> {
        let position = self.position();
        let condition = self.parse_binary(0)?;
        if self.peek() != &Token::Question {
            return Ok(condition);
        }
        self.advance();
        let then_branch = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let else_branch = self.parse_expression()?;
        let expr = Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        };
        self.bounded(expr, position)
    }

    /// Precedence climbing over the left-associative binary levels.
    fn parse_binary(&mut self, level: usize) -> Result<Expr, FormulaError> {
        if level == LEVELS {
            return self.parse_unary();
        }
        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(op) = binary_op(self.peek(), level) {
            let position = self.position();
            self.advance();
            let rhs = self.parse_binary(level + 1)?;
            lhs = self.bounded(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, position)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        let position = self.position();
        let op = match self.peek() {
            Token::Minus => Some(UnaryOp::Neg),
            Token::Bang => Some(UnaryOp::Not),
            Token::Plus => None,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        match op {
            Some(op) => self.bounded(Expr::Unary { op, operand: Box::new(operand) }, position),
            None => Ok(operand),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let position = self.position();
        match self.peek().clone() {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number { value })
            }
            Token::LParen if self.at_iife() => self.parse_iife(),
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if name == "Math" => {
                self.advance();
                self.expect(Token::Dot)?;
                let member_position = self.position();
                match self.advance() {
                    Token::Ident(member) if member == "PI" => Ok(Expr::Pi),
                    Token::Ident(member) => self.parse_call(&member, member_position),
                    other => Err(FormulaError::syntax(
                        member_position,
                        format!("expected Math member, found {}", other.describe()),
                    )),
                }
            }
            Token::Ident(name) if name == "PI" => {
                self.advance();
                Ok(Expr::Pi)
            }
            Token::Ident(name) if is_reserved(&name) => {
                Err(FormulaError::syntax(position, format!("'{}' is not allowed here", name)))
            }
            Token::Ident(name) => {
                self.advance();
                if self.peek() == &Token::LParen {
                    self.parse_call(&name, position)
                } else {
                    Ok(Expr::Variable { name })
                }
            }
            _ => Err(self.unexpected("a number, name or '('")),
        }
    }

    /// `name(args…)` where `name` must be a built-in.
    fn parse_call(&mut self, name: &str, position: usize) -> Result<Expr, FormulaError> {
        let function = Builtin::from_name(name).ok_or_else(|| FormulaError::UnknownFunction {
            name: name.to_string(),
        })?;
        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_expression()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        function.check_arity(args.len()).map_err(|expected| FormulaError::Arity {
            function: function.name().to_string(),
            expected: expected.to_string(),
            found: args.len(),
            position,
        })?;

        self.bounded(Expr::Call { function, args }, position)
    }

    /// Lookahead for `( ( ) =>`.
    fn at_iife(&self) -> bool {
        self.peek_at(0) == &Token::LParen
            && self.peek_at(1) == &Token::LParen
            && self.peek_at(2) == &Token::RParen
            && self.peek_at(3) == &Token::Arrow
    }

    /// `(() => { statements })()` or `(() => expr)()`.
    fn parse_iife(&mut self) -> Result<Expr, FormulaError> {
        for _ in 0..4 {
            self.advance();
        }

        let body = if self.peek() == &Token::LBrace {
            self.advance();
            let body = self.parse_statements(&Token::RBrace)?;
            self.expect(Token::RBrace)?;
            body
        } else {
            self.parse_expression()?
        };

        self.expect(Token::RParen)?;
        if self.peek() != &Token::LParen {
            return Err(self.unexpected("'()' invoking the arrow function"));
        }
        self.advance();
        self.expect(Token::RParen)?;
        Ok(body)
    }
}

/// Number of left-associative binary precedence levels.
const LEVELS: usize = 6;

/// Binary operator for `token` at precedence `level` (0 = loosest).
fn binary_op(token: &Token, level: usize) -> Option<BinaryOp> {
    let op = match (level, token) {
        (0, Token::OrOr) => BinaryOp::Or,
        (1, Token::AndAnd) => BinaryOp::And,
        (2, Token::EqEq) => BinaryOp::Eq,
        (2, Token::NotEq) => BinaryOp::Ne,
        (3, Token::Lt) => BinaryOp::Lt,
        (3, Token::Le) => BinaryOp::Le,
        (3, Token::Gt) => BinaryOp::Gt,
        (3, Token::Ge) => BinaryOp::Ge,
        (4, Token::Plus) => BinaryOp::Add,
        (4, Token::Minus) => BinaryOp::Sub,
        (5, Token::Star) => BinaryOp::Mul,
        (5, Token::Slash) => BinaryOp::Div,
        (5, Token::Percent) => BinaryOp::Rem,
        _ => return None,
    };
    Some(op)
}

/// Words that cannot be used as names: statement keywords and anything
/// that would reach outside the variable map.
fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "const" | "let" | "var" | "return" | "function" | "new" | "this" | "for" | "while" | "do" | "if" | "else"
            | "import" | "eval" | "Math"
    )
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse(src: &str) -> Result<Expr, FormulaError> {
        Parser::new(tokenize(src)?).parse_program()
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_iife_becomes_block() {
        let expr = parse("(() => { const a = 1; const b = a + 1; return b; })()").unwrap();
        match expr {
            Expr::Block { bindings, .. } => {
                assert_eq!(bindings.len(), 2);
                assert_eq!(bindings[0].0, "a");
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_statement_body_without_braces() {
        assert!(matches!(parse("const a = 2\nreturn a * 3").unwrap(), Expr::Block { .. }));
        assert!(matches!(parse("{ return 4; }").unwrap(), Expr::Number { .. }));
    }

    #[test]
    fn test_math_members() {
        assert!(matches!(parse("Math.PI").unwrap(), Expr::Pi));
        assert!(matches!(
            parse("Math.ceil(2.1)").unwrap(),
            Expr::Call { function: Builtin::Ceil, .. }
        ));
    }

    #[test]
    fn test_uninvoked_arrow_rejected() {
        assert!(matches!(parse("(() => 1)"), Err(FormulaError::Syntax { .. })));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(
            parse("Math.random()").unwrap_err(),
            FormulaError::UnknownFunction { name: "random".to_string() }
        );
        assert!(matches!(parse("pow(2)"), Err(FormulaError::Arity { found: 1, .. })));
    }

    #[test]
    fn test_rejects_statements_and_escapes() {
        assert!(parse("while (1) { }").is_err());
        assert!(parse("new Function('x')").is_err());
        assert!(parse("L = 3").is_err());
        assert!(parse("this.constructor").is_err());
        assert!(parse("const a = 1; const a = 2; return a;").is_err());
        assert!(parse("const a = 1;").is_err());
    }

    #[test]
    fn test_bare_pi_is_constant() {
        assert!(matches!(parse("PI").unwrap(), Expr::Pi));
        assert!(matches!(parse("const PI = 3; return PI;"), Err(FormulaError::Syntax { .. })));
    }

    #[test]
    fn test_deep_parentheses_rejected() {
        let src = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));
        let err = parse(&src).unwrap_err();
        assert!(matches!(err, FormulaError::Syntax { ref message, .. } if message.contains("too deeply")));

        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(matches!(parse(&shallow).unwrap(), Expr::Number { .. }));
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        let long = vec!["1"; 20000].join("+");
        assert!(matches!(parse(&long), Err(FormulaError::Syntax { .. })));

        let unary = format!("{}1", "-".repeat(5000));
        assert!(matches!(parse(&unary), Err(FormulaError::Syntax { .. })));

        let short = vec!["1"; MAX_DEPTH].join("+");
        assert!(parse(&short).unwrap().depth() <= MAX_DEPTH);
    }

    #[test]
    fn test_empty_token_stream() {
        let err = Parser::new(Vec::new()).parse_program().unwrap_err();
        assert!(matches!(err, FormulaError::Syntax { position: 0, .. }));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse("1 + 2 3").unwrap_err();
        assert!(matches!(err, FormulaError::Syntax { position: 6, .. }));
    }
}
