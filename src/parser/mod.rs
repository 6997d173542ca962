//! Parser for the Newton description language
//!
//! A recursive descent parser that produces an AST from a token stream.

use crate::ast::*;
use crate::common::{IdGenerator, NodeId, Span};
use crate::diagnostics::{CompileError, SourceFile};
use crate::lexer::{Token, TokenKind};
use miette::NamedSource;

/// Parse a token stream into an AST
pub fn parse(tokens: &[Token], source: &str) -> miette::Result<Ast> {
    let file = SourceFile::new("<input>", source);
    parse_file(tokens, &file).map_err(Into::into)
}

/// Parse a token stream, attributing errors to `source`'s file name
pub fn parse_file(tokens: &[Token], source: &SourceFile) -> Result<Ast, CompileError> {
    let mut parser = Parser::new(tokens, source);
    parser.parse_program()
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    id_gen: IdGenerator,
    src: NamedSource<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], source: &SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            id_gen: IdGenerator::new(),
            src: source.to_named_source(),
        }
    }

    fn next_id(&mut self) -> NodeId {
        self.id_gen.next()
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> &Token {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, CompileError> {
        if self.at(kind) {
            Ok(self.advance())
        } else if self.at(TokenKind::Eof) {
            Err(CompileError::UnexpectedEof {
                span: self.span().into(),
                src: self.src.clone(),
            })
        } else {
            Err(CompileError::UnexpectedToken {
                expected: kind.to_string(),
                found: self.peek().to_string(),
                span: self.span().into(),
                src: self.src.clone(),
            })
        }
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().to_string(),
            span: self.span().into(),
            src: self.src.clone(),
        }
    }

    // ==================== PROGRAM ====================

    fn parse_program(&mut self) -> Result<Ast, CompileError> {
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            items.push(self.parse_item()?);
        }
        Ok(Ast { items })
    }

    fn parse_item(&mut self) -> Result<Item, CompileError> {
        match self.peek() {
            TokenKind::Dimensions => self.parse_dimension_block().map(Item::Dimensions),
            TokenKind::Vectors => self.parse_vector_block().map(Item::Vectors),
            TokenKind::Integrals => self.parse_integral_block().map(Item::Integrals),
            TokenKind::Laws => self.parse_law_block().map(Item::Laws),
            TokenKind::Constant => self.parse_constant().map(Item::Constant),
            TokenKind::Invariant => self.parse_invariant().map(Item::Invariant),
            _ => Err(self.unexpected(
                "`dimensions`, `vectors`, `integrals`, `laws`, `constant`, or `invariant`",
            )),
        }
    }

    fn parse_ident(&mut self) -> Result<(String, Span), CompileError> {
        let tok = self.expect(TokenKind::Ident)?;
        Ok((tok.text.clone(), tok.span))
    }

    fn parse_string(&mut self) -> Result<String, CompileError> {
        let tok = self.expect(TokenKind::StringLit)?;
        // The lexed text keeps its surrounding quotes and escapes.
        let body = &tok.text[1..tok.text.len() - 1];
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(escaped) => out.push(escaped),
                None => {}
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> Result<(f64, Span), CompileError> {
        let (text, span) = match self.peek() {
            TokenKind::IntLit | TokenKind::FloatLit => {
                let tok = self.advance();
                (tok.text.clone(), tok.span)
            }
            _ => return Err(self.unexpected("a numeric literal")),
        };
        let value = text
            .replace('_', "")
            .parse::<f64>()
            .map_err(|_| CompileError::UnexpectedToken {
                expected: "a numeric literal".to_string(),
                found: text.clone(),
                span: span.into(),
                src: self.src.clone(),
            })?;
        Ok((value, span))
    }

    // ==================== DIMENSIONS ====================

    fn parse_dimension_block(&mut self) -> Result<DimensionBlock, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Dimensions)?;
        self.expect(TokenKind::LBrace)?;

        let mut entries = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (name, name_span) = self.parse_ident()?;
            let abbreviation = self.parse_string()?;
            let end = self.span();
            self.expect(TokenKind::Semi)?;
            entries.push(DimensionDecl {
                id: self.next_id(),
                name,
                abbreviation,
                span: name_span.merge(end),
            });
        }

        let end = self.span();
        self.expect(TokenKind::RBrace)?;
        Ok(DimensionBlock {
            id: self.next_id(),
            entries,
            span: start.merge(end),
        })
    }

    // ==================== VECTORS ====================

    fn parse_vector_block(&mut self) -> Result<VectorBlock, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Vectors)?;
        self.expect(TokenKind::LBrace)?;

        let mut pairs = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (vector, vspan) = self.parse_ident()?;
            self.expect(TokenKind::Arrow)?;
            let (scalar, sspan) = self.parse_ident()?;
            self.expect(TokenKind::Semi)?;
            pairs.push(VectorPairDecl {
                id: self.next_id(),
                vector,
                scalar,
                span: vspan.merge(sspan),
            });
        }

        let end = self.span();
        self.expect(TokenKind::RBrace)?;
        Ok(VectorBlock {
            id: self.next_id(),
            pairs,
            span: start.merge(end),
        })
    }

    // ==================== INTEGRALS ====================

    fn parse_integral_block(&mut self) -> Result<IntegralBlock, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Integrals)?;

        let kind = match self.peek() {
            TokenKind::Vector => {
                self.advance();
                ChainKind::Vector
            }
            TokenKind::Scalar => {
                self.advance();
                ChainKind::Scalar
            }
            _ => return Err(self.unexpected("`vector` or `scalar`")),
        };

        self.expect(TokenKind::LBrace)?;
        let mut chains = Vec::new();
        while !self.at(TokenKind::RBrace) {
            chains.push(self.parse_chain()?);
        }
        let end = self.span();
        self.expect(TokenKind::RBrace)?;

        Ok(IntegralBlock {
            id: self.next_id(),
            kind,
            chains,
            span: start.merge(end),
        })
    }

    fn parse_chain(&mut self) -> Result<IntegralChain, CompileError> {
        let (first, first_span) = self.parse_ident()?;
        let mut members = vec![ChainMember {
            name: first,
            span: first_span,
        }];

        while self.at(TokenKind::Arrow) {
            self.advance();
            let (name, span) = self.parse_ident()?;
            members.push(ChainMember { name, span });
        }
        let end = self.span();
        self.expect(TokenKind::Semi)?;

        Ok(IntegralChain {
            id: self.next_id(),
            members,
            span: first_span.merge(end),
        })
    }

    // ==================== LAWS ====================

    fn parse_law_block(&mut self) -> Result<LawBlock, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Laws)?;
        self.expect(TokenKind::LBrace)?;

        let mut laws = Vec::new();
        while !self.at(TokenKind::RBrace) {
            laws.push(self.parse_law()?);
        }

        let end = self.span();
        self.expect(TokenKind::RBrace)?;
        Ok(LawBlock {
            id: self.next_id(),
            laws,
            span: start.merge(end),
        })
    }

    fn parse_law(&mut self) -> Result<Law, CompileError> {
        let (name, name_span) = self.parse_ident()?;
        self.expect(TokenKind::Eq)?;
        let rhs = self.parse_expression()?;

        let alias = if self.at(TokenKind::As) {
            self.advance();
            Some(self.parse_string()?)
        } else {
            None
        };

        let end = self.span();
        self.expect(TokenKind::Semi)?;
        Ok(Law {
            id: self.next_id(),
            name,
            name_span,
            rhs,
            alias,
            span: name_span.merge(end),
        })
    }

    // ==================== CONSTANTS ====================

    fn parse_constant(&mut self) -> Result<ConstantDecl, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Constant)?;
        let (name, _) = self.parse_ident()?;
        self.expect(TokenKind::Colon)?;
        let dimension = self.parse_expression()?;
        self.expect(TokenKind::Eq)?;
        let (value, _) = self.parse_number()?;
        let end = self.span();
        self.expect(TokenKind::Semi)?;

        Ok(ConstantDecl {
            id: self.next_id(),
            name,
            dimension,
            value,
            span: start.merge(end),
        })
    }

    // ==================== INVARIANTS ====================

    fn parse_invariant(&mut self) -> Result<InvariantDecl, CompileError> {
        let start = self.span();
        self.expect(TokenKind::Invariant)?;
        let (name, _) = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            let (pname, pspan) = self.parse_ident()?;
            self.expect(TokenKind::Colon)?;
            let (physics, tspan) = self.parse_ident()?;
            params.push(InvariantParam {
                id: self.next_id(),
                name: pname,
                physics,
                span: pspan.merge(tspan),
            });
            if !self.at(TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RParen)?;

        self.expect(TokenKind::LBrace)?;
        let mut constraints = Vec::new();
        while !self.at(TokenKind::RBrace) {
            constraints.push(self.parse_constraint()?);
        }
        let end = self.span();
        self.expect(TokenKind::RBrace)?;

        Ok(InvariantDecl {
            id: self.next_id(),
            name,
            params,
            constraints,
            span: start.merge(end),
        })
    }

    fn parse_constraint(&mut self) -> Result<Constraint, CompileError> {
        let lhs = self.parse_expression()?;
        let start = lhs.span();

        let kind = if self.at(TokenKind::In) {
            self.advance();
            let (lo, _) = self.parse_number()?;
            self.expect(TokenKind::DotDot)?;
            let (hi, _) = self.parse_number()?;
            ConstraintKind::Range { lo, hi }
        } else {
            let op = match self.peek() {
                TokenKind::EqEq => CompareOp::Eq,
                TokenKind::Ne => CompareOp::Ne,
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                TokenKind::Tilde => CompareOp::Approx,
                _ => return Err(self.unexpected("a comparison operator or `in`")),
            };
            self.advance();
            let rhs = self.parse_expression()?;
            let tolerance = if self.at(TokenKind::Tolerance) {
                self.advance();
                Some(self.parse_number()?.0)
            } else {
                None
            };
            ConstraintKind::Compare { op, rhs, tolerance }
        };

        let end = self.span();
        self.expect(TokenKind::Semi)?;
        Ok(Constraint {
            id: self.next_id(),
            lhs,
            kind,
            span: start.merge(end),
        })
    }

    // ==================== EXPRESSIONS ====================

    /// `Expression := Term (('+' | '-') Term)*`
    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_term()?;

        loop {
            let op = match self.peek() {
                TokenKind::Plus => LowOp::Add,
                TokenKind::Minus => LowOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Low {
                id: self.next_id(),
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    /// `Term := ['-'] Factor (('*' | '/') Factor)*`
    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let neg_span = if self.at(TokenKind::Minus) {
            let span = self.span();
            self.advance();
            Some(span)
        } else {
            None
        };

        let mut lhs = self.parse_factor()?;

        loop {
            let op = match self.peek() {
                TokenKind::Star => HighOp::Mul,
                TokenKind::Slash => HighOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::High {
                id: self.next_id(),
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        if let Some(span) = neg_span {
            let span = span.merge(lhs.span());
            lhs = Expr::Neg {
                id: self.next_id(),
                operand: Box::new(lhs),
                span,
            };
        }

        Ok(lhs)
    }

    /// `Factor := identifier | number | dot(E, E) | cross(E, E) | '(' E ')'`
    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        match self.peek() {
            TokenKind::Ident => {
                let tok = self.advance();
                let name = tok.text.clone();
                let span = tok.span;
                Ok(Expr::Ident {
                    id: self.next_id(),
                    name,
                    span,
                })
            }
            TokenKind::IntLit | TokenKind::FloatLit => {
                let (value, span) = self.parse_number()?;
                Ok(Expr::Number {
                    id: self.next_id(),
                    value,
                    span,
                })
            }
            TokenKind::Dot | TokenKind::Cross => {
                let op = if self.at(TokenKind::Dot) {
                    VecOp::Dot
                } else {
                    VecOp::Cross
                };
                let start = self.span();
                self.advance();
                self.expect(TokenKind::LParen)?;
                let lhs = self.parse_expression()?;
                self.expect(TokenKind::Comma)?;
                let rhs = self.parse_expression()?;
                let end = self.span();
                self.expect(TokenKind::RParen)?;
                Ok(Expr::VectorOp {
                    id: self.next_id(),
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span: start.merge(end),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an identifier, number, `dot`, `cross`, or `(`")),
        }
    }
}
