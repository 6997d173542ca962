//! Lexer for the Newton description language
//!
//! Tokenization is generated by logos; this module wraps it to produce a
//! `Vec<Token>` terminated by an EOF token, with spans for diagnostics.

pub mod tokens;

use crate::common::Span;
use crate::diagnostics::{CompileError, SourceFile};
use logos::Logos;
use miette::Result;
pub use tokens::{Token, TokenKind};

/// Tokenize `source`, returning the token stream or a lex error.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    lex_file(&SourceFile::new("<input>", source)).map_err(miette::Report::new)
}

/// Tokenize a source file, attributing errors to its file name.
pub fn lex_file(source: &SourceFile) -> Result<Vec<Token>, CompileError> {
    let content = source.content.as_ref();
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(content);

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span,
                text: lexer.slice().to_string(),
            }),
            Err(()) => {
                return Err(CompileError::UnknownToken {
                    span: span.into(),
                    src: source.to_named_source(),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(content.len(), content.len()),
        text: String::new(),
    });

    Ok(tokens)
}
