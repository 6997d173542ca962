//! Diagnostic reporting with source locations
//!
//! This module provides rich error messages with source locations using miette.

use crate::common::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Source file for error reporting
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: Arc<str>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
        }
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.to_string())
    }
}

/// Convert our Span to miette's SourceSpan
impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

/// Compiler diagnostic
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CompileError {
    // === Lex/Parse Errors ===
    #[error("Unrecognized character sequence")]
    #[diagnostic(code(lex::unknown_token))]
    UnknownToken {
        #[label("cannot tokenize this")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unexpected token: expected {expected}, found {found}")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unexpected end of file")]
    #[diagnostic(code(parse::unexpected_eof))]
    UnexpectedEof {
        #[label("expected more tokens")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Table Errors ===
    #[error("Undeclared identifier `{name}`")]
    #[diagnostic(
        code(dimension::undeclared),
        help("declare it in a `dimensions`, `vectors`, or `laws` block before use")
    )]
    UndeclaredIdentifier {
        name: String,
        #[label("not found in this scope or any enclosing scope")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Duplicate declaration of dimension `{name}`")]
    #[diagnostic(code(dimension::redeclared))]
    RedeclarationConflict {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
        #[label("first declared here")]
        first_span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Prime table exhausted: more than {capacity} base dimensions declared")]
    #[diagnostic(
        code(dimension::prime_table_exhausted),
        help("the dimension encoding supports a fixed number of base dimensions per session")
    )]
    PrimeTableExhausted {
        capacity: usize,
        #[label("this declaration exceeds the capacity")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Dimension product overflow: the compound dimension is too large to encode")]
    #[diagnostic(
        code(dimension::product_overflow),
        help("the prime-product encoding holds compound dimensions up to 64 bits per side")
    )]
    DimensionProductOverflow {
        #[label("this expression's dimension exceeds the encoding range")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Dimension Errors ===
    #[error(
        "Dimension mismatch: expected {expected_num}/{expected_den}, found {found_num}/{found_den}"
    )]
    #[diagnostic(
        code(dimension::mismatch),
        help("addition, subtraction, and comparison require identical dimensions")
    )]
    DimensionMismatch {
        /// Prime-product signature the left operand carries
        expected_num: u64,
        expected_den: u64,
        /// Prime-product signature of the offending operand
        found_num: u64,
        found_den: u64,
        #[label("operand with incompatible dimension")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Vector arity violation: {reason}")]
    #[diagnostic(
        code(dimension::vector_arity),
        help("vectors combine only through `dot` or `cross`; those take exactly two vectors")
    )]
    VectorArityViolation {
        reason: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error(
        "Integral chain inconsistency: `{name}` has net time exponent {found}, expected {expected}"
    )]
    #[diagnostic(
        code(dimension::integral_chain),
        help("each step of a derivative chain must lower the net time exponent by exactly one")
    )]
    IntegralChainInconsistency {
        name: String,
        expected: i32,
        found: i32,
        #[label("chain member with wrong time exponent")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Invariant Errors ===
    #[error("No invariant matches the given parameter tuple")]
    #[diagnostic(
        code(invariant::no_match),
        help("the parameter count and dimension signature must match a declared invariant")
    )]
    NoMatchingInvariant {
        #[label("no invariant with this parameter signature")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

/// Error reporter that collects diagnostics
pub struct Reporter {
    source: SourceFile,
    errors: Vec<CompileError>,
}

impl Reporter {
    pub fn new(source: SourceFile) -> Self {
        Self {
            source,
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Create NamedSource for this file
    pub fn named_source(&self) -> NamedSource<String> {
        self.source.to_named_source()
    }

    /// Get the source file
    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Print all diagnostics
    pub fn emit_all(&self) {
        for error in &self.errors {
            eprintln!("{:?}", miette::Report::new(error.clone()));
        }
    }

    /// Consume and return errors
    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }

    /// Get errors by reference
    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}
