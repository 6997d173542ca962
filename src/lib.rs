//! Newton description-language front end
//!
//! A compiler front end for a small physics-description language whose core
//! is a physical-dimension type checker. Declared base dimensions each get a
//! unique prime number; compound dimensions are encoded as the product of
//! their constituent primes, so dimensional equality is an exact integer
//! comparison (unique factorization, no floating-point exponents).
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → AST → Dimension Checker → State → Invariant Engine
//! ```
//!
//! # Example
//!
//! ```nt
//! dimensions {
//!     meter "m";
//!     second "s";
//! }
//!
//! laws {
//!     distance = meter;
//!     time = second;
//!     speed = distance / time;
//! }
//! ```

pub mod ast;
pub mod check;
pub mod common;
pub mod diagnostics;
pub mod invariants;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod units;

// Re-exports for convenience
pub use ast::Ast;
pub use check::State;
pub use diagnostics::{CompileError, Reporter, SourceFile};
pub use invariants::{Invariant, ParameterValue, Report};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse source code to AST
pub fn parse(source: &str) -> miette::Result<Ast> {
    let tokens = lexer::lex(source)?;
    parser::parse(&tokens, source)
}

/// Analyze an in-memory description: lex, parse, and dimension-check.
///
/// On semantic errors the first diagnostic is returned; callers that want
/// every diagnostic should drive [`check::check`] directly.
pub fn analyze(source: &str, name: &str) -> miette::Result<State> {
    let file = SourceFile::new(name, source);
    let tokens = lexer::lex_file(&file).map_err(miette::Report::new)?;
    tracing::debug!(tokens = tokens.len(), "lexed description");
    let ast = parser::parse_file(&tokens, &file).map_err(miette::Report::new)?;
    tracing::debug!(items = ast.items.len(), "parsed description");
    check::check(&ast, &file).map_err(|errors| {
        let count = errors.len();
        let first = errors
            .into_iter()
            .next()
            .expect("check error list is never empty");
        tracing::debug!(errors = count, "dimension check failed");
        miette::Report::new(first)
    })
}

/// Parse and check a description file, returning the populated session state.
pub fn init(path: impl AsRef<std::path::Path>) -> miette::Result<State> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
    analyze(&source, &path.to_string_lossy())
}
