//! Newton compiler CLI
//!
//! Main entry point for the `ntc` command.

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ntc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "The Newton physical-dimension description compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dimension-check a description file
    Check {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the parsed AST as JSON
        #[arg(long)]
        show_ast: bool,

        /// Show the dimension and physics tables
        #[arg(long)]
        show_tables: bool,
    },

    /// Check concrete parameter values against the declared invariants
    Verify {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Parameter bindings, `physicsName=value`, in tuple order
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },

    /// Show information about the compiler
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Check {
            input,
            show_ast,
            show_tables,
        } => check(&input, show_ast, show_tables),
        Commands::Verify { input, params } => verify(&input, &params),
        Commands::Info => info(),
    }
}

fn load(input: &std::path::Path) -> Result<(newton::SourceFile, newton::Ast)> {
    let source = std::fs::read_to_string(input)
        .map_err(|e| miette::miette!("Failed to read input file: {}", e))?;
    let file = newton::SourceFile::new(input.to_string_lossy().to_string(), source.clone());
    let tokens = newton::lexer::lex_file(&file).map_err(miette::Report::new)?;
    tracing::debug!("Lexed {} tokens", tokens.len());
    let ast = newton::parser::parse_file(&tokens, &file).map_err(miette::Report::new)?;
    tracing::debug!("Parsed {} items", ast.items.len());
    Ok((file, ast))
}

fn check(input: &std::path::Path, show_ast: bool, show_tables: bool) -> Result<()> {
    tracing::info!("Checking {:?}", input);
    let (file, ast) = load(input)?;

    if show_ast {
        println!("=== AST ===");
        let json = serde_json::to_string_pretty(&ast)
            .map_err(|e| miette::miette!("Failed to serialize AST: {}", e))?;
        println!("{}", json);
        println!();
    }

    let state = match newton::check::check(&ast, &file) {
        Ok(state) => state,
        Err(errors) => {
            for e in &errors {
                eprintln!("{:?}", miette::Report::new(e.clone()));
            }
            return Err(miette::miette!("{} dimension errors found", errors.len()));
        }
    };

    if show_tables {
        println!("=== Dimensions ===");
        for (_, dim) in state.dimensions.iter() {
            println!("  {} ({}) prime {}", dim.identifier, dim.abbreviation, dim.prime);
        }
        println!();
        println!("=== Physics ===");
        for (_, p) in state.physics.iter() {
            let vector = if p.is_vector { " vector" } else { "" };
            println!(
                "  {}#{}{} {}/{}",
                p.identifier,
                p.subindex,
                vector,
                p.numerator_prime_product,
                p.denominator_prime_product
            );
        }
        println!();
    }

    println!(
        "All checks passed: {} ({} dimensions, {} quantities, {} invariants)",
        input.display(),
        state.dimensions.len(),
        state.physics.len(),
        state.invariants().len()
    );
    Ok(())
}

fn verify(input: &std::path::Path, params: &[String]) -> Result<()> {
    tracing::info!("Verifying invariants in {:?}", input);
    let state = newton::init(input)?;

    let mut tuple = Vec::new();
    for binding in params {
        let (name, value) = binding
            .split_once('=')
            .ok_or_else(|| miette::miette!("Invalid parameter binding `{}`", binding))?;
        let value: f64 = value
            .parse()
            .map_err(|e| miette::miette!("Invalid value in `{}`: {}", binding, e))?;
        let param = state
            .bind_parameter(name.trim(), value)
            .ok_or_else(|| miette::miette!("Unknown physics quantity `{}`", name))?;
        tuple.push(param);
    }
    state.number_parameters_zero_to_n(&mut tuple);

    let report = state.satisfies_constraints(&tuple).map_err(miette::Report::new)?;
    for inv in &report.invariants {
        let verdict = if inv.satisfied() { "satisfied" } else { "VIOLATED" };
        println!("invariant {}: {}", inv.invariant, verdict);
        for (index, c) in inv.constraints.iter().enumerate() {
            if let Some(err) = &c.dimension_error {
                println!("  constraint {}: dimension: {}", index, err);
            }
            if let Some(err) = &c.value_error {
                println!("  constraint {}: value: {}", index, err);
            }
            if c.satisfied() {
                println!("  constraint {}: ok", index);
            }
        }
    }

    if report.satisfied() {
        Ok(())
    } else {
        Err(miette::miette!("invariant constraints violated"))
    }
}

fn info() -> Result<()> {
    println!("Newton description compiler");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Features:");
    println!("  - Prime-product dimension encoding");
    println!("  - Law dimension inference and checking");
    println!("  - Derivative/integral chain validation");
    println!("  - Invariant constraint reporting");
    Ok(())
}
