//! Command-line interface for clade-solver.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **build**: Infer clades from calls and coverage, optionally merging into a saved tree
//! - **merge**: Merge one saved tree into another
//! - **export**: Render a saved tree as DOT, graph JSON, closure rows or an outline
//!
//! ## Usage
//!
//! ```text
//! # Build a tree from a calls table and per-kit BED files
//! clade-solver build --variants variants.tsv --calls calls.tsv \
//!     --coverage K1.bed --coverage K2.bed -o tree.json
//!
//! # Add new VCFs to an existing tree, with a JSON run summary
//! clade-solver build --tree tree.json --vcf K3.vcf.gz --coverage K3.bed -o tree.json --format json
//!
//! # Render for Graphviz
//! clade-solver export tree.json --as dot | dot -Tsvg > tree.svg
//! ```

use clap::{Parser, Subcommand};

pub mod build;
pub mod export;
pub mod merge;

#[derive(Parser)]
#[command(name = "clade-solver")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Infer and merge clade trees from sparse genotype calls")]
#[command(
    long_about = "clade-solver builds a tree of clades from per-kit genotype calls and sequencing coverage.\n\nIt combines calls with coverage into a kit x variant matrix, sorts the fully called part into nested blocks and:\n- Turns each block of shared derived variants into a candidate clade\n- Merges the candidates into an existing tree without breaking its structure\n- Reports clades it cannot place instead of guessing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build or extend a clade tree from calls and coverage
    Build(build::BuildArgs),

    /// Merge one saved tree into another
    Merge(merge::MergeArgs),

    /// Render a saved tree
    Export(export::ExportArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
