use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::cli::OutputFormat;
use crate::store::{JsonTreeStore, TreeStore};
use crate::tree::export::{to_dot, to_graph, write_closure_tsv, write_outline};

#[derive(Args)]
pub struct ExportArgs {
    /// Saved tree (JSON)
    #[arg(required = true)]
    pub tree: PathBuf,

    /// Rendering to produce
    #[arg(long = "as", value_enum, default_value = "text")]
    pub render: Rendering,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Rendering {
    /// Graphviz DOT
    Dot,
    /// JSON node and edge lists
    GraphJson,
    /// Closure-table and association rows (TSV)
    Closure,
    /// Indented outline
    Text,
}

pub fn run(args: ExportArgs, _format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let (tree, catalog) = JsonTreeStore::new(&args.tree).load()?.restore()?;

    if verbose {
        eprintln!("Loaded {} clades, {} variants", tree.len() - 1, catalog.len());
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match args.render {
        Rendering::Dot => write!(out, "{}", to_dot(&tree, &catalog)?)?,
        Rendering::GraphJson => {
            serde_json::to_writer_pretty(&mut out, &to_graph(&tree, &catalog))?;
            writeln!(out)?;
        }
        Rendering::Closure => write_closure_tsv(&mut out, &tree, &catalog)?,
        Rendering::Text => write_outline(&mut out, &tree, &catalog)?,
    }

    out.flush()?;
    Ok(())
}
