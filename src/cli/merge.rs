use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::OutputFormat;
use crate::pipeline::PipelineConfig;
use crate::store::{JsonTreeStore, TreeSnapshot, TreeStore};
use crate::tree::{MergeCase, MergeReport, TreeMerger};

#[derive(Args)]
pub struct MergeArgs {
    /// Tree to merge into
    #[arg(required = true)]
    pub target: PathBuf,

    /// Tree whose clades are merged
    #[arg(required = true)]
    pub source: PathBuf,

    /// Where to write the merged tree (default: overwrite the target)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pipeline configuration (JSON); only the disjoint policy applies
    #[arg(long)]
    pub config: Option<PathBuf>,
}

const CASES: [MergeCase; 5] = [
    MergeCase::Identical,
    MergeCase::Superset,
    MergeCase::Subset,
    MergeCase::PartialOverlap,
    MergeCase::Disjoint,
];

pub fn run(args: MergeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let (mut tree, mut catalog) = JsonTreeStore::new(&args.target).load()?.restore()?;
    let candidate = JsonTreeStore::new(&args.source).load()?.import_into(&mut catalog)?;

    if verbose {
        eprintln!(
            "Target: {} clades; source: {} clades",
            tree.len() - 1,
            candidate.len() - 1
        );
    }

    let report = TreeMerger::new()
        .with_disjoint_policy(config.disjoint_policy)
        .merge(&mut tree, &candidate)?;

    let output = args.output.as_ref().unwrap_or(&args.target);
    JsonTreeStore::new(output).save(&TreeSnapshot::capture(&tree, &catalog))?;
    info!("Wrote merged tree with {} clades to {}", tree.len() - 1, output.display());

    match format {
        OutputFormat::Text => print_text_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Tsv => print_tsv_report(&report),
    }

    Ok(())
}

fn print_text_report(report: &MergeReport) {
    println!("Merge Results");
    println!("{}", "=".repeat(60));

    println!("\nPlacements:");
    for case in CASES {
        println!("  {:<16} {}", format!("{case:?}:"), report.count(case));
    }

    if !report.set_aside.is_empty() {
        println!("\nSet aside ({}):", report.set_aside.len());
        for clade in &report.set_aside {
            let name = clade.name.as_deref().unwrap_or("-");
            println!("  {} ({}): {}", clade.candidate, name, clade.reason);
        }
    }
}

fn print_tsv_report(report: &MergeReport) {
    println!("candidate\ttarget\tcase");
    for p in &report.placements {
        println!("{}\t{}\t{:?}", p.candidate, p.target, p.case);
    }
    for clade in &report.set_aside {
        println!("{}\t.\tSetAside", clade.candidate);
    }
}
