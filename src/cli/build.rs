use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::cli::OutputFormat;
use crate::parsing;
use crate::pipeline::{Dataset, Pipeline, PipelineConfig, RunReport};
use crate::store::{JsonTreeStore, TreeSnapshot, TreeStore};
use crate::tree::export::write_matrix_tsv;
use crate::tree::CladeTree;

#[derive(Args)]
pub struct BuildArgs {
    /// Variant catalog (build, position, ancestral, derived, names)
    #[arg(long)]
    pub variants: Option<PathBuf>,

    /// Reference-swapped sites, listed with their canonical alleles
    #[arg(long)]
    pub swaps: Option<PathBuf>,

    /// Coverage table (kit, min, max) or per-kit BED file; repeatable
    #[arg(long)]
    pub coverage: Vec<PathBuf>,

    /// Calls table (kit, build, position, ref, alt, genotype); repeatable
    #[arg(long)]
    pub calls: Vec<PathBuf>,

    /// Single-sample VCF; the sample column names the kit; repeatable
    #[arg(long)]
    pub vcf: Vec<PathBuf>,

    /// Reference build of VCF positions
    #[arg(long, default_value = "hg38")]
    pub build: String,

    /// Chromosome read from VCF and BED inputs; aliases such as `Y` and `24` match
    #[arg(long, default_value = "chrY")]
    pub chrom: String,

    /// Restrict the run to the kits listed in this file
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Pipeline configuration (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Existing tree to merge the new clades into
    #[arg(long)]
    pub tree: Option<PathBuf>,

    /// Where to write the resulting tree (JSON)
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Also write the annotated call matrix (TSV)
    #[arg(long)]
    pub matrix: Option<PathBuf>,
}

pub fn run(args: BuildArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let mut dataset = Dataset::new();
    let mut tree = match &args.tree {
        Some(path) => {
            let (tree, catalog) = JsonTreeStore::new(path).load()?.restore()?;
            info!("Loaded tree with {} clades from {}", tree.len() - 1, path.display());
            dataset.catalog = catalog;
            tree
        }
        None => CladeTree::new(),
    };

    load_inputs(&args, &mut dataset)?;
    if dataset.calls.is_empty() {
        anyhow::bail!("No calls loaded; pass --calls or --vcf");
    }

    if verbose {
        eprintln!(
            "Loaded {} variants, {} calls, {} records ({} malformed)",
            dataset.catalog.len(),
            dataset.calls.len(),
            dataset.stats.records,
            dataset.stats.malformed
        );
    }

    let output = Pipeline::new(config).run(&dataset, &mut tree)?;

    JsonTreeStore::new(&args.output).save(&TreeSnapshot::capture(&tree, &dataset.catalog))?;
    info!("Wrote tree to {}", args.output.display());

    if let Some(path) = &args.matrix {
        let mut w = BufWriter::new(File::create(path)?);
        write_matrix_tsv(&mut w, &output.matrix, &dataset.catalog, Some(&tree))?;
        w.flush()?;
    }

    match format {
        OutputFormat::Text => print_text_report(&output.report, &tree),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output.report)?),
        OutputFormat::Tsv => print_tsv_report(&output.report),
    }

    Ok(())
}

fn load_inputs(args: &BuildArgs, dataset: &mut Dataset) -> anyhow::Result<()> {
    if let Some(path) = &args.variants {
        let stats = parsing::variants::load_variant_catalog(path, &mut dataset.catalog)?;
        dataset.stats.merge(stats);
    }
    if let Some(path) = &args.swaps {
        let stats = parsing::variants::load_reference_swaps(path, &mut dataset.catalog)?;
        dataset.stats.merge(stats);
    }
    for path in &args.calls {
        let (calls, stats) = parsing::calls::load_calls(path, &mut dataset.catalog)?;
        dataset.calls.extend(calls);
        dataset.stats.merge(stats);
    }
    for path in &args.vcf {
        let (calls, stats) = parsing::vcf::load_vcf(path, &args.build, &args.chrom, &mut dataset.catalog)?;
        dataset.calls.extend(calls);
        dataset.stats.merge(stats);
    }
    for path in &args.coverage {
        let stats = parsing::coverage::load_coverage(path, &args.chrom, &mut dataset.coverage)?;
        dataset.stats.merge(stats);
    }
    if let Some(path) = &args.roster {
        let (roster, stats) = parsing::roster::load_roster(path)?;
        if roster.is_empty() {
            anyhow::bail!("Roster {} lists no kits", path.display());
        }
        dataset.roster = roster;
        dataset.stats.merge(stats);
    }

    dataset.finalize();
    Ok(())
}

fn print_text_report(report: &RunReport, tree: &CladeTree) {
    println!("Build Results");
    println!("{}", "=".repeat(60));

    println!("\nInput:");
    println!("  Records: {} ({} malformed)", report.records, report.malformed_records);
    println!("  Call matrix: {} variants x {} kits", report.matrix_variants, report.matrix_kits);
    println!("  Fully called: {} variants x {} kits", report.perfect_variants, report.perfect_kits);
    if report.swapped_calls > 0 || report.rejected_calls > 0 {
        println!(
            "  Reference swaps: {} calls inverted, {} rejected",
            report.swapped_calls, report.rejected_calls
        );
    }

    println!("\nTree:");
    println!("  Candidate clades: {}", report.candidate_clades);
    println!("  Placed: {}", report.placed_clades);
    println!("  Clades in tree: {}", tree.len() - 1);

    if !report.contradictory_calls.is_empty() {
        println!("\nContradictory calls ({}):", report.contradictory_calls.len());
        for c in &report.contradictory_calls {
            println!("  {} at {}: {:?} replaced by {:?}", c.kit, c.variant, c.previous, c.kept);
        }
    }

    if !report.inconsistent_blocks.is_empty() {
        println!("\nInconsistent blocks ({}):", report.inconsistent_blocks.len());
        for b in &report.inconsistent_blocks {
            println!(
                "  rows {}..={} cols {}..={}: expected {}, observed {}",
                b.block.row_min, b.block.row_max, b.block.col_min, b.block.col_max, b.expected, b.observed
            );
        }
    }

    if !report.set_aside.is_empty() {
        println!("\nSet aside ({}):", report.set_aside.len());
        for clade in &report.set_aside {
            println!("  {}: {}", clade.candidate, clade.reason);
        }
    }
}

fn print_tsv_report(report: &RunReport) {
    println!("metric\tvalue");
    println!("records\t{}", report.records);
    println!("malformed_records\t{}", report.malformed_records);
    println!("matrix_variants\t{}", report.matrix_variants);
    println!("matrix_kits\t{}", report.matrix_kits);
    println!("perfect_variants\t{}", report.perfect_variants);
    println!("perfect_kits\t{}", report.perfect_kits);
    println!("swapped_calls\t{}", report.swapped_calls);
    println!("rejected_calls\t{}", report.rejected_calls);
    println!("contradictory_calls\t{}", report.contradictory_calls.len());
    println!("inconsistent_blocks\t{}", report.inconsistent_blocks.len());
    println!("candidate_clades\t{}", report.candidate_clades);
    println!("placed_clades\t{}", report.placed_clades);
    println!("set_aside\t{}", report.set_aside.len());
}
