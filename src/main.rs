use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use dealbook::observability;
use dealbook::pipeline::{PipelineRunner, Snapshot};
use dealbook::registry::{RunMode, SchemaRegistry};

#[derive(Parser)]
#[command(name = "dealbook")]
#[command(about = "Entity reconciliation pipeline for deal flow exports")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one snapshot directory into normalized tables
    Run {
        /// Directory holding the raw table exports (deals.json, companies.json, ...)
        #[arg(long)]
        snapshot: PathBuf,
        /// Schema registry TOML file
        #[arg(long)]
        schema: PathBuf,
        /// Output directory for the assembled tables and the audit log
        #[arg(long, default_value = "out")]
        out: PathBuf,
        /// Fail on unparsable cells instead of coercing them to absent
        #[arg(long)]
        strict: bool,
    },
    /// Validate a schema registry file without processing anything
    CheckSchema {
        /// Schema registry TOML file
        #[arg(long)]
        schema: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    observability::init_logging();
    observability::init_metrics();

    match cli.command {
        Commands::Run {
            snapshot,
            schema,
            out,
            strict,
        } => run(&snapshot, &schema, &out, strict),
        Commands::CheckSchema { schema } => check_schema(&schema),
    }
}

fn run(snapshot_dir: &Path, schema_path: &Path, out_dir: &Path, strict: bool) -> anyhow::Result<()> {
    let mut registry = SchemaRegistry::load_from_path(schema_path)?;
    if strict {
        let mut run_config = registry.run_config();
        run_config.mode = RunMode::Strict;
        registry.run = Some(run_config);
    }

    let snapshot = Snapshot::load_from_dir(snapshot_dir)?;
    let runner = PipelineRunner::new(registry);
    let output = runner.run(&snapshot)?;

    fs::create_dir_all(out_dir)?;
    write_table(out_dir, "deals", &output.tables.deals)?;
    write_table(out_dir, "financial_metrics", &output.tables.financial_metrics)?;
    write_table(out_dir, "companies", &output.tables.companies)?;
    write_table(out_dir, "contacts", &output.tables.contacts)?;
    write_table(out_dir, "participants", &output.tables.participants)?;
    write_table(out_dir, "audit", &output.audit)?;

    println!(
        "✅ Run {} wrote {} row(s) and {} audit entr(ies) to {}",
        output.summary.run_id,
        output.summary.rows_out,
        output.summary.audit_entries,
        out_dir.display()
    );
    Ok(())
}

fn check_schema(schema_path: &Path) -> anyhow::Result<()> {
    let registry = SchemaRegistry::load_from_path(schema_path)?;
    let mut tables: Vec<&String> = registry.tables.keys().collect();
    tables.sort();
    println!(
        "✅ Schema registry is valid: {} table(s) ({})",
        tables.len(),
        tables
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn write_table<T: Serialize>(out_dir: &Path, name: &str, rows: &T) -> anyhow::Result<()> {
    let path = out_dir.join(format!("{}.json", name));
    fs::write(&path, serde_json::to_vec_pretty(rows)?)?;
    Ok(())
}
