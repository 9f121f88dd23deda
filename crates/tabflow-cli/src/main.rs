//! tabflow CLI: validate, explain and run pipeline definitions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabflow_core::config::EngineConfig;
use tabflow_exec::{replay, Engine, RunResult};
use tabflow_io::writers::{csv::CsvWriter, write_path};
use tabflow_io::FsCatalog;
use tabflow_planner::{plan_definition, ExecutionPlan, PipelineConfig, PipelineDefinition};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "tabflow")]
#[command(about = "Validate, explain and run tabular pipeline graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline definition (YAML or JSON)
    Run {
        /// Path to the pipeline definition
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Catalog root directory (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Maximum parallel tasks (overrides config)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Currency for money formulas that name none (overrides config)
        #[arg(long)]
        currency: Option<String>,

        /// Rows of the output table to print (overrides config)
        #[arg(long)]
        preview: Option<usize>,

        /// Write the output table here (.csv or .jsonl)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the run manifest as JSON
        #[arg(long)]
        manifest: bool,
    },

    /// Validate a pipeline definition without running it
    Validate {
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the execution plan for a pipeline
    Explain {
        #[arg(short, long)]
        pipeline: PathBuf,
    },
}

/// Flag values that override env and file configuration.
#[derive(Debug, Default)]
struct Overrides {
    data_dir: Option<PathBuf>,
    max_parallel: Option<usize>,
    currency: Option<String>,
    preview: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run {
            pipeline,
            data_dir,
            max_parallel,
            currency,
            preview,
            out,
            manifest,
        } => {
            let overrides = Overrides {
                data_dir,
                max_parallel,
                currency,
                preview,
            };
            run_pipeline(&pipeline, overrides, out.as_deref(), manifest)
        }
        Commands::Validate { pipeline } => validate_pipeline(&pipeline),
        Commands::Explain { pipeline } => explain_pipeline(&pipeline),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_definition(path: &Path) -> CliResult<PipelineDefinition> {
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let def = if is_json {
        PipelineDefinition::from_json_str(&text)?
    } else {
        PipelineDefinition::from_yaml_str(&text)?
    };
    Ok(def)
}

/// Environment first, then the definition's `config` block, then flags.
fn resolve_config(def: &PipelineDefinition, overrides: &Overrides) -> EngineConfig {
    let mut cfg = EngineConfig::from_env();
    if let Some(doc) = &def.config {
        apply_pipeline_config(&mut cfg, doc);
    }
    apply_overrides(&mut cfg, overrides);
    cfg
}

fn apply_pipeline_config(cfg: &mut EngineConfig, doc: &PipelineConfig) {
    doc.apply_to(cfg);
}

fn apply_overrides(cfg: &mut EngineConfig, overrides: &Overrides) {
    if let Some(dir) = &overrides.data_dir {
        cfg.data_dir = Some(dir.display().to_string());
    }
    if let Some(n) = overrides.max_parallel {
        cfg.max_parallel_tasks = n.max(1);
    }
    if let Some(c) = overrides.currency.as_deref().map(str::trim) {
        if !c.is_empty() {
            cfg.default_currency = c.to_ascii_uppercase();
        }
    }
    if let Some(n) = overrides.preview {
        cfg.preview_rows = n;
    }
}

fn run_pipeline(
    pipeline_path: &Path,
    overrides: Overrides,
    out: Option<&Path>,
    print_manifest: bool,
) -> CliResult<()> {
    let def = load_definition(pipeline_path)?;
    let cfg = resolve_config(&def, &overrides);
    let data_dir = cfg
        .data_dir
        .clone()
        .ok_or("no catalog directory: pass --data-dir or set TABFLOW_DATA_DIR")?;
    let plan = plan_definition(&def)?;
    let preview_rows = cfg.preview_rows;

    tracing::info!(pipeline = %pipeline_path.display(), data_dir = %data_dir, "running pipeline");
    let engine = Engine::new(cfg, Arc::new(FsCatalog::new(data_dir)));
    let result = execute(engine, &plan)?;

    print_summary(&plan, &result);

    if print_manifest {
        println!("{}", serde_json::to_string_pretty(&result.manifest)?);
    }

    let Some(table) = result.output_table() else {
        let reason = match result.output_result() {
            Some(Err(e)) => e.to_string(),
            _ => "no result".to_string(),
        };
        return Err(format!("output node '{}' failed: {reason}", result.output).into());
    };

    if let Some(path) = out {
        write_path(path, table)?;
        println!("Wrote {} rows to {}", table.num_rows(), path.display());
    }
    if preview_rows > 0 {
        println!();
        let title = result.output_label.as_deref().unwrap_or(result.output.as_str());
        println!("{title} (first {} of {} rows):", preview_rows.min(table.num_rows()), table.num_rows());
        CsvWriter::to_writer(io::stdout().lock()).write_table(&table.head(preview_rows))?;
    }
    Ok(())
}

#[cfg(not(feature = "async-scheduler"))]
fn execute(engine: Engine, plan: &ExecutionPlan) -> CliResult<RunResult> {
    Ok(engine.run(plan)?)
}

#[cfg(feature = "async-scheduler")]
fn execute(engine: Engine, plan: &ExecutionPlan) -> CliResult<RunResult> {
    let runtime = tokio::runtime::Runtime::new()?;
    let scheduler = tabflow_exec::AsyncScheduler::new(engine);
    Ok(runtime.block_on(scheduler.run(plan))?)
}

fn print_summary(plan: &ExecutionPlan, result: &RunResult) {
    println!("Run {} ({}ms)", result.manifest.id.0, result.manifest.elapsed_ms());
    println!("  Pipeline hash: {}", result.manifest.pipeline_hash);
    if let Some(digest) = &result.manifest.output_digest {
        println!("  Output digest: {digest}");
    }
    for step in &plan.steps {
        match result.node(&step.node) {
            Some(Ok(out)) => {
                print!(
                    "  ok   {} [{}] {} -> {} rows",
                    step.node, step.kind, out.metrics.rows_in, out.metrics.rows_out
                );
                if !out.diagnostics.is_empty() {
                    print!(" ({})", out.diagnostics);
                }
                println!();
            }
            Some(Err(e)) => println!("  FAIL {} [{}] {e}", step.node, step.kind),
            None => println!("  skip {} [{}]", step.node, step.kind),
        }
    }
    let totals = result.diagnostics();
    if !totals.is_empty() {
        println!("  Row diagnostics: {totals}");
    }
}

fn validate_pipeline(pipeline_path: &Path) -> CliResult<()> {
    let def = load_definition(pipeline_path)?;
    let plan = plan_definition(&def)?;
    println!(
        "Pipeline is valid: {} nodes, {} waves, output '{}'",
        plan.len(),
        plan.waves.len(),
        plan.output
    );
    Ok(())
}

fn explain_pipeline(pipeline_path: &Path) -> CliResult<()> {
    let def = load_definition(pipeline_path)?;
    let plan = plan_definition(&def)?;
    println!("Pipeline Execution Plan");
    println!("=======================");
    println!("Definition hash: {}", replay::hash_definition(&def)?);
    println!("Pipeline hash: {}", replay::hash_plan(&plan)?);
    print!("{plan}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |k: &str| vars.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())
    }

    #[test]
    fn pipeline_config_overrides_env() {
        let mut cfg = EngineConfig::from_lookup(lookup(&[
            ("TABFLOW_DEFAULT_CURRENCY", "usd"),
            ("TABFLOW_DATA_DIR", "/env/data"),
        ]));
        let doc = PipelineConfig {
            default_currency: Some("eur".into()),
            ..Default::default()
        };
        apply_pipeline_config(&mut cfg, &doc);
        assert_eq!(cfg.default_currency, "EUR");
        assert_eq!(cfg.data_dir.as_deref(), Some("/env/data"));
    }

    #[test]
    fn cli_flags_override_pipeline_config() {
        let mut cfg = EngineConfig::default();
        let doc = PipelineConfig {
            max_parallel_tasks: Some(8),
            data_dir: Some("/file/data".into()),
            ..Default::default()
        };
        apply_pipeline_config(&mut cfg, &doc);
        apply_overrides(
            &mut cfg,
            &Overrides {
                data_dir: Some(PathBuf::from("/cli/data")),
                max_parallel: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(cfg.data_dir.as_deref(), Some("/cli/data"));
        assert_eq!(cfg.max_parallel_tasks, 1);
    }

    #[test]
    fn definition_format_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("p.json");
        fs::write(&json, r#"{"nodes": [{"id": "o", "type": "output"}]}"#).unwrap();
        let yaml = dir.path().join("p.yaml");
        fs::write(&yaml, "nodes:\n  - id: o\n    type: output\n").unwrap();
        assert_eq!(load_definition(&json).unwrap(), load_definition(&yaml).unwrap());
    }
}
