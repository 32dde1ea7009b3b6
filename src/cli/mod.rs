//! tabprep CLI Module
//!
//! Command-line interface for compiling plans, fitting and applying a
//! preprocessor.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::load_features_config;
use crate::preprocessing::{ActionPlan, Pipeline, PipelineStage, PreProcessor};
use crate::utils::{save_csv, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn describe_stage(stage: &PipelineStage) -> String {
    match stage {
        PipelineStage::Columns(router) => {
            let steps: Vec<String> = router
                .transforms()
                .iter()
                .filter(|routed| !routed.transform.is_identity())
                .map(|routed| format!("{}: {}", routed.column, routed.transform))
                .collect();
            if steps.is_empty() {
                "identity".to_string()
            } else {
                steps.join(", ")
            }
        }
        PipelineStage::Passthrough(_) => "passthrough".to_string(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tabprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Configuration-driven tabular feature preprocessing")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a feature configuration and print its action plan
    Plan {
        /// Feature configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Fit a preprocessor on training data and save it
    Fit {
        /// Feature configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Training data (CSV or JSON records)
        #[arg(short, long)]
        data: PathBuf,

        /// Output file for the fitted preprocessor
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the transformed training data to this CSV file
        #[arg(long)]
        transformed: Option<PathBuf>,
    },

    /// Transform data with a fitted preprocessor
    Transform {
        /// Fitted preprocessor written by `fit`
        #[arg(short, long)]
        model: PathBuf,

        /// Input data (CSV, or JSON with one record or an array of records)
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_plan(config_path: &Path) -> anyhow::Result<()> {
    section("Plan");

    let features = load_features_config(config_path)?;
    let plan = ActionPlan::compile(&features)?;

    kv("Features", &features.len().to_string());
    kv("Active", &features.iter().filter(|f| f.active).count().to_string());
    kv("Stages", &plan.n_stages().to_string());
    println!();
    for line in plan.to_string().lines() {
        println!("  {}", line);
    }
    println!();

    Ok(())
}

pub fn cmd_fit(
    config_path: &Path,
    data_path: &Path,
    output_path: &Path,
    transformed_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Fit");

    step_run("Loading configuration");
    let features = load_features_config(config_path)?;
    step_done(&format!("{} features", features.len()));

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_auto(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Fitting");
    let start = Instant::now();
    let mut preprocessor = PreProcessor::new(features);
    preprocessor.fit(&df, None)?;
    let stages = preprocessor.pipeline().map_or(&[][..], Pipeline::stages);
    step_done(&format!("{} stages in {:?}", stages.len(), start.elapsed()));
    for named in stages {
        kv(&named.name, &describe_stage(&named.stage));
    }

    step_run(&format!("Saving → {}", output_path.display()));
    preprocessor.save(output_path)?;
    step_done("");

    if let Some(path) = transformed_path {
        step_run(&format!("Writing transformed data → {}", path.display()));
        let mut transformed = preprocessor.transform(&df)?;
        save_csv(&mut transformed, path)?;
        step_done(&format!("{} rows × {} cols", transformed.height(), transformed.width()));
    }

    println!();
    Ok(())
}

pub fn cmd_transform(model_path: &Path, data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Transform");

    step_run("Loading preprocessor");
    let preprocessor = PreProcessor::load(model_path)?;
    step_done(&format!("{} active features", preprocessor.feature_names().len()));

    step_run("Loading data");
    let df = DataLoader::new().load_auto(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Transforming");
    let start = Instant::now();
    let mut transformed = preprocessor.transform(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output_path.display()));
    save_csv(&mut transformed, output_path)?;
    step_done(&format!("{} rows × {} cols", transformed.height(), transformed.width()));

    println!();
    Ok(())
}
