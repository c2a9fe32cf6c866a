//! # Billetwise CLI Application
//!
//! Runs the costing engine over a job snapshot and prints the result.
//!
//! ```text
//! cost_cli <job.bwj> [result.json]
//! cost_cli --processes
//! cost_cli --currencies
//! ```
//!
//! A human-readable summary and the full JSON result go to stdout. When a
//! second path is given the (unrounded) result is also written there
//! atomically. Set `RUST_LOG=debug` to trace every pipeline step on stderr.
//!
//! `--processes` prints the standard process library as Markdown and
//! `--currencies` prints the built-in exchange-rate table.

mod logging;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info, warn};

use cost_core::calculations::MachiningResult;
use cost_core::file_io::{load_job, save_result};
use cost_core::formula::library::generate_process_markdown;
use cost_core::pricing::CurrencyRates;
use cost_core::CostError;

const USAGE: &str = "usage: cost_cli <job.bwj> [result.json] | --processes | --currencies";

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (job_path, output_path) = match args.as_slice() {
        [flag] if flag == "--processes" => {
            print!("{}", generate_process_markdown());
            return ExitCode::SUCCESS;
        }
        [flag] if flag == "--currencies" => {
            print_currencies(&CurrencyRates::standard());
            return ExitCode::SUCCESS;
        }
        [job] => (PathBuf::from(job), None),
        [job, output] => (PathBuf::from(job), Some(PathBuf::from(output))),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&job_path, output_path.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), "{}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(job_path: &std::path::Path, output_path: Option<&std::path::Path>) -> Result<(), CostError> {
    let job = load_job(job_path)?;
    info!(path = %job_path.display(), label = %job.meta.label, "costing job");

    for problem in job.validate() {
        warn!(code = problem.error_code(), "{}", problem);
    }

    let result = job.run();
    print_summary(&job.meta.label, &result.rounded(2));

    println!();
    println!("JSON Output:");
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(path) = output_path {
        save_result(&result, path)?;
        info!(path = %path.display(), "result written");
    }

    Ok(())
}

fn print_currencies(rates: &CurrencyRates) {
    println!("Currency   Value in USD");
    for code in rates.codes() {
        if let Some(rate) = rates.rate(code) {
            println!("  {:<8} {:>12.5}", code, rate);
        }
    }
}

fn print_summary(label: &str, r: &MachiningResult) {
    let cur = &r.currency;
    println!("═══════════════════════════════════════");
    println!("  PART COST: {}", label);
    println!("═══════════════════════════════════════");
    println!();
    println!("Material:");
    println!("  Raw weight:      {:.4} kg", r.raw_weight_kg);
    println!("  Finished weight: {:.4} kg", r.finished_weight_kg);
    println!("  Cost per kg:     {:.2} {}", r.material_cost_per_kg, cur);
    println!("  Material cost:   {:.2} {}", r.raw_material_part_cost, cur);
    println!();
    println!("Time (min):");
    println!("  Cutting:     {:.2}", r.cutting_time_min);
    println!("  Setup:       {:.2}", r.setup_time_min);
    println!("  Tool change: {:.2}", r.tool_change_time_min);
    println!("  Effective:   {:.2}", r.effective_time_min);
    println!();
    println!("Per part ({}):", cur);
    println!("  Machining:         {:.2}", r.machining_cost);
    println!("  Tooling:           {:.2}", r.tool_cost);
    println!("  Surface treatment: {:.2}", r.surface_treatment_cost);
    println!("  Markups:           {:.2}", r.total_markup_cost);
    println!();
    println!("═══════════════════════════════════════");
    println!("  COST PER PART: {:.2} {}", r.cost_per_part, cur);
    println!("  BATCH OF {}: {:.2} {}", r.batch_volume, r.batch.total_cost, cur);
    println!("═══════════════════════════════════════");

    if r.has_mixed_currencies() {
        println!();
        println!("WARNING: some prices had no exchange rate; totals mix currencies.");
    }

    if r.has_diagnostics() {
        println!();
        println!("Diagnostics:");
        for d in &r.diagnostics {
            println!("  [{}] {}", d.code(), d.message());
        }
    }
}
