use crate::config::JobConfig;
use crate::pipeline::{Pipeline, RunReport};
use ::log::LevelFilter;
use std::time::Duration;

/// Sets up `env_logger`. `RUST_LOG` wins when set; otherwise the level comes
/// from `level` (a config file's `log_level`), then from the verbosity flags.
pub fn init_logger(verbose: bool, quiet: bool, level: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    let filter = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        level
            .and_then(|l| l.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info)
    };
    builder.filter_level(filter);
    builder.format_timestamp(None).format_target(false);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    // a second init in the same process (tests) is harmless
    let _ = builder.try_init();
}

pub fn show_greeting(source: &str) {
    println!("=== NetCDF Wind Preparation ===");
    println!("Loading configuration from: {}", source);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input NetCDF: {}", config.input.display());
    println!("  Working directory: {}", config.working_directory().display());
    println!("  Scalar variables: {}", config.scalar.variables.join(", "));
    println!(
        "  Wind variables: {} -> {}, {} -> {}",
        config.wind.u_variable, config.wind.u_alias, config.wind.v_variable, config.wind.v_alias
    );
    println!(
        "  Scripts: {}, {}, {}",
        config.scalar.script.display(),
        config.wind.define_level_script.display(),
        config.wind.min_max_script.display()
    );
    println!(
        "  Outputs: {}, {}",
        config.scalar.output, config.wind.output
    );
}

/// Lists the commands a run would execute.
pub fn show_plan(pipeline: &Pipeline) {
    println!("\nPlanned commands:");
    for (i, stage) in pipeline.stages().iter().enumerate() {
        println!("  {:>2}. {:<36} {}", i + 1, stage.name, stage.invocation);
    }
    for promotion in pipeline.promotions() {
        println!(
            "      rename {} -> {}",
            promotion.staged.display(),
            promotion.target.display()
        );
    }
    println!("      remove temp*.nc in {}", pipeline.work_dir().display());
}

pub fn show_report(report: &RunReport) {
    println!("\nStages:");
    for stage in &report.stages {
        println!("  {:<36} {:>8} ms", stage.name, stage.elapsed_ms);
    }
    println!("Outputs:");
    for output in &report.outputs {
        println!("  {}", output.display());
    }
    println!(
        "Removed {} temporary file(s)",
        report.removed_temp_files.len()
    );
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!(
        "\n=== Pipeline completed successfully in {:.2?} ===",
        elapsed
    );
}
