//! # nc2wind
//!
//! Prepares gridded NetCDF forecast output for 3D wind visualisation by driving
//! a fixed sequence of NCO (NetCDF Operators) commands.
//!
//! ## Products
//!
//! - **`scaled.nc`**: four surface scalar fields, rescaled by `scale.nco`
//! - **`uv.nc`**: the boundary-layer wind pair renamed to `U`/`V`, with a
//!   synthetic `lev` dimension, an inverted latitude axis and min/max
//!   attributes from `getMinMax.nco`
//!
//! Intermediate files are named `temp*.nc` and are removed when the run ends,
//! whether it succeeded or not.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2wind::{process_pipeline_job, config::JobConfig};
//! use nc2wind::pipeline::RunOptions;
//! use nc2wind::runner::ProcessRunner;
//!
//! let config = JobConfig::from_file("job.yaml")?;
//! let runner = ProcessRunner::new(config.tools.clone());
//! let report = process_pipeline_job(&config, &runner, &RunOptions::default())?;
//! println!("wrote {:?}", report.outputs);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod info;
pub mod log;
pub mod nco;
pub mod pipeline;
pub mod runner;

#[cfg(test)]
mod cli_tests;

use crate::config::JobConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::info::check_required_variables;
use crate::pipeline::{Pipeline, RunOptions, RunReport};
use crate::runner::ToolRunner;
use ::log::debug;

/// Checks everything that can be checked without running a tool: the input
/// file, the `.nco` scripts and, unless `check_variables` is false, that the
/// input holds every required variable.
///
/// # Errors
///
/// - `Io` if the input file does not exist
/// - `MissingScript` for the first `.nco` script that does not exist
/// - `MissingVariables` listing every required variable absent from the input
pub fn preflight(config: &JobConfig, check_variables: bool) -> PipelineResult<()> {
    if !config.input.is_file() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file {} not found", config.input.display()),
        )));
    }
    for script in config.scripts() {
        if !script.is_file() {
            return Err(PipelineError::MissingScript(script.to_path_buf()));
        }
    }
    if check_variables {
        check_required_variables(&config.input, &config.required_variables())?;
    }
    Ok(())
}

/// Runs the full pipeline described by `config`.
///
/// This function orchestrates the entire job:
/// 1. Validates the configuration
/// 2. Runs the preflight checks (input, scripts, required variables)
/// 3. Executes every NCO stage in order through `runner`
/// 4. Promotes the staged products and removes all `temp*.nc` files
///
/// A dry run only validates and returns the plan's outputs.
///
/// # Errors
///
/// Any configuration, preflight, tool or filesystem error aborts the job.
pub fn process_pipeline_job(
    config: &JobConfig,
    runner: &dyn ToolRunner,
    options: &RunOptions,
) -> PipelineResult<RunReport> {
    config.validate()?;
    let pipeline = Pipeline::from_config(config);

    if !options.dry_run {
        let check_variables = config.preflight && !options.skip_preflight;
        preflight(config, check_variables)?;
    } else {
        debug!("Dry run: skipping preflight checks");
    }

    let options = RunOptions {
        keep_temp: options.keep_temp || config.keep_temp,
        ..options.clone()
    };
    pipeline.execute(runner, &options)
}
