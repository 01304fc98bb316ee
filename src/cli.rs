//! # CLI Module
//!
//! This module provides the command-line interface for nc2wind, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variable support with the NC2WIND_ prefix
//! - Configuration layering: CLI arguments > environment > config file > defaults
//! - Subcommands for running, validating, inspecting and cleaning

use crate::cleanup::TempPattern;
use crate::config::JobConfig;
use crate::error::PipelineResult;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prepare scalar and wind NetCDF products with NCO
#[derive(Parser, Debug)]
#[command(name = "nc2wind")]
#[command(about = "Extract, scale and restructure NetCDF fields for wind visualisation using NCO")]
#[command(version)]
#[command(author = "Rogerio Malves <rjmalves@users.noreply.github.com>")]
#[command(long_about = "
nc2wind drives a fixed sequence of NCO commands (ncks, ncap2, ncrename, ncecat,
ncpdq) over a gridded NetCDF file and produces two files next to it:

  scaled.nc  surface scalar fields rescaled by scale.nco
  uv.nc      boundary-layer winds as U/V with a lev dimension, inverted
             latitude and min/max attributes from getMinMax.nco

All intermediate temp*.nc files are removed when the run ends, whether it
succeeded or not.

EXAMPLES:
  # Run with the default variables
  nc2wind run /data/run1/input.nc

  # Show the commands without running them
  nc2wind run /data/run1/input.nc --dry-run

  # Using config file
  nc2wind --config job.yaml run

  # Check tools, scripts and input variables
  nc2wind validate job.yaml --detailed

  # Remove leftovers by hand
  nc2wind clean /data/run1
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NC2WIND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the NCO pipeline
    #[command(long_about = "
Run the full pipeline on one input file.

Every option overrides the matching field of the configuration file.

EXAMPLES:
  # Defaults: four surface scalars and the PBL wind pair
  nc2wind run /data/run1/input.nc

  # Custom variables and latitude dimension name
  nc2wind run gfs.nc --scalar-vars TMP_surface,PRES_surface \\
    --wind UGRD_10maboveground:U,VGRD_10maboveground:V --lat-dim latitude

  # NCO from a conda environment, scripts from a shared directory
  nc2wind run input.nc --nco-bin-dir /opt/conda/bin --scripts-dir /opt/nc2wind/scripts

  # Keep the intermediates for debugging
  nc2wind run input.nc --keep-temp
")]
    Run {
        /// Input NetCDF file
        #[arg(value_name = "INPUT", env = "NC2WIND_INPUT")]
        input: Option<PathBuf>,

        /// Directory for intermediate and output files (default: the input's directory)
        #[arg(long, env = "NC2WIND_WORK_DIR")]
        work_dir: Option<PathBuf>,

        /// Scalar variables: var1,var2,...
        #[arg(
            long = "scalar-vars",
            value_parser = parse_variable_list,
            env = "NC2WIND_SCALAR_VARS"
        )]
        scalar_vars: Option<VariableListArg>,

        /// Wind pair: u_var[:alias],v_var[:alias]
        #[arg(long = "wind", value_parser = parse_wind_pair, env = "NC2WIND_WIND_VARS")]
        wind: Option<WindPairArg>,

        /// Name of the synthetic level dimension
        #[arg(long = "level-dim", env = "NC2WIND_LEVEL_DIM")]
        level_dimension: Option<String>,

        /// Name of the latitude dimension to invert
        #[arg(long = "lat-dim", env = "NC2WIND_LAT_DIM")]
        latitude_dimension: Option<String>,

        /// Directory containing the NCO binaries
        #[arg(long, env = "NC2WIND_NCO_BIN_DIR")]
        nco_bin_dir: Option<PathBuf>,

        /// Directory containing scale.nco, defineLev.nco and getMinMax.nco
        #[arg(long, env = "NC2WIND_SCRIPTS_DIR")]
        scripts_dir: Option<PathBuf>,

        /// Dry run - print the commands without running them
        #[arg(long, env = "NC2WIND_DRY_RUN")]
        dry_run: bool,

        /// Keep temp*.nc intermediates after the run
        #[arg(long, env = "NC2WIND_KEEP_TEMP")]
        keep_temp: bool,

        /// Do not check the input for required variables before running
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Validate configuration, tools, scripts and input
    #[command(long_about = "
Validate a job without running it.

Checks performed:
• Configuration file syntax and field values
• Availability of every NCO binary
• Existence of the three .nco scripts
• Presence of every required variable in the input file

EXAMPLES:
  nc2wind validate job.json
  nc2wind validate job.yaml --detailed
  nc2wind --config job.yaml validate
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Show detailed validation report
        #[arg(long)]
        detailed: bool,
    },

    /// Show information about a NetCDF file
    #[command(long_about = "
Inspect a NetCDF file: dimensions, variables, attributes, and whether the
variables the pipeline needs are present.

EXAMPLES:
  nc2wind info input.nc
  nc2wind info input.nc --detailed
  nc2wind info input.nc -n TMP_surface --format json
")]
    Info {
        /// NetCDF file path
        file: PathBuf,

        /// Show global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only one variable
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Remove temporary files from a directory
    #[command(long_about = "
Delete every file matching the temp pattern (default temp*.nc) directly inside
DIR. Subdirectories and non-matching files are never touched.

EXAMPLES:
  nc2wind clean /data/run1
  nc2wind clean /data/run1 --dry-run
  nc2wind clean /scratch --pattern 'tmp_*.nc'
")]
    Clean {
        /// Directory to clean
        dir: PathBuf,

        /// File name pattern with a single '*'
        #[arg(long, value_parser = parse_temp_pattern, default_value = "temp*.nc")]
        pattern: TempPattern,

        /// List matching files without deleting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate configuration templates
    #[command(long_about = "
Generate a configuration file template.

Available templates:
• basic: only the input path, everything else defaulted
• full: every field with its default value

EXAMPLES:
  nc2wind template basic
  nc2wind template full --format yaml -o job.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, PowerShell or elvish.

EXAMPLES:
  nc2wind completions bash > ~/.bash_completion.d/nc2wind
  nc2wind completions zsh -o _nc2wind
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Input path only
    Basic,
    /// Every field with its default
    Full,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Comma-separated variable names from the command line
#[derive(Clone, Debug, PartialEq)]
pub struct VariableListArg(pub Vec<String>);

/// Wind components with optional rename targets
#[derive(Clone, Debug, PartialEq)]
pub struct WindPairArg {
    pub u_variable: String,
    pub u_alias: Option<String>,
    pub v_variable: String,
    pub v_alias: Option<String>,
}

/// Overrides collected from `run` arguments, applied on top of the config file
#[derive(Clone, Debug, Default)]
pub struct RunOverrides {
    pub input: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub scalar_vars: Option<VariableListArg>,
    pub wind: Option<WindPairArg>,
    pub level_dimension: Option<String>,
    pub latitude_dimension: Option<String>,
    pub nco_bin_dir: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub keep_temp: bool,
}

/// Extended configuration that includes CLI-specific options
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CliConfig {
    #[serde(flatten)]
    pub job: JobConfig,

    /// CLI-specific options
    #[serde(default)]
    pub cli_options: CliOptions,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CliOptions {
    /// Default log level (error, warn, info, debug, trace)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Show a progress bar while stages run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,

    /// Output formatting preference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
}

impl CliConfig {
    /// Loads a JSON or YAML configuration file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => serde_json::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(Into::into),
        }
    }
}

/// Parse variable list from command line argument
/// Format: var1,var2,var3
fn parse_variable_list(s: &str) -> Result<VariableListArg, String> {
    let vars: Vec<String> = s
        .split(',')
        .map(|v| v.trim().to_string())
        .collect();
    if vars.iter().any(|v| v.is_empty()) {
        return Err("Variable list must be 'var1,var2,...' with no empty names".to_string());
    }
    Ok(VariableListArg(vars))
}

/// Parse a wind component: name or name:alias
fn parse_wind_component(s: &str) -> Result<(String, Option<String>), String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [name] if !name.is_empty() => Ok((name.to_string(), None)),
        [name, alias] if !name.is_empty() && !alias.is_empty() => {
            Ok((name.to_string(), Some(alias.to_string())))
        }
        _ => Err(format!("Invalid wind component '{}', expected 'name' or 'name:alias'", s)),
    }
}

/// Parse wind pair from command line argument
/// Format: u_var[:alias],v_var[:alias]
fn parse_wind_pair(s: &str) -> Result<WindPairArg, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Wind pair must be in format 'u_var[:alias],v_var[:alias]'".to_string());
    }
    let (u_variable, u_alias) = parse_wind_component(parts[0])?;
    let (v_variable, v_alias) = parse_wind_component(parts[1])?;
    if u_variable == v_variable {
        return Err("Wind components must be two different variables".to_string());
    }
    Ok(WindPairArg {
        u_variable,
        u_alias,
        v_variable,
        v_alias,
    })
}

fn parse_temp_pattern(s: &str) -> Result<TempPattern, String> {
    TempPattern::parse(s).map_err(|e| e.to_string())
}

impl RunOverrides {
    /// Applies every set override to `job`.
    pub fn apply(&self, job: &mut JobConfig) {
        if let Some(input) = &self.input {
            job.input = input.clone();
        }
        if let Some(dir) = &self.work_dir {
            job.work_dir = Some(dir.clone());
        }
        if let Some(VariableListArg(vars)) = &self.scalar_vars {
            job.scalar.variables = vars.clone();
        }
        if let Some(wind) = &self.wind {
            job.wind.u_variable = wind.u_variable.clone();
            job.wind.v_variable = wind.v_variable.clone();
            if let Some(alias) = &wind.u_alias {
                job.wind.u_alias = alias.clone();
            }
            if let Some(alias) = &wind.v_alias {
                job.wind.v_alias = alias.clone();
            }
        }
        if let Some(dim) = &self.level_dimension {
            job.wind.level_dimension = dim.clone();
        }
        if let Some(dim) = &self.latitude_dimension {
            job.wind.latitude_dimension = dim.clone();
        }
        if let Some(dir) = &self.nco_bin_dir {
            job.tools.bin_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.scripts_dir {
            job.set_scripts_dir(dir);
        }
        if self.keep_temp {
            job.keep_temp = true;
        }
    }
}

/// Builds the effective configuration for `run`.
///
/// Priority: CLI arguments and environment (resolved by clap) > config file > defaults.
pub fn build_cli_config(
    base: Option<CliConfig>,
    overrides: &RunOverrides,
) -> PipelineResult<CliConfig> {
    let mut config = base.unwrap_or_else(|| CliConfig {
        job: JobConfig::new(PathBuf::new()),
        cli_options: CliOptions::default(),
    });
    overrides.apply(&mut config.job);
    config.job.validate()?;
    Ok(config)
}

/// Renders a configuration template.
pub fn render_template(
    template_type: &TemplateType,
    format: &ConfigFormat,
) -> PipelineResult<String> {
    let example_input = PathBuf::from("/data/run1/input.nc");
    let rendered = match template_type {
        TemplateType::Basic => {
            let value = serde_json::json!({ "input": example_input });
            match format {
                ConfigFormat::Json => serde_json::to_string_pretty(&value)?,
                ConfigFormat::Yaml => serde_yaml::to_string(&value)?,
            }
        }
        TemplateType::Full => {
            let mut job = JobConfig::new(example_input);
            job.work_dir = Some(PathBuf::from("/data/run1"));
            job.tools.bin_dir = Some(PathBuf::from("/opt/conda/bin"));
            let config = CliConfig {
                job,
                cli_options: CliOptions {
                    log_level: Some("info".to_string()),
                    progress: Some(true),
                    output_format: Some(OutputFormat::Human),
                },
            };
            match format {
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
                ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
            }
        }
    };
    Ok(rendered)
}
