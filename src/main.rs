use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use log::{debug, error, info, warn};
use nc2wind::cleanup::{TempPattern, find_temp_files, remove_temp_files};
use nc2wind::cli::{
    Cli, CliConfig, Commands, OutputFormat, RunOverrides, build_cli_config, render_template,
};
use nc2wind::config::JobConfig;
use nc2wind::info::{
    get_netcdf_info, print_file_info_human, print_file_info_json, print_file_info_yaml,
};
use nc2wind::log::{
    config_echo, init_logger, show_farewell_with_timing, show_greeting, show_plan, show_report,
};
use nc2wind::nco::Tool;
use nc2wind::pipeline::{Pipeline, RunOptions, RunReport};
use nc2wind::process_pipeline_job;
use nc2wind::runner::ProcessRunner;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // the config file may carry a log level, so it is read before logging starts
    let file_config = match cli.config.as_deref().map(CliConfig::from_file).transpose() {
        Ok(config) => config,
        Err(e) => {
            init_logger(cli.verbose, cli.quiet, None);
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let level = file_config
        .as_ref()
        .and_then(|c| c.cli_options.log_level.clone());
    init_logger(cli.verbose, cli.quiet, level.as_deref());

    match dispatch(cli, file_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli, file_config: Option<CliConfig>) -> Result<()> {
    let output_format = file_config
        .as_ref()
        .and_then(|c| c.cli_options.output_format)
        .filter(|_| cli.output_format == OutputFormat::Human)
        .unwrap_or(cli.output_format);

    match cli.command {
        Commands::Run {
            input,
            work_dir,
            scalar_vars,
            wind,
            level_dimension,
            latitude_dimension,
            nco_bin_dir,
            scripts_dir,
            dry_run,
            keep_temp,
            skip_preflight,
        } => {
            let overrides = RunOverrides {
                input,
                work_dir,
                scalar_vars,
                wind,
                level_dimension,
                latitude_dimension,
                nco_bin_dir,
                scripts_dir,
                keep_temp,
            };
            let source = cli
                .config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "command line".to_string());
            let config = build_cli_config(file_config, &overrides)
                .context("Invalid job configuration")?;
            let options = RunOptions {
                dry_run,
                keep_temp,
                skip_preflight,
                show_progress: !cli.quiet && config.cli_options.progress.unwrap_or(true),
            };
            run(&config.job, &options, &source, output_format, cli.quiet)
        }
        Commands::Validate {
            config_file,
            detailed,
        } => {
            let job = match config_file {
                Some(path) => JobConfig::from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => match file_config {
                    Some(config) => config.job,
                    None => bail!("No configuration given; pass a file or --config"),
                },
            };
            validate(&job, detailed)
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let required = file_config
                .map(|c| c.job.required_variables())
                .unwrap_or_else(|| JobConfig::new(&file).required_variables());
            let info = get_netcdf_info(&file, variable.as_deref(), detailed, &required)?;
            match format.unwrap_or(output_format) {
                OutputFormat::Human => print_file_info_human(&info),
                OutputFormat::Json => print_file_info_json(&info)?,
                OutputFormat::Yaml => print_file_info_yaml(&info)?,
            }
            Ok(())
        }
        Commands::Clean {
            dir,
            pattern,
            dry_run,
        } => clean(&dir, &pattern, dry_run),
        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let rendered = render_template(&template_type, &format)?;
            write_or_print(output.as_deref(), rendered.as_bytes())
        }
        Commands::Completions { shell, output } => {
            let mut buffer = Vec::new();
            clap_complete::generate(shell, &mut Cli::command(), "nc2wind", &mut buffer);
            write_or_print(output.as_deref(), &buffer)
        }
    }
}

fn run(
    config: &JobConfig,
    options: &RunOptions,
    source: &str,
    output_format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let human = output_format == OutputFormat::Human && !quiet;

    if human {
        show_greeting(source);
        config_echo(config);
    }
    if options.dry_run && human {
        show_plan(&Pipeline::from_config(config));
    }

    let runner = ProcessRunner::new(config.tools.clone());
    let report = process_pipeline_job(config, &runner, options)?;
    print_report(&report, output_format, quiet)?;

    if human && !options.dry_run {
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

fn print_report(report: &RunReport, output_format: OutputFormat, quiet: bool) -> Result<()> {
    match output_format {
        OutputFormat::Human => {
            if !quiet && !report.dry_run {
                show_report(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(report)?),
    }
    Ok(())
}

fn validate(config: &JobConfig, detailed: bool) -> Result<()> {
    let mut problems = Vec::new();

    match config.validate() {
        Ok(()) => info!("Configuration is valid"),
        Err(e) => problems.push(e.to_string()),
    }

    for tool in Tool::ALL {
        match config.tools.locate(tool) {
            Some(path) => debug!("{} -> {}", tool, path.display()),
            None => problems.push(format!(
                "{} not found (looked for {})",
                tool,
                config.tools.resolve(tool).display()
            )),
        }
    }

    for script in config.scripts() {
        if !script.is_file() {
            problems.push(format!("script {} not found", script.display()));
        }
    }

    if config.input.is_file() {
        let info = get_netcdf_info(&config.input, None, false, &config.required_variables())?;
        for name in info.missing_required() {
            problems.push(format!(
                "variable {} missing from {}",
                name,
                config.input.display()
            ));
        }
    } else if !config.input.as_os_str().is_empty() {
        problems.push(format!("input {} not found", config.input.display()));
    }

    if detailed {
        println!("Validation report:");
        println!("  Input: {}", config.input.display());
        println!("  Working directory: {}", config.working_directory().display());
        println!("  Required variables: {}", config.required_variables().join(", "));
        for tool in Tool::ALL {
            println!("  {}: {}", tool, config.tools.resolve(tool).display());
        }
        for script in config.scripts() {
            println!("  Script: {}", script.display());
        }
    }

    if problems.is_empty() {
        println!("Validation passed");
        Ok(())
    } else {
        for problem in &problems {
            warn!("{}", problem);
        }
        bail!("Validation failed with {} problem(s)", problems.len())
    }
}

fn clean(dir: &Path, pattern: &TempPattern, dry_run: bool) -> Result<()> {
    let files: Vec<PathBuf> = if dry_run {
        find_temp_files(dir, pattern)?
    } else {
        remove_temp_files(dir, pattern)?
    };
    let verb = if dry_run { "Would remove" } else { "Removed" };
    for file in &files {
        println!("{} {}", verb, file.display());
    }
    info!("{} {} file(s) matching {} in {}", verb, files.len(), pattern, dir.display());
    Ok(())
}

fn write_or_print(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(content)?,
    }
    Ok(())
}
