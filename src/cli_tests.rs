//! # CLI Integration Tests
//!
//! Argument parsing for every subcommand, environment variable fallbacks and
//! flag conflicts.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::cleanup::TempPattern;
    use crate::cli::{
        Cli, Commands, ConfigFormat, OutputFormat, RunOverrides, TemplateType, build_cli_config,
    };

    // clap reads NC2WIND_* variables, so tests that set or rely on their absence serialize here
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["nc2wind", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Extract, scale and restructure NetCDF fields"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["nc2wind", "--version"]);
        assert!(result.is_err());
    }

    /// Test global flags
    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "nc2wind",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/job.yaml",
            "template",
            "basic",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/job.yaml")));
    }

    #[test]
    fn test_run_command_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cli = Cli::parse_from(["nc2wind", "run", "input.nc"]);

        if let Commands::Run {
            input,
            work_dir,
            scalar_vars,
            wind,
            dry_run,
            keep_temp,
            skip_preflight,
            ..
        } = &cli.command
        {
            assert_eq!(input, &Some(PathBuf::from("input.nc")));
            assert!(work_dir.is_none());
            assert!(scalar_vars.is_none());
            assert!(wind.is_none());
            assert!(!dry_run);
            assert!(!keep_temp);
            assert!(!skip_preflight);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_run_command_with_options() {
        let cli = Cli::parse_from([
            "nc2wind",
            "run",
            "/data/gfs.nc",
            "--work-dir",
            "/scratch/run1",
            "--scalar-vars",
            "TMP_surface,PRES_surface",
            "--wind",
            "UGRD_10m:u10,VGRD_10m:v10",
            "--level-dim",
            "height",
            "--lat-dim",
            "latitude",
            "--nco-bin-dir",
            "/opt/conda/bin",
            "--scripts-dir",
            "/opt/nc2wind",
            "--dry-run",
            "--keep-temp",
            "--skip-preflight",
        ]);

        if let Commands::Run {
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
        } = &cli.command
        {
            assert_eq!(input, &Some(PathBuf::from("/data/gfs.nc")));
            assert_eq!(work_dir, &Some(PathBuf::from("/scratch/run1")));
            assert_eq!(
                scalar_vars.as_ref().map(|v| v.0.clone()),
                Some(vec!["TMP_surface".to_string(), "PRES_surface".to_string()])
            );
            let wind = wind.as_ref().expect("wind pair");
            assert_eq!(wind.u_variable, "UGRD_10m");
            assert_eq!(wind.u_alias.as_deref(), Some("u10"));
            assert_eq!(wind.v_variable, "VGRD_10m");
            assert_eq!(level_dimension.as_deref(), Some("height"));
            assert_eq!(latitude_dimension.as_deref(), Some("latitude"));
            assert_eq!(nco_bin_dir, &Some(PathBuf::from("/opt/conda/bin")));
            assert_eq!(scripts_dir, &Some(PathBuf::from("/opt/nc2wind")));
            assert!(dry_run);
            assert!(keep_temp);
            assert!(skip_preflight);
        } else {
            panic!("Expected Run command");
        }
    }

    /// Test invalid variable arguments
    #[test]
    fn test_invalid_run_arguments() {
        let result = Cli::try_parse_from(["nc2wind", "run", "in.nc", "--scalar-vars", "a,,b"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["nc2wind", "run", "in.nc", "--wind", "only_u"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["nc2wind", "run", "in.nc", "--wind", "u:,v"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_clean_command() {
        let cli = Cli::parse_from(["nc2wind", "clean", "/data/run1"]);
        if let Commands::Clean { dir, pattern, dry_run } = &cli.command {
            assert_eq!(dir, &PathBuf::from("/data/run1"));
            assert_eq!(pattern, &TempPattern::default());
            assert!(!dry_run);
        } else {
            panic!("Expected Clean command");
        }

        let cli = Cli::parse_from(["nc2wind", "clean", ".", "--pattern", "tmp_*.nc", "--dry-run"]);
        if let Commands::Clean { pattern, dry_run, .. } = &cli.command {
            assert!(pattern.matches("tmp_wind.nc"));
            assert!(!pattern.matches("tempWind.nc"));
            assert!(dry_run);
        } else {
            panic!("Expected Clean command");
        }

        let result = Cli::try_parse_from(["nc2wind", "clean", ".", "--pattern", "../temp*.nc"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["nc2wind", "clean", ".", "--pattern", "*"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from([
            "nc2wind", "info", "input.nc", "--detailed", "-n", "TMP_surface", "--format", "yaml",
        ]);
        if let Commands::Info {
            file,
            detailed,
            variable,
            format,
        } = &cli.command
        {
            assert_eq!(file, &PathBuf::from("input.nc"));
            assert!(detailed);
            assert_eq!(variable.as_deref(), Some("TMP_surface"));
            assert_eq!(format, &Some(OutputFormat::Yaml));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["nc2wind", "validate", "job.json", "--detailed"]);
        if let Commands::Validate {
            config_file,
            detailed,
        } = &cli.command
        {
            assert_eq!(config_file, &Some(PathBuf::from("job.json")));
            assert!(detailed);
        } else {
            panic!("Expected Validate command");
        }
    }

    /// Test template type enum
    #[test]
    fn test_template_types() {
        for (name, expected) in [("basic", TemplateType::Basic), ("full", TemplateType::Full)] {
            let cli = Cli::parse_from(["nc2wind", "template", name, "--format", "yaml"]);
            if let Commands::Template {
                template_type,
                format,
                output,
            } = &cli.command
            {
                assert_eq!(template_type, &expected);
                assert_eq!(format, &ConfigFormat::Yaml);
                assert!(output.is_none());
            } else {
                panic!("Expected Template command");
            }
        }

        assert!(Cli::try_parse_from(["nc2wind", "template", "s3"]).is_err());
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["nc2wind", "completions", "bash", "-o", "nc2wind.bash"]);
        if let Commands::Completions { shell, output } = &cli.command {
            assert_eq!(*shell, clap_complete::Shell::Bash);
            assert_eq!(output, &Some(PathBuf::from("nc2wind.bash")));
        } else {
            panic!("Expected Completions command");
        }
    }

    /// Test environment variable handling
    #[test]
    fn test_environment_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("NC2WIND_INPUT", "/env/input.nc");
            std::env::set_var("NC2WIND_WIND_VARS", "UGRD_10m,VGRD_10m");
            std::env::set_var("NC2WIND_NCO_BIN_DIR", "/env/nco/bin");
        }

        let cli = Cli::parse_from(["nc2wind", "run"]);

        unsafe {
            std::env::remove_var("NC2WIND_INPUT");
            std::env::remove_var("NC2WIND_WIND_VARS");
            std::env::remove_var("NC2WIND_NCO_BIN_DIR");
        }

        if let Commands::Run {
            input,
            wind,
            nco_bin_dir,
            ..
        } = &cli.command
        {
            assert_eq!(input, &Some(PathBuf::from("/env/input.nc")));
            assert_eq!(wind.as_ref().map(|w| w.u_variable.as_str()), Some("UGRD_10m"));
            assert_eq!(nco_bin_dir, &Some(PathBuf::from("/env/nco/bin")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_command_line_wins_over_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("NC2WIND_INPUT", "/env/input.nc");
        }
        let cli = Cli::parse_from(["nc2wind", "run", "/cli/input.nc"]);
        unsafe {
            std::env::remove_var("NC2WIND_INPUT");
        }

        if let Commands::Run { input, .. } = &cli.command {
            assert_eq!(input, &Some(PathBuf::from("/cli/input.nc")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_parsed_run_builds_job() {
        let cli = Cli::parse_from([
            "nc2wind",
            "run",
            "/data/run1/input.nc",
            "--scalar-vars",
            "TMP_surface",
            "--lat-dim",
            "latitude",
        ]);
        let Commands::Run {
            input,
            scalar_vars,
            latitude_dimension,
            ..
        } = cli.command
        else {
            panic!("Expected Run command");
        };

        let overrides = RunOverrides {
            input,
            scalar_vars,
            latitude_dimension,
            ..Default::default()
        };
        let config = build_cli_config(None, &overrides).unwrap();
        assert_eq!(config.job.scalar.variables, vec!["TMP_surface"]);
        assert_eq!(config.job.wind.latitude_dimension, "latitude");
        assert_eq!(config.job.working_directory(), PathBuf::from("/data/run1"));
    }

    #[test]
    fn test_output_format_values() {
        for (name, expected) in [
            ("human", OutputFormat::Human),
            ("json", OutputFormat::Json),
            ("yaml", OutputFormat::Yaml),
        ] {
            let cli = Cli::parse_from(["nc2wind", "--output-format", name, "template", "basic"]);
            assert_eq!(cli.output_format, expected);
        }
        let args = ["nc2wind", "--output-format", "csv", "template", "basic"];
        let result = Cli::try_parse_from(args);
        assert!(result.is_err());
    }

    /// Test conflicting verbose and quiet flags
    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["nc2wind", "--verbose", "--quiet", "info", "test.nc"]);
        assert!(result.is_err());

        let cli_quiet = Cli::parse_from(["nc2wind", "--quiet", "info", "test.nc"]);
        assert!(!cli_quiet.verbose);
        assert!(cli_quiet.quiet);
    }
}
