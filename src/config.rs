//! # Job Configuration Module
//!
//! Configuration parsing and validation for nc2wind jobs. A job names the input
//! NetCDF file and, optionally, everything the pipeline would otherwise take from
//! its built-in defaults: the scalar and wind variable lists, the rename targets,
//! the dimension names, the `.nco` scripts and the location of the NCO binaries.
//!
//! Configuration files may be JSON or YAML and every field is optional; `input`
//! must be set by the time the job is validated.
//!
//! ## Example
//!
//! ```rust
//! use nc2wind::config::JobConfig;
//!
//! let json = r#"
//! {
//!   "input": "/data/run1/input.nc",
//!   "wind": { "latitude_dimension": "latitude" }
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.wind.u_alias, "U");
//! assert_eq!(config.working_directory(), std::path::PathBuf::from("/data/run1"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cleanup::TempPattern;
use crate::error::{PipelineError, PipelineResult};
use crate::nco::Tool;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SCALAR_VARIABLES: [&str; 4] = [
    "PWAT_entireatmosphere_consideredasasinglelayer_",
    "PRES_surface",
    "TMP_surface",
    "GUST_surface",
];
pub const DEFAULT_U_VARIABLE: &str = "UGRD_planetaryboundarylayer";
pub const DEFAULT_V_VARIABLE: &str = "VGRD_planetaryboundarylayer";

/// Main configuration structure for nc2wind jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Path to the input NetCDF file; may be left out of a file and given on the command line
    #[serde(default)]
    pub input: PathBuf,
    /// Directory for intermediate and output files; defaults to the input's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub scalar: ScalarStageConfig,
    #[serde(default)]
    pub wind: WindStageConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Check that every required variable exists before running any tool
    #[serde(default = "default_true")]
    pub preflight: bool,
    /// Leave `temp*.nc` files behind for debugging
    #[serde(default)]
    pub keep_temp: bool,
}

/// Scalar extraction and scaling stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarStageConfig {
    /// Variables copied out of the input before scaling
    pub variables: Vec<String>,
    /// `ncap2` script applying the unit scaling
    pub script: PathBuf,
    /// File name of the scaled product, relative to the working directory
    pub output: String,
}

/// Wind extraction and restructuring stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindStageConfig {
    pub u_variable: String,
    pub v_variable: String,
    /// Name the U component is renamed to
    pub u_alias: String,
    /// Name the V component is renamed to
    pub v_alias: String,
    /// Synthetic vertical dimension created by the define-level script
    pub level_dimension: String,
    /// Latitude dimension whose order is reversed
    pub latitude_dimension: String,
    pub define_level_script: PathBuf,
    pub min_max_script: PathBuf,
    /// File name of the wind product, relative to the working directory
    pub output: String,
}

/// Where to find the NCO binaries.
///
/// Resolution order: per-tool override, then `bin_dir/<name>`, then the bare
/// name (looked up on `PATH` at spawn time).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<Tool, PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for ScalarStageConfig {
    fn default() -> Self {
        Self {
            variables: DEFAULT_SCALAR_VARIABLES.iter().map(|s| s.to_string()).collect(),
            script: PathBuf::from("scale.nco"),
            output: "scaled.nc".to_string(),
        }
    }
}

impl Default for WindStageConfig {
    fn default() -> Self {
        Self {
            u_variable: DEFAULT_U_VARIABLE.to_string(),
            v_variable: DEFAULT_V_VARIABLE.to_string(),
            u_alias: "U".to_string(),
            v_alias: "V".to_string(),
            level_dimension: "lev".to_string(),
            latitude_dimension: "lat".to_string(),
            define_level_script: PathBuf::from("defineLev.nco"),
            min_max_script: PathBuf::from("getMinMax.nco"),
            output: "uv.nc".to_string(),
        }
    }
}

impl ToolsConfig {
    /// Program path used to spawn `tool`.
    pub fn resolve(&self, tool: Tool) -> PathBuf {
        if let Some(path) = self.overrides.get(&tool) {
            return path.clone();
        }
        match &self.bin_dir {
            Some(dir) => dir.join(tool.binary_name()),
            None => PathBuf::from(tool.binary_name()),
        }
    }

    /// Finds the executable that would be spawned for `tool`, searching `PATH`
    /// when the resolved program is a bare name.
    pub fn locate(&self, tool: Tool) -> Option<PathBuf> {
        let program = self.resolve(tool);
        if program.components().count() > 1 {
            return program.is_file().then_some(program);
        }
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(&program))
            .find(|candidate| candidate.is_file())
    }
}

impl JobConfig {
    /// Creates a configuration with default stages for the given input file.
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            work_dir: None,
            scalar: ScalarStageConfig::default(),
            wind: WindStageConfig::default(),
            tools: ToolsConfig::default(),
            preflight: true,
            keep_temp: false,
        }
    }

    /// Loads a job configuration from a JSON or YAML file.
    ///
    /// `.yaml`/`.yml` files are parsed as YAML and `.json` as JSON; any other
    /// extension is tried as JSON first, then YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => Self::from_json(&content).or_else(|_| Self::from_yaml(&content)),
        }
    }

    pub fn from_json(json_str: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> PipelineResult<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> PipelineResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Directory holding the intermediate and output files.
    ///
    /// An explicit `work_dir` wins; otherwise the input's parent directory, or
    /// `.` when the input path has no directory component.
    pub fn working_directory(&self) -> PathBuf {
        if let Some(dir) = &self.work_dir {
            return dir.clone();
        }
        match self.input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Scalar variables followed by the wind pair, in pipeline order.
    pub fn required_variables(&self) -> Vec<String> {
        let mut vars = self.scalar.variables.clone();
        vars.push(self.wind.u_variable.clone());
        vars.push(self.wind.v_variable.clone());
        vars
    }

    /// Points all three `.nco` scripts at `dir`, keeping their file names.
    pub fn set_scripts_dir(&mut self, dir: &Path) {
        for script in [
            &mut self.scalar.script,
            &mut self.wind.define_level_script,
            &mut self.wind.min_max_script,
        ] {
            let name = script.file_name().map(|n| n.to_os_string());
            if let Some(name) = name {
                *script = dir.join(name);
            }
        }
    }

    /// The three `.nco` scripts in the order the pipeline uses them.
    pub fn scripts(&self) -> [&Path; 3] {
        [
            self.scalar.script.as_path(),
            self.wind.define_level_script.as_path(),
            self.wind.min_max_script.as_path(),
        ]
    }

    /// Checks the configuration for errors that would only surface mid-run.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(PipelineError::Config("input path is empty".to_string()));
        }
        if self.scalar.variables.is_empty() {
            return Err(PipelineError::Config(
                "scalar.variables must name at least one variable".to_string(),
            ));
        }

        let names = [
            ("wind.u_variable", &self.wind.u_variable),
            ("wind.v_variable", &self.wind.v_variable),
            ("wind.u_alias", &self.wind.u_alias),
            ("wind.v_alias", &self.wind.v_alias),
            ("wind.level_dimension", &self.wind.level_dimension),
            ("wind.latitude_dimension", &self.wind.latitude_dimension),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!("{} is empty", field)));
            }
        }
        for name in self.required_variables() {
            if name.trim().is_empty() || name.contains(',') {
                return Err(PipelineError::Config(format!(
                    "invalid variable name '{}'",
                    name
                )));
            }
        }

        let mut seen = HashSet::new();
        for name in self.required_variables() {
            if !seen.insert(name.clone()) {
                return Err(PipelineError::Config(format!(
                    "variable '{}' is listed more than once",
                    name
                )));
            }
        }
        if self.wind.u_alias == self.wind.v_alias {
            return Err(PipelineError::Config(format!(
                "wind aliases must differ, both are '{}'",
                self.wind.u_alias
            )));
        }

        let pattern = TempPattern::default();
        let input_in_work_dir = self.input_directory_is_work_dir();
        if let Some(name) = self.input.file_name()
            && pattern.matches(&name.to_string_lossy())
            && input_in_work_dir
        {
            return Err(PipelineError::Config(format!(
                "input '{}' matches the temp pattern '{}' and would be deleted by cleanup; \
                 rename it or set work_dir to another directory",
                self.input.display(),
                pattern
            )));
        }

        let outputs = [
            ("scalar.output", &self.scalar.output),
            ("wind.output", &self.wind.output),
        ];
        for (field, output) in outputs {
            if output.is_empty() || output.contains('/') || output.contains('\\') {
                return Err(PipelineError::Config(format!(
                    "{} must be a plain file name, got '{}'",
                    field, output
                )));
            }
            if pattern.matches(output) {
                return Err(PipelineError::Config(format!(
                    "{} '{}' matches the temp pattern '{}' and would be deleted by cleanup",
                    field, output, pattern
                )));
            }
            if self.input.file_name().is_some_and(|n| n == output.as_str()) && input_in_work_dir {
                return Err(PipelineError::Config(format!(
                    "{} '{}' would overwrite the input file",
                    field, output
                )));
            }
        }
        if self.scalar.output == self.wind.output {
            return Err(PipelineError::Config(format!(
                "scalar.output and wind.output are both '{}'",
                self.scalar.output
            )));
        }

        Ok(())
    }

    /// Whether the input lives in the working directory, comparing canonical
    /// paths when both directories exist.
    fn input_directory_is_work_dir(&self) -> bool {
        let Some(work_dir) = &self.work_dir else {
            return true;
        };
        let input_dir = match self.input.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match (fs::canonicalize(&input_dir), fs::canonicalize(work_dir)) {
            (Ok(a), Ok(b)) => a == b,
            _ => *work_dir == input_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_standard_fields() {
        let config = JobConfig::new("/data/run1/input.nc");
        assert_eq!(
            config.required_variables(),
            vec![
                "PWAT_entireatmosphere_consideredasasinglelayer_",
                "PRES_surface",
                "TMP_surface",
                "GUST_surface",
                "UGRD_planetaryboundarylayer",
                "VGRD_planetaryboundarylayer",
            ]
        );
        assert_eq!(config.scalar.output, "scaled.nc");
        assert_eq!(config.wind.output, "uv.nc");
        assert!(config.preflight);
        assert!(!config.keep_temp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_working_directory_derivation() {
        assert_eq!(
            JobConfig::new("/data/run1/input.nc").working_directory(),
            PathBuf::from("/data/run1")
        );
        assert_eq!(
            JobConfig::new("input.nc").working_directory(),
            PathBuf::from(".")
        );

        let mut config = JobConfig::new("/data/run1/input.nc");
        config.work_dir = Some(PathBuf::from("/scratch"));
        assert_eq!(config.working_directory(), PathBuf::from("/scratch"));
    }

    #[test]
    fn test_minimal_json_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = JobConfig::from_json(r#"{ "input": "input.nc" }"#)?;
        assert_eq!(config, JobConfig::new("input.nc"));
        Ok(())
    }

    #[test]
    fn test_partial_stage_overrides() -> Result<(), Box<dyn std::error::Error>> {
        let yaml = r#"
input: /data/gfs.nc
scalar:
  variables: [TMP_surface]
wind:
  latitude_dimension: latitude
tools:
  bin_dir: /opt/conda/bin
  overrides:
    ncap2: /usr/local/bin/ncap2
"#;
        let config = JobConfig::from_yaml(yaml)?;
        assert_eq!(config.scalar.variables, vec!["TMP_surface"]);
        assert_eq!(config.scalar.script, PathBuf::from("scale.nco"));
        assert_eq!(config.wind.latitude_dimension, "latitude");
        assert_eq!(config.wind.level_dimension, "lev");
        assert_eq!(
            config.tools.resolve(Tool::Ncks),
            PathBuf::from("/opt/conda/bin/ncks")
        );
        assert_eq!(
            config.tools.resolve(Tool::Ncap2),
            PathBuf::from("/usr/local/bin/ncap2")
        );
        Ok(())
    }

    #[test]
    fn test_json_yaml_conversion_preserves_config() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = JobConfig::new("/data/in.nc");
        config.keep_temp = true;
        config.tools.overrides.insert(Tool::Ncpdq, PathBuf::from("/bin/ncpdq"));

        assert_eq!(JobConfig::from_json(&config.to_json()?)?, config);
        assert_eq!(JobConfig::from_yaml(&config.to_yaml()?)?, config);
        Ok(())
    }

    #[test]
    fn test_from_file_by_extension() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let yaml_path = dir.path().join("job.yml");
        fs::write(&yaml_path, "input: a.nc\nkeep_temp: true\n")?;
        let config = JobConfig::from_file(&yaml_path)?;
        assert!(config.keep_temp);

        let other_path = dir.path().join("job.conf");
        fs::write(&other_path, "input: b.nc\n")?;
        assert_eq!(JobConfig::from_file(&other_path)?.input, PathBuf::from("b.nc"));

        assert!(JobConfig::from_file(dir.path().join("missing.json")).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_input_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let config = JobConfig::from_json(r#"{ "keep_temp": true }"#)?;
        assert!(config.input.as_os_str().is_empty());
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
        Ok(())
    }

    #[test]
    fn test_set_scripts_dir() {
        let mut config = JobConfig::new("input.nc");
        config.set_scripts_dir(Path::new("/opt/nco-scripts"));
        assert_eq!(
            config.scripts(),
            [
                Path::new("/opt/nco-scripts/scale.nco"),
                Path::new("/opt/nco-scripts/defineLev.nco"),
                Path::new("/opt/nco-scripts/getMinMax.nco"),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut config = JobConfig::new("input.nc");
        config.scalar.variables.clear();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        let mut config = JobConfig::new("input.nc");
        config.wind.v_alias = "U".to_string();
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("input.nc");
        config.scalar.variables.push(DEFAULT_U_VARIABLE.to_string());
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("input.nc");
        config.scalar.output = "tempScaled.nc".to_string();
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("input.nc");
        config.wind.output = "out/uv.nc".to_string();
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("input.nc");
        config.wind.output = "scaled.nc".to_string();
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("/data/uv.nc");
        assert!(config.validate().is_err());
        config.work_dir = Some(PathBuf::from("/elsewhere"));
        assert!(config.validate().is_ok());

        let mut config = JobConfig::new("input.nc");
        config.wind.level_dimension = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("input.nc");
        config.scalar.variables = vec!["A,B".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_temp_named_input_in_work_dir() {
        for name in ["temperature.nc", "temp_2024.nc"] {
            let config = JobConfig::new(format!("/data/run1/{}", name));
            assert!(matches!(config.validate(), Err(PipelineError::Config(_))), "{}", name);
        }

        let mut config = JobConfig::new("/data/run1/temperature.nc");
        config.work_dir = Some(PathBuf::from("/scratch/run1"));
        assert!(config.validate().is_ok());

        // only *.nc names are swept
        assert!(JobConfig::new("/data/run1/temperature.grib2.nc4").validate().is_ok());
    }

    #[test]
    fn test_same_directory_detected_across_relative_and_absolute_paths()
    -> Result<(), Box<dyn std::error::Error>> {
        let cwd = env::current_dir()?;

        let mut config = JobConfig::new("uv.nc");
        config.work_dir = Some(cwd.clone());
        assert!(config.validate().is_err());

        let mut config = JobConfig::new("temperature.nc");
        config.work_dir = Some(cwd.join("."));
        assert!(config.validate().is_err());

        let dir = tempfile::tempdir()?;
        let mut config = JobConfig::new("uv.nc");
        config.work_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_locate_with_explicit_override() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let fake = dir.path().join("ncks");
        fs::write(&fake, "#!/bin/sh\n")?;

        let mut tools = ToolsConfig::default();
        tools.bin_dir = Some(dir.path().to_path_buf());
        assert_eq!(tools.locate(Tool::Ncks), Some(fake));
        assert_eq!(tools.locate(Tool::Ncpdq), None);
        Ok(())
    }
}
