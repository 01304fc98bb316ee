//! # NetCDF File Information Module
//!
//! Inspects NetCDF files: dimensions, variables, attributes and, for pipeline
//! inputs, which of the required variables are present. The same inspection backs
//! the preflight check that stops a run before any NCO tool is spawned.

use crate::error::{PipelineError, PipelineResult};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfDimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfVariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shape: Vec<usize>,
}

/// Whether a variable the pipeline needs is in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredVariableStatus {
    pub name: String,
    pub present: bool,
}

/// Complete information about a NetCDF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfInfo {
    pub path: String,
    pub dimensions: Vec<NetCdfDimensionInfo>,
    pub variables: Vec<NetCdfVariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub total_dimensions: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<RequiredVariableStatus>,
}

impl NetCdfInfo {
    /// Names of required variables the file does not contain.
    pub fn missing_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|r| !r.present)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Extract information from a NetCDF file.
///
/// * `variable` - restrict the variable listing to one name
/// * `detailed` - include global attributes
/// * `required` - variable names to report as present or missing
pub fn get_netcdf_info(
    file_path: &Path,
    variable: Option<&str>,
    detailed: bool,
    required: &[String],
) -> Result<NetCdfInfo> {
    debug!("Opening NetCDF file: {}", file_path.display());
    let file = netcdf::open(file_path)
        .with_context(|| format!("Failed to open NetCDF file: {}", file_path.display()))?;

    let file_size = std::fs::metadata(file_path).ok().map(|m| m.len());

    let dimensions: Vec<NetCdfDimensionInfo> = file
        .dimensions()
        .map(|dim| NetCdfDimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut all_names = HashSet::new();
    let mut variables = Vec::new();
    for var in file.variables() {
        all_names.insert(var.name().to_string());
        if let Some(var_name) = variable
            && var.name() != var_name
        {
            continue;
        }

        let mut attributes = BTreeMap::new();
        for attr in var.attributes() {
            if let Ok(value) = attr.value() {
                attributes.insert(attr.name().to_string(), format!("{:?}", value));
            }
        }

        variables.push(NetCdfVariableInfo {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var
                .dimensions()
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
            attributes,
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
        });
    }

    let mut global_attributes = BTreeMap::new();
    if detailed {
        for attr in file.attributes() {
            if let Ok(value) = attr.value() {
                global_attributes.insert(attr.name().to_string(), format!("{:?}", value));
            }
        }
    }

    file.close().context("Failed to close NetCDF file")?;

    let required = required
        .iter()
        .map(|name| RequiredVariableStatus {
            name: name.clone(),
            present: all_names.contains(name),
        })
        .collect();

    Ok(NetCdfInfo {
        path: file_path.display().to_string(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        global_attributes,
        file_size,
        required,
    })
}

/// Fails with `MissingVariables` naming every required variable absent from the file.
pub fn check_required_variables(file_path: &Path, required: &[String]) -> PipelineResult<()> {
    let file = netcdf::open(file_path)?;
    let missing: Vec<String> = required
        .iter()
        .filter(|name| file.variable(name).is_none())
        .cloned()
        .collect();
    file.close()?;

    if missing.is_empty() {
        debug!(
            "Preflight: all {} required variables present in {}",
            required.len(),
            file_path.display()
        );
        Ok(())
    } else {
        Err(PipelineError::MissingVariables {
            path: file_path.to_path_buf(),
            missing,
        })
    }
}

/// Print NetCDF info in human-readable format
pub fn print_file_info_human(info: &NetCdfInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.total_dimensions);
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.total_variables);
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}]",
            var.name,
            var.data_type,
            var.dimensions.join(", ")
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
    if !info.required.is_empty() {
        println!("  Pipeline variables:");
        for status in &info.required {
            println!(
                "    [{}] {}",
                if status.present { "ok" } else { "missing" },
                status.name
            );
        }
    }
}

/// Print NetCDF info in JSON format
pub fn print_file_info_json(info: &NetCdfInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print NetCDF info in YAML format
pub fn print_file_info_yaml(info: &NetCdfInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize NetCDF info to YAML")?;
    println!("{}", yaml);
    Ok(())
}
