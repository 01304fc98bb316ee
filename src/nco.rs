//! # NCO Command Vocabulary
//!
//! Builders for the NCO (NetCDF Operators) invocations the pipeline uses. Each
//! builder produces a [`ToolInvocation`] with a fixed flag set; only file paths
//! and variable or dimension names are interpolated.
//!
//! | Builder                   | Command                                  |
//! |---------------------------|------------------------------------------|
//! | [`select_variables`]      | `ncks -v a,b,c IN OUT`                   |
//! | [`apply_script`]          | `ncap2 [-3] -S SCRIPT IN OUT`            |
//! | [`rename_variables`]      | `ncrename -v old,new [-v ...] IN OUT`    |
//! | [`make_record_dimension`] | `ncecat -u DIM IN OUT`                   |
//! | [`fix_record_dimension`]  | `ncks --no_rec_dmn DIM IN OUT`           |
//! | [`reverse_dimension`]     | `ncpdq -a -DIM IN OUT`                   |

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// The NCO binaries the pipeline knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// NetCDF Kitchen Sink: subsetting and dimension edits
    Ncks,
    /// NetCDF Arithmetic Processor: runs `.nco` scripts
    Ncap2,
    /// NetCDF Ensemble Concatenator: adds a record dimension
    Ncecat,
    /// Renames variables, dimensions and attributes
    Ncrename,
    /// NetCDF Permute Dimensions Quickly: reorders and reverses axes
    Ncpdq,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Ncks,
        Tool::Ncap2,
        Tool::Ncecat,
        Tool::Ncrename,
        Tool::Ncpdq,
    ];

    /// Executable name as installed by NCO
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Ncks => "ncks",
            Tool::Ncap2 => "ncap2",
            Tool::Ncecat => "ncecat",
            Tool::Ncrename => "ncrename",
            Tool::Ncpdq => "ncpdq",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// A single NCO call: which tool, its full argument list, and the file it produces.
///
/// The output path is always the last argument; it is kept separately so the
/// pipeline can report and check it without re-parsing `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<OsString>,
    pub output: PathBuf,
}

impl ToolInvocation {
    fn new(tool: Tool, mut args: Vec<OsString>, input: &Path, output: &Path) -> Self {
        args.push(input.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        Self {
            tool,
            args,
            output: output.to_path_buf(),
        }
    }

    /// Renders the invocation as a shell-like command line, for logs and dry runs.
    pub fn command_line(&self) -> String {
        let mut line = self.tool.binary_name().to_string();
        for arg in &self.args {
            line.push(' ');
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    /// Arguments as lossy UTF-8 strings; convenient for assertions and reports.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// `ncks -v a,b,c IN OUT`: copy only the named variables.
pub fn select_variables<S: AsRef<str>>(
    variables: &[S],
    input: &Path,
    output: &Path,
) -> ToolInvocation {
    let list = variables
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join(",");
    ToolInvocation::new(Tool::Ncks, vec!["-v".into(), list.into()], input, output)
}

/// `ncap2 [-3] -S SCRIPT IN OUT`: run an NCO arithmetic script.
///
/// `netcdf3` requests classic netCDF3 output.
pub fn apply_script(script: &Path, netcdf3: bool, input: &Path, output: &Path) -> ToolInvocation {
    let mut args: Vec<OsString> = Vec::with_capacity(3);
    if netcdf3 {
        args.push("-3".into());
    }
    args.push("-S".into());
    args.push(script.as_os_str().to_owned());
    ToolInvocation::new(Tool::Ncap2, args, input, output)
}

/// `ncrename -v old,new [-v old,new ...] IN OUT`
pub fn rename_variables(renames: &[(&str, &str)], input: &Path, output: &Path) -> ToolInvocation {
    let mut args: Vec<OsString> = Vec::with_capacity(renames.len() * 2);
    for (from, to) in renames {
        args.push("-v".into());
        args.push(format!("{},{}", from, to).into());
    }
    ToolInvocation::new(Tool::Ncrename, args, input, output)
}

/// `ncecat -u DIM IN OUT`: wrap the file in a new record (unlimited) dimension.
pub fn make_record_dimension(dimension: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        Tool::Ncecat,
        vec!["-u".into(), dimension.into()],
        input,
        output,
    )
}

/// `ncks --no_rec_dmn DIM IN OUT`: turn a record dimension back into a fixed one.
pub fn fix_record_dimension(dimension: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        Tool::Ncks,
        vec!["--no_rec_dmn".into(), dimension.into()],
        input,
        output,
    )
}

/// `ncpdq -a -DIM IN OUT`: reverse the storage order of one axis.
pub fn reverse_dimension(dimension: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        Tool::Ncpdq,
        vec!["-a".into(), format!("-{}", dimension).into()],
        input,
        output,
    )
}
