//! # Pipeline Driver
//!
//! Builds and executes the fixed sequence of NCO invocations that turns one
//! gridded input file into the scalar (`scaled.nc`) and wind (`uv.nc`) products.
//!
//! ```text
//! input.nc ─ ncks -v SCALARS ─▶ tempScalar ─ ncap2 -3 -S scale.nco ─▶ tempScaled
//! input.nc ─ ncks -v U,V ─▶ tempWind ─ ncrename ─▶ tempUV ─ ncap2 -S defineLev.nco ─▶ tempLevDim
//!          ─ ncecat -u lev ─▶ tempRecDim ─ ncks --no_rec_dmn lev ─▶ tempFixDim
//!          ─ ncpdq -a -lat ─▶ tempInvDim ─ ncap2 -3 -S getMinMax.nco ─▶ tempUVFinal
//! tempScaled ─▶ scaled.nc, tempUVFinal ─▶ uv.nc   (only after every stage succeeded)
//! ```
//!
//! Products are written under temp names and renamed into place at the end, so
//! an aborted run never leaves a partial product behind, and a
//! [`TempFileGuard`] sweeps the intermediates whether the run succeeds or not.

use crate::cleanup::{
    TempFileGuard, TempPattern, find_temp_files, remove_temp_files, temp_file_name,
};
use crate::config::JobConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::nco::{
    Tool, ToolInvocation, apply_script, fix_record_dimension, make_record_dimension,
    rename_variables, reverse_dimension, select_variables,
};
use crate::runner::ToolRunner;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One step of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: &'static str,
    pub invocation: ToolInvocation,
}

/// A product staged under a temp name and its final location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub staged: PathBuf,
    pub target: PathBuf,
}

/// Runtime switches that do not change what the pipeline computes
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print nothing but the plan; no tool is spawned and no file touched
    pub dry_run: bool,
    /// Skip cleanup so the intermediates can be inspected
    pub keep_temp: bool,
    /// Skip the required-variable check on the input
    pub skip_preflight: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

/// Timing for one executed stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub tool: Tool,
    pub command: String,
    pub elapsed_ms: u128,
}

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub work_dir: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub stages: Vec<StageReport>,
    pub removed_temp_files: Vec<PathBuf>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// The ordered plan for one job
#[derive(Debug, Clone)]
pub struct Pipeline {
    input: PathBuf,
    work_dir: PathBuf,
    stages: Vec<Stage>,
    promotions: Vec<Promotion>,
    pattern: TempPattern,
}

impl Pipeline {
    /// Builds the stage sequence for `config`.
    ///
    /// The config is assumed valid; see [`JobConfig::validate`].
    pub fn from_config(config: &JobConfig) -> Self {
        let work_dir = config.working_directory();
        let input = config.input.clone();
        let tmp = |stem: &str| work_dir.join(temp_file_name(stem));

        let scalar = &config.scalar;
        let wind = &config.wind;

        let scalar_subset = tmp("Scalar");
        let scalar_staged = tmp("Scaled");
        let wind_subset = tmp("Wind");
        let renamed = tmp("UV");
        let with_level = tmp("LevDim");
        let record_dim = tmp("RecDim");
        let fixed_dim = tmp("FixDim");
        let inverted = tmp("InvDim");
        let wind_staged = tmp("UVFinal");

        let stages = vec![
            Stage {
                name: "extract scalar variables",
                invocation: select_variables(&scalar.variables, &input, &scalar_subset),
            },
            Stage {
                name: "scale scalar variables",
                invocation: apply_script(&scalar.script, true, &scalar_subset, &scalar_staged),
            },
            Stage {
                name: "extract wind variables",
                invocation: select_variables(
                    &[&wind.u_variable, &wind.v_variable],
                    &input,
                    &wind_subset,
                ),
            },
            Stage {
                name: "rename wind variables",
                invocation: rename_variables(
                    &[
                        (wind.u_variable.as_str(), wind.u_alias.as_str()),
                        (wind.v_variable.as_str(), wind.v_alias.as_str()),
                    ],
                    &wind_subset,
                    &renamed,
                ),
            },
            Stage {
                name: "define level dimension",
                invocation: apply_script(&wind.define_level_script, false, &renamed, &with_level),
            },
            Stage {
                name: "promote level to record dimension",
                invocation: make_record_dimension(&wind.level_dimension, &with_level, &record_dim),
            },
            Stage {
                name: "fix level dimension",
                invocation: fix_record_dimension(&wind.level_dimension, &record_dim, &fixed_dim),
            },
            Stage {
                name: "invert latitude axis",
                invocation: reverse_dimension(&wind.latitude_dimension, &fixed_dim, &inverted),
            },
            Stage {
                name: "compute wind min/max",
                invocation: apply_script(&wind.min_max_script, true, &inverted, &wind_staged),
            },
        ];

        let promotions = vec![
            Promotion {
                staged: scalar_staged,
                target: work_dir.join(&scalar.output),
            },
            Promotion {
                staged: wind_staged,
                target: work_dir.join(&wind.output),
            },
        ];

        Self {
            input,
            work_dir,
            stages,
            promotions,
            pattern: TempPattern::default(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    /// Final product paths, scalar first.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.promotions.iter().map(|p| p.target.clone()).collect()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Runs every stage in order, then promotes the products and cleans up.
    ///
    /// The first failing stage aborts the run; the temp guard still removes every
    /// intermediate unless `keep_temp` is set.
    pub fn execute(
        &self,
        runner: &dyn ToolRunner,
        options: &RunOptions,
    ) -> PipelineResult<RunReport> {
        let started_at = Utc::now();

        if options.dry_run {
            return Ok(RunReport {
                input: self.input.clone(),
                work_dir: self.work_dir.clone(),
                outputs: self.outputs(),
                stages: Vec::new(),
                removed_temp_files: Vec::new(),
                dry_run: true,
                started_at,
                finished_at: Utc::now(),
            });
        }

        if !self.work_dir.is_dir() {
            return Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("working directory {} does not exist", self.work_dir.display()),
            )));
        }

        // NCO prompts before overwriting, so stale intermediates must go first
        let stale = remove_temp_files(&self.work_dir, &self.pattern)?;
        if !stale.is_empty() {
            warn!(
                "Removed {} stale temporary file(s) from a previous run in {}",
                stale.len(),
                self.work_dir.display()
            );
        }

        let mut guard = TempFileGuard::new(&self.work_dir, self.pattern.clone());
        if options.keep_temp {
            guard.disarm();
        }

        let progress = if options.show_progress {
            let bar = ProgressBar::new(self.stages.len() as u64);
            let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut stage_reports = Vec::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            progress.set_message(stage.name);
            info!("[{}/{}] {}", i + 1, self.stages.len(), stage.name);

            let stage_start = Instant::now();
            if let Err(e) = runner.run(&stage.invocation) {
                progress.abandon_with_message(format!("failed: {}", stage.name));
                return Err(e);
            }
            let elapsed = stage_start.elapsed();
            debug!("Stage '{}' finished in {:.2?}", stage.name, elapsed);

            stage_reports.push(StageReport {
                name: stage.name.to_string(),
                tool: stage.invocation.tool,
                command: stage.invocation.command_line(),
                elapsed_ms: elapsed.as_millis(),
            });
            progress.inc(1);
        }

        self.promote()?;
        progress.finish_with_message("done");

        let removed_temp_files = guard.finish()?;
        let leftover = if options.keep_temp {
            Vec::new()
        } else {
            find_temp_files(&self.work_dir, &self.pattern)?
        };
        if !leftover.is_empty() {
            warn!("{} temporary file(s) survived cleanup", leftover.len());
        }

        Ok(RunReport {
            input: self.input.clone(),
            work_dir: self.work_dir.clone(),
            outputs: self.outputs(),
            stages: stage_reports,
            removed_temp_files,
            dry_run: false,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Renames every staged product over its target, all or nothing.
    ///
    /// Existing targets are first moved aside to `<target>.previous`; if any
    /// rename fails, the products promoted so far are removed and the previous
    /// files are put back.
    fn promote(&self) -> PipelineResult<()> {
        for promotion in &self.promotions {
            let target = &promotion.target;
            if fs::metadata(target).is_ok_and(|m| !m.is_file()) {
                return Err(PipelineError::Io(std::io::Error::other(format!(
                    "{} exists and is not a regular file",
                    target.display()
                ))));
            }
        }

        let mut backups = Vec::new();
        for promotion in &self.promotions {
            if !promotion.target.exists() {
                continue;
            }
            let backup = backup_path(&promotion.target);
            if let Err(e) = fs::rename(&promotion.target, &backup) {
                roll_back(&[], &backups);
                return Err(e.into());
            }
            backups.push((promotion.target.clone(), backup));
        }

        let mut promoted = Vec::new();
        for promotion in &self.promotions {
            debug!(
                "Promoting {} -> {}",
                promotion.staged.display(),
                promotion.target.display()
            );
            if let Err(e) = fs::rename(&promotion.staged, &promotion.target) {
                roll_back(&promoted, &backups);
                return Err(e.into());
            }
            promoted.push(promotion.target.clone());
        }

        for (_, backup) in &backups {
            if let Err(e) = fs::remove_file(backup) {
                warn!("Failed to remove {}: {}", backup.display(), e);
            }
        }
        Ok(())
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".previous");
    PathBuf::from(name)
}

/// Undoes a partial promotion: drops the new products and restores the old ones.
fn roll_back(promoted: &[PathBuf], backups: &[(PathBuf, PathBuf)]) {
    for target in promoted {
        if let Err(e) = fs::remove_file(target) {
            warn!("Failed to remove {}: {}", target.display(), e);
        }
    }
    for (target, backup) in backups {
        if let Err(e) = fs::rename(backup, target) {
            error!(
                "Failed to restore {} from {}: {}",
                target.display(),
                backup.display(),
                e
            );
        }
    }
}
