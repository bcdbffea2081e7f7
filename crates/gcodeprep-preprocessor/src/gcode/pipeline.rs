//! Multi-stage pipelines
//!
//! Stages are chained through temporary files: each stage's output becomes
//! the next stage's input. Every temporary file is removed when the run ends,
//! whether it succeeded or failed, and the caller's output path is only
//! written once every stage has succeeded.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gcodeprep_core::constants::GCODE_EXTENSION;
use gcodeprep_core::{PreprocessError, Result};
use tempfile::NamedTempFile;

use crate::utils::ensure_gcode_file;

use super::{run_stage, StageHandle, StageStats};

const TEMP_PREFIX: &str = ".gcodeprep-";

/// Options applied to every pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Extension (without dot) required on input and output paths
    pub extension: String,
    /// Directory for intermediate files; the system temp dir when `None`
    pub temp_dir: Option<PathBuf>,
    /// Append the progress stage to dialect pipelines that lack it
    pub emit_progress: bool,
}

impl PipelineOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self {
            extension: GCODE_EXTENSION.to_string(),
            temp_dir: None,
            emit_progress: false,
        }
    }

    /// Set the directory used for intermediate files
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Set the required file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Request the progress stage
    pub fn with_progress(mut self, emit_progress: bool) -> Self {
        self.emit_progress = emit_progress;
        self
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped set of intermediate files
///
/// Files are deleted together by [`TempFileSet::release`], or on drop if the
/// set goes out of scope early.
#[derive(Debug)]
pub struct TempFileSet {
    dir: Option<PathBuf>,
    suffix: String,
    files: Vec<NamedTempFile>,
}

impl TempFileSet {
    /// Create an empty set placing files in `dir` (system temp if `None`)
    pub fn new(dir: Option<PathBuf>, extension: &str) -> Self {
        Self {
            dir,
            suffix: format!(".{extension}"),
            files: Vec::new(),
        }
    }

    /// Create a new empty temporary file owned by this set
    pub fn create(&mut self) -> std::io::Result<&NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(&self.suffix);

        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        tracing::trace!("Created intermediate file {}", file.path().display());
        self.files.push(file);
        Ok(&self.files[self.files.len() - 1])
    }

    /// Paths of the files currently held
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path().to_path_buf()).collect()
    }

    /// Number of files currently held
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when the set holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete every held file
    pub fn release(mut self) {
        self.remove_all();
    }

    fn remove_all(&mut self) {
        for file in self.files.drain(..) {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!(
                    "Failed to remove intermediate file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        self.remove_all();
    }
}

/// Statistics of one stage within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// Line counters
    pub stats: StageStats,
}

/// Result of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Pipeline (dialect) name
    pub pipeline: String,
    /// Per-stage statistics in execution order
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Total lines dropped across all stages
    pub fn lines_dropped(&self) -> u64 {
        self.stages.iter().map(|s| s.stats.lines_dropped).sum()
    }

    /// Total lines rewritten across all stages
    pub fn lines_rewritten(&self) -> u64 {
        self.stages.iter().map(|s| s.stats.lines_rewritten).sum()
    }
}

/// Ordered chain of stages connected by intermediate files
///
/// A pipeline is consumed by [`Pipeline::run`]; its stages handle exactly
/// one file and are never reused.
///
/// # Example
/// ```no_run
/// use gcodeprep_preprocessor::{PipelineCatalog, PipelineOptions};
/// use std::path::Path;
///
/// let catalog = PipelineCatalog::new();
/// let pipeline = catalog.create_pipeline("skeinforge50", &PipelineOptions::new())?;
/// let report = pipeline.run(Path::new("in.gcode"), Path::new("out.gcode"))?;
/// println!("dropped {} lines", report.lines_dropped());
/// # Ok::<(), gcodeprep_core::Error>(())
/// ```
pub struct Pipeline {
    name: String,
    stages: Vec<StageHandle>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline from stages in execution order
    pub fn new(name: impl Into<String>, stages: Vec<StageHandle>, options: PipelineOptions) -> Self {
        Self {
            name: name.into(),
            stages,
            options,
        }
    }

    /// Get the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// List stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Get the options this pipeline runs with
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every stage, reading `input_path` and writing `output_path`
    ///
    /// Both paths must carry the configured extension; this is checked before
    /// any file is touched. Intermediate files are removed on every exit path
    /// and `output_path` is replaced only when the whole chain succeeds.
    pub fn run(self, input_path: &Path, output_path: &Path) -> Result<PipelineReport> {
        ensure_gcode_file(input_path, &self.options.extension)?;
        ensure_gcode_file(output_path, &self.options.extension)?;

        if self.stages.is_empty() {
            return Err(PreprocessError::EmptyPipeline.into());
        }

        tracing::info!(
            "Running pipeline '{}' ({} stages): {} -> {}",
            self.name,
            self.stages.len(),
            input_path.display(),
            output_path.display()
        );

        let name = self.name.clone();
        let mut temps = TempFileSet::new(self.options.temp_dir.clone(), &self.options.extension);
        let result = self.run_stages(&mut temps, input_path, output_path);
        temps.release();

        if let Err(e) = &result {
            tracing::warn!("Pipeline '{}' failed: {}", name, e);
        }
        result
    }

    /// Process a file onto itself
    pub fn run_in_place(self, path: &Path) -> Result<PipelineReport> {
        self.run(path, path)
    }

    fn run_stages(
        mut self,
        temps: &mut TempFileSet,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<PipelineReport> {
        let mut reports = Vec::with_capacity(self.stages.len());
        let mut current_input = input_path.to_path_buf();
        let last = self.stages.len() - 1;

        for (index, stage) in self.stages.iter_mut().enumerate() {
            let name = stage.name().to_string();

            let stats = if index < last {
                let target = temps.create()?;
                let mut writer = BufWriter::new(target.as_file());
                let stats = run_stage(stage.as_mut(), &current_input, &mut writer)
                    .map_err(|e| PreprocessError::stage_failed(&name, e))?;
                writer
                    .flush()
                    .map_err(|e| PreprocessError::stage_failed(&name, e))?;
                current_input = target.path().to_path_buf();
                stats
            } else {
                let mut target = final_output(output_path)?;
                let stats = {
                    let mut writer = BufWriter::new(target.as_file_mut());
                    let stats = run_stage(stage.as_mut(), &current_input, &mut writer)
                        .map_err(|e| PreprocessError::stage_failed(&name, e))?;
                    writer
                        .flush()
                        .map_err(|e| PreprocessError::stage_failed(&name, e))?;
                    stats
                };
                target
                    .persist(output_path)
                    .map_err(|e| PreprocessError::stage_failed(&name, e.error))?;
                stats
            };

            reports.push(StageReport { stage: name, stats });
        }

        Ok(PipelineReport {
            pipeline: std::mem::take(&mut self.name),
            stages: reports,
        })
    }
}

/// Temporary file next to `output_path`, persisted onto it on success
///
/// The file takes the permissions of an existing output, or the mode a
/// plainly created file would get under the current umask.
fn final_output(output_path: &Path) -> std::io::Result<NamedTempFile> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let existing = fs::metadata(output_path).ok().map(|m| m.permissions());

    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(".partial");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if existing.is_none() {
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
    }

    let file = builder.tempfile_in(dir)?;
    if let Some(permissions) = existing {
        file.as_file().set_permissions(permissions)?;
    }
    Ok(file)
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("options", &self.options)
            .finish()
    }
}
