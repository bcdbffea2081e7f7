//! Dialect catalog
//!
//! Maps slicer dialect names to the ordered stages they need, and stage
//! names to the factories that build fresh stage instances.

use std::collections::HashMap;
use std::sync::Arc;

use gcodeprep_core::PreprocessError;

use super::{
    rpm_stage, skeinforge50_stage, slicer_stage, Pipeline, PipelineOptions, ProgressStage,
    StageHandle, StartEndBlockRemover, PROGRESS_STAGE, RPM_STAGE, SKEINFORGE50_STAGE,
    SLICER_STAGE, START_END_STAGE,
};

/// Dialect name for Skeinforge 50 output
pub const SKEINFORGE50_DIALECT: &str = "skeinforge50";
/// Dialect name for slicers emitting explicit fan control
pub const SLICER_DIALECT: &str = "slicer";

type StageFactory = Arc<dyn Fn() -> StageHandle + Send + Sync>;

/// Registry of stage factories and dialect pipelines
///
/// Every pipeline it creates owns freshly built stages.
#[derive(Clone)]
pub struct PipelineCatalog {
    factories: HashMap<String, StageFactory>,
    dialects: HashMap<String, Vec<String>>,
}

impl PipelineCatalog {
    /// Create a catalog holding the built-in stages and dialects
    pub fn new() -> Self {
        let mut catalog = Self::empty();

        catalog
            .register_stage(START_END_STAGE, || Box::new(StartEndBlockRemover::new()))
            .register_stage(RPM_STAGE, || Box::new(rpm_stage()))
            .register_stage(SKEINFORGE50_STAGE, || Box::new(skeinforge50_stage()))
            .register_stage(SLICER_STAGE, || Box::new(slicer_stage()))
            .register_stage(PROGRESS_STAGE, || Box::new(ProgressStage::new()));

        catalog
            .register_dialect(
                SKEINFORGE50_DIALECT,
                &[START_END_STAGE, RPM_STAGE, SKEINFORGE50_STAGE],
            )
            .register_dialect(SLICER_DIALECT, &[RPM_STAGE, SLICER_STAGE, PROGRESS_STAGE]);

        catalog
    }

    /// Create a catalog with nothing registered
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            dialects: HashMap::new(),
        }
    }

    /// Register a stage factory
    pub fn register_stage<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> StageHandle + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a dialect as an ordered list of stage names
    ///
    /// Stage names are resolved when a pipeline is created.
    pub fn register_dialect(&mut self, name: impl Into<String>, stages: &[&str]) -> &mut Self {
        self.dialects.insert(
            name.into(),
            stages.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Create a stage by name
    pub fn create_stage(&self, name: &str) -> Option<StageHandle> {
        self.factories.get(name).map(|f| f())
    }

    /// Stage names of a dialect, in execution order
    pub fn dialect_stages(&self, dialect: &str) -> Option<&[String]> {
        self.dialects.get(dialect).map(Vec::as_slice)
    }

    /// Create the pipeline for a dialect
    ///
    /// With `options.emit_progress` the progress stage is appended unless the
    /// dialect already runs it.
    pub fn create_pipeline(
        &self,
        dialect: &str,
        options: &PipelineOptions,
    ) -> Result<Pipeline, PreprocessError> {
        let mut names = self
            .dialects
            .get(dialect)
            .cloned()
            .ok_or_else(|| PreprocessError::UnknownDialect {
                name: dialect.to_string(),
            })?;
        with_progress(&mut names, options);

        let stages = self.build_stages(names.as_slice())?;
        tracing::debug!("Created pipeline '{}' with stages {:?}", dialect, names);
        Ok(Pipeline::new(dialect, stages, options.clone()))
    }

    /// Create an ad hoc pipeline from stage names
    ///
    /// `options.emit_progress` appends the progress stage as for dialects.
    pub fn create_pipeline_from_stages(
        &self,
        names: &[&str],
        options: &PipelineOptions,
    ) -> Result<Pipeline, PreprocessError> {
        let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        with_progress(&mut names, options);

        let stages = self.build_stages(names.as_slice())?;
        Ok(Pipeline::new(names.join("+"), stages, options.clone()))
    }

    /// List registered dialect names, sorted
    pub fn dialects(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// List registered stage names, sorted
    pub fn stages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn build_stages<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<StageHandle>, PreprocessError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.create_stage(name)
                    .ok_or_else(|| PreprocessError::UnknownStage {
                        name: name.to_string(),
                    })
            })
            .collect()
    }
}

fn with_progress(names: &mut Vec<String>, options: &PipelineOptions) {
    if options.emit_progress && !names.iter().any(|n| n == PROGRESS_STAGE) {
        names.push(PROGRESS_STAGE.to_string());
    }
}

impl Default for PipelineCatalog {
    fn default() -> Self {
        Self::new()
    }
}
