use gcodeprep_preprocessor::{
    Action, Pipeline, PipelineCatalog, PipelineOptions, Stage, SKEINFORGE50_DIALECT,
};
use std::fs;
use std::io;
use std::path::Path;

/// Stage that fails before reading its input
struct Failing;

impl Stage for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn begin(&mut self, _input: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
    }

    fn transform_line(&mut self, _line: &str) -> Action {
        Action::PassThrough
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn pipeline_with_failure_at(position: usize, temp_dir: &Path) -> Pipeline {
    let catalog = PipelineCatalog::new();
    let mut stages = vec![
        catalog.create_stage("repg_start_end").unwrap(),
        catalog.create_stage("rpm").unwrap(),
        catalog.create_stage("skeinforge50").unwrap(),
    ];
    stages.insert(position, Box::new(Failing));
    Pipeline::new(
        "failing",
        stages,
        PipelineOptions::new().with_temp_dir(temp_dir),
    )
}

#[test]
fn test_no_temp_files_after_failure() {
    for position in 0..=3 {
        let work = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let input = work.path().join("in.gcode");
        let output = work.path().join("out.gcode");
        fs::write(&input, "G21\nG1 X1\n").unwrap();

        let err = pipeline_with_failure_at(position, scratch.path())
            .run(&input, &output)
            .unwrap_err();

        assert!(err.is_io_error(), "position {position}: {err}");
        assert!(err.to_string().contains("failing"));
        assert!(dir_entries(scratch.path()).is_empty(), "position {position}");
        assert_eq!(dir_entries(work.path()), ["in.gcode"], "position {position}");
    }
}

#[test]
fn test_no_temp_files_after_success() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let input = work.path().join("in.gcode");
    let output = work.path().join("out.gcode");
    fs::write(&input, "G21\nG1 X1\n").unwrap();

    PipelineCatalog::new()
        .create_pipeline(
            SKEINFORGE50_DIALECT,
            &PipelineOptions::new().with_temp_dir(scratch.path()),
        )
        .unwrap()
        .run(&input, &output)
        .unwrap();

    assert!(dir_entries(scratch.path()).is_empty());
    let mut entries = dir_entries(work.path());
    entries.sort();
    assert_eq!(entries, ["in.gcode", "out.gcode"]);
}

#[test]
fn test_missing_input_cleans_up() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();

    let err = PipelineCatalog::new()
        .create_pipeline(
            SKEINFORGE50_DIALECT,
            &PipelineOptions::new().with_temp_dir(scratch.path()),
        )
        .unwrap()
        .run(&work.path().join("missing.gcode"), &work.path().join("out.gcode"))
        .unwrap_err();

    assert!(err.is_io_error());
    assert!(dir_entries(scratch.path()).is_empty());
    assert!(dir_entries(work.path()).is_empty());
}

#[test]
fn test_format_error_touches_nothing() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let input = work.path().join("in.txt");
    fs::write(&input, "G21\n").unwrap();

    let err = PipelineCatalog::new()
        .create_pipeline(
            SKEINFORGE50_DIALECT,
            &PipelineOptions::new().with_temp_dir(scratch.path()),
        )
        .unwrap()
        .run(&input, &work.path().join("out.gcode"))
        .unwrap_err();

    assert!(err.is_format_error());
    assert!(dir_entries(scratch.path()).is_empty());
    assert_eq!(dir_entries(work.path()), ["in.txt"]);
}

#[test]
fn test_failure_keeps_existing_output() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("in.gcode");
    let output = work.path().join("out.gcode");
    fs::write(&input, "G21\n").unwrap();
    fs::write(&output, "previous\n").unwrap();

    pipeline_with_failure_at(3, work.path())
        .run(&input, &output)
        .unwrap_err();

    assert_eq!(fs::read_to_string(&output).unwrap(), "previous\n");
}
