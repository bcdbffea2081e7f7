use gcodeprep_preprocessor::{PipelineCatalog, PipelineOptions, SKEINFORGE50_DIALECT, SLICER_DIALECT};
use std::fs;

const SKEINFORGE_INPUT: &str = "\
(**** Beginning of start.gcode ****)
M104 S220 T0
G28
(**** End of start.gcode ****)
G21 ; set units
G90
M105
M101
M108 R3.0 T0
M104 S210 T0
M104 S210
G1 X10 Y10 F900
M103
(**** beginning of end.gcode ****)
M18
(**** end of end.gcode ****)
";

const SKEINFORGE_EXPECTED: &str = "\
M135 T0
M104 S210 T0
G1 X10 Y10 F900
";

fn run_dialect(dialect: &str, input: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("part.gcode");
    let output_path = dir.path().join("part_out.gcode");
    fs::write(&input_path, input).unwrap();

    let options = PipelineOptions::new().with_temp_dir(dir.path());
    PipelineCatalog::new()
        .create_pipeline(dialect, &options)
        .unwrap()
        .run(&input_path, &output_path)
        .unwrap();

    fs::read_to_string(&output_path).unwrap()
}

#[test]
fn test_skeinforge50_file() {
    assert_eq!(run_dialect(SKEINFORGE50_DIALECT, SKEINFORGE_INPUT), SKEINFORGE_EXPECTED);
}

#[test]
fn test_skeinforge50_report() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("part.gcode");
    let output_path = dir.path().join("part_out.gcode");
    fs::write(&input_path, SKEINFORGE_INPUT).unwrap();

    let report = PipelineCatalog::new()
        .create_pipeline(SKEINFORGE50_DIALECT, &PipelineOptions::new())
        .unwrap()
        .run(&input_path, &output_path)
        .unwrap();

    assert_eq!(report.pipeline, SKEINFORGE50_DIALECT);
    let names: Vec<_> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(names, ["repg_start_end", "rpm", "skeinforge50"]);
    assert_eq!(report.stages[0].stats.lines_read, 16);
    assert_eq!(report.stages[0].stats.lines_dropped, 7);
    assert_eq!(report.stages[1].stats.lines_rewritten, 1);
    assert_eq!(report.lines_dropped(), 7 + 2 + 4);
}

#[test]
fn test_slicer_file() {
    let input = "G21\nG90\nM106 S255\nG1 X1 Y1\nM107\nG1 X2 Y2\n";
    let output = run_dialect(SLICER_DIALECT, input);
    assert_eq!(
        output,
        "M73 P0 (progress (0%): 0/2)\nG1 X1 Y1\nM73 P50 (progress (50%): 1/2)\nG1 X2 Y2\nM73 P100 (progress (100%): 2/2)\n"
    );
}

#[test]
fn test_pass_through_untouched() {
    let input = "  G1 X10 Y10 F900   ; keep me  \r\nM104 S210 T1\r\n";
    assert_eq!(run_dialect(SKEINFORGE50_DIALECT, input), input);
}

#[test]
fn test_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.gcode");
    fs::write(&path, "G21\nG1 X1\n").unwrap();

    PipelineCatalog::new()
        .create_pipeline(SKEINFORGE50_DIALECT, &PipelineOptions::new())
        .unwrap()
        .run_in_place(&path)
        .unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "G1 X1\n");
}

#[test]
fn test_uppercase_extension_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("PART.GCODE");
    let output_path = dir.path().join("out.gcode");
    fs::write(&input_path, "M105\n").unwrap();

    PipelineCatalog::new()
        .create_pipeline(SKEINFORGE50_DIALECT, &PipelineOptions::new())
        .unwrap()
        .run(&input_path, &output_path)
        .unwrap();

    assert_eq!(fs::read_to_string(&output_path).unwrap(), "");
}

#[test]
fn test_slicer_keeps_non_utf8_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("part.gcode");
    let output_path = dir.path().join("part_out.gcode");
    fs::write(&input_path, b"G1 X1 ; temp\xe9rature\nG1 X2\n").unwrap();

    let report = PipelineCatalog::new()
        .create_pipeline(SLICER_DIALECT, &PipelineOptions::new())
        .unwrap()
        .run(&input_path, &output_path)
        .unwrap();

    let expected: &[u8] = b"M73 P0 (progress (0%): 0/2)\nG1 X1 ; temp\xe9rature\n\
M73 P50 (progress (50%): 1/2)\nG1 X2\nM73 P100 (progress (100%): 2/2)\n";
    assert_eq!(fs::read(&output_path).unwrap(), expected);
    assert_eq!(report.lines_rewritten(), 0);
}
