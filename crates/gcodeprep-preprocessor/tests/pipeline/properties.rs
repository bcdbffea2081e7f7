use gcodeprep_preprocessor::gcode::{rpm_stage, skeinforge50_stage, slicer_stage};
use gcodeprep_preprocessor::{run_stage, ProgressStage, Stage, StartEndBlockRemover};
use proptest::prelude::*;
use std::fs;

const LINES: &[&str] = &[
    "G21",
    "G21 ; set units",
    "G90",
    "G20",
    "G91",
    "M105",
    "M104 S210",
    "M104 S210 T0",
    "M104 SAbc",
    "M106 S255",
    "M107",
    "M101",
    "M103",
    "M108 R3.0 T1",
    "M108 R3.0",
    "M73 P12",
    "G1 X10 Y10 F900",
    "  G1 X1.5 E0.2  ",
    "; layer 2",
    "(**** Beginning of start.gcode ****)",
    "(**** End of start.gcode ****)",
    "",
];

fn stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(skeinforge50_stage()),
        Box::new(slicer_stage()),
        Box::new(rpm_stage()),
        Box::new(StartEndBlockRemover::new()),
        Box::new(ProgressStage::new()),
    ]
}

fn run_once(stage: &mut dyn Stage, content: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.gcode");
    fs::write(&input, content).unwrap();
    let mut out = Vec::new();
    run_stage(stage, &input, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn document() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(LINES), 0..40)
}

/// True when `needle` is a subsequence of `haystack`
fn is_subsequence(needle: &[&str], haystack: &[&str]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|n| rest.any(|h| h == n))
}

proptest! {
    #[test]
    fn prop_stage_is_idempotent(lines in document(), index in 0usize..5) {
        let content = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
        let first = run_once(stages()[index].as_mut(), &content);
        let second = run_once(stages()[index].as_mut(), &first);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_drop_only_stages_preserve_order(lines in document(), index in 0usize..4) {
        let content = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
        let output = run_once(stages()[index].as_mut(), &content);
        let produced: Vec<&str> = output.lines().collect();

        // Rewritten M108 lines are the only text not copied from the input.
        let survivors: Vec<&str> = produced.iter().copied().filter(|l| *l != "M135 T1").collect();
        prop_assert!(is_subsequence(&survivors, &lines));
    }

    #[test]
    fn prop_plain_moves_pass_through(lines in prop::collection::vec("G1 X[0-9]{1,3} Y[0-9]{1,3}( F[0-9]{3})?", 0..20)) {
        let content = lines.iter().map(|l| format!("{l}\r\n")).collect::<String>();
        for index in 0..4 {
            let output = run_once(stages()[index].as_mut(), &content);
            prop_assert_eq!(&output, &content);
        }
    }
}
