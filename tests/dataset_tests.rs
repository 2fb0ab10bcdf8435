// ================================================================================
// Multi-run aggregation and hand-off formats
// File: tests/dataset_tests.rs
// ================================================================================

use eeg_core::processing::artifact::RejectionMask;
use eeg_core::processing::epochs::segment;
use eeg_core::processing::features::{extract, FeatureSpec, FeatureTable};
use eeg_core::simulation::{generate, ComponentSpec, MarkerSpec};
use eeg_core::{aggregate, ChannelSelection, Dataset, MergePolicy, RunMetadata};

fn run_table(trials: usize, specs: &[FeatureSpec]) -> FeatureTable {
    let buffer = generate(
        trials as f64 + 1.0,
        200.0,
        2,
        vec![ComponentSpec::sinusoid(ChannelSelection::All, 6.0, 1.0)],
        MarkerSpec::regular("cue", 0.5, 1.0, trials),
    )
    .unwrap();
    let epochs = segment(&buffer, &RejectionMask::clean(&buffer), -40, 159).unwrap();
    extract(&epochs, specs).unwrap()
}

fn theta() -> Vec<FeatureSpec> {
    vec![FeatureSpec::band_power("theta", 4.0, 8.0, ChannelSelection::All)]
}

#[test]
fn test_row_count_is_sum_of_runs() {
    let tables = vec![
        (RunMetadata::new("p01", "stroop"), run_table(3, &theta())),
        (RunMetadata::new("p02", "stroop"), run_table(5, &theta())),
        (RunMetadata::new("p03", "stroop"), run_table(2, &theta())),
    ];
    let dataset = aggregate(&tables, MergePolicy::Strict).unwrap();

    assert_eq!(dataset.len(), 10);
    assert_eq!(dataset.columns(), &["theta_power_channel_Ch1", "theta_power_channel_Ch2"]);

    let participants: Vec<&str> = dataset.rows().iter().map(|r| r.participant_id.as_str()).collect();
    assert_eq!(participants[..3], ["p01"; 3]);
    assert_eq!(participants[3..8], ["p02"; 5]);
    assert_eq!(participants[8..], ["p03"; 2]);
    assert!(dataset.rows().iter().all(|r| r.marker_label == "cue"));
}

#[test]
fn test_values_carry_over_unchanged() {
    let table = run_table(2, &theta());
    let expected = table.column("theta_power_channel_Ch1").unwrap();
    let dataset = aggregate(&[(RunMetadata::new("p01", "t"), table)], MergePolicy::Strict).unwrap();

    let values: Vec<f64> = dataset
        .column("theta_power_channel_Ch1")
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(values, expected);
    // 6 Hz at amplitude 1 lies inside the theta band
    assert!(values.iter().all(|v| (v - 0.5).abs() < 1e-9));
}

#[test]
fn test_union_policy_marks_missing_values() {
    let alpha = vec![FeatureSpec::band_power("alpha", 8.0, 12.0, ChannelSelection::named(["Ch1"]))];
    let tables = vec![
        (RunMetadata::new("p01", "t"), run_table(1, &theta())),
        (RunMetadata::new("p02", "t"), run_table(1, &alpha)),
    ];
    assert!(aggregate(&tables, MergePolicy::Strict).is_err());

    let dataset = aggregate(&tables, MergePolicy::UnionWithMissing).unwrap();
    assert_eq!(dataset.columns().len(), 3);
    assert_eq!(dataset.column("alpha_power_channel_Ch1").unwrap()[0], None);
    assert!(dataset.column("alpha_power_channel_Ch1").unwrap()[1].is_some());
    assert_eq!(dataset.column("theta_power_channel_Ch2").unwrap()[1], None);
}

#[test]
fn test_json_hand_off_round_trips() {
    let tables = vec![(
        RunMetadata::new("p01", "oddball").with_extra("site", "lab-a"),
        run_table(2, &theta()),
    )];
    let dataset = aggregate(&tables, MergePolicy::Strict).unwrap();
    let json = dataset.to_json().unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["rows"][0]["participant_id"], "p01");
    assert_eq!(parsed["rows"][0]["extra"]["site"], "lab-a");
    assert_eq!(parsed["rows"][1]["onset"], 300);

    let restored: Dataset = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, dataset);
}

#[test]
fn test_csv_hand_off() {
    let tables = vec![
        (RunMetadata::new("p01", "t"), run_table(1, &theta())),
        (RunMetadata::new("p02", "t"), run_table(1, &theta())),
    ];
    let csv = aggregate(&tables, MergePolicy::Strict).unwrap().to_csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "participant_id,task_id,marker_label,onset,theta_power_channel_Ch1,theta_power_channel_Ch2"
    );
    assert!(lines[1].starts_with("p01,t,cue,100,"));
    assert!(lines[2].starts_with("p02,t,cue,100,"));
    assert!(lines.iter().all(|l| l.split(',').count() == 6));
}
