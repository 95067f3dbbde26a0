use super::*;
use crate::logic::snapshot::AsProfile;

fn snapshot(id: &str, profiles: Vec<AsProfile>) -> Snapshot {
    Snapshot::from_profiles(id, None, profiles)
}

fn sample_snapshots() -> Vec<Snapshot> {
    vec![
        snapshot(
            "a",
            vec![
                AsProfile::from_parts(100, [200, 300], &[3, 4, 3], 2),
                AsProfile::from_parts(200, [100], &[3, 4, 3], 0),
            ],
        ),
        snapshot(
            "b",
            vec![
                AsProfile::from_parts(100, [200, 500], &[5, 2], 7),
                AsProfile::from_parts(500, [100], &[5], 1),
            ],
        ),
        snapshot("c", vec![AsProfile::from_parts(100, [300], &[4, 4, 6, 9], 3)]),
    ]
}

fn trained(snapshots: &[&Snapshot]) -> BaselineModel {
    let mut model = BaselineModel::new("test", ScoringConfig::default());
    model.train(snapshots.iter().copied());
    model
}

#[test]
fn test_new_model_is_empty() {
    let model = BaselineModel::new("default", ScoringConfig::default());
    assert!(model.is_empty());
    assert_eq!(model.snapshots_trained(), 0);
    assert!(model.last_trained.is_none());
    assert!(!model.id.is_empty());
}

#[test]
fn test_training_accumulates_per_as() {
    let snaps = sample_snapshots();
    let model = trained(&[&snaps[0], &snaps[1], &snaps[2]]);

    assert_eq!(model.snapshots_trained(), 3);
    assert_eq!(model.len(), 3);

    let b = model.profile(100).unwrap();
    assert_eq!(b.snapshots_seen(), 3);
    assert_eq!(b.path_lengths().count(), 9);
    assert_eq!(b.path_lengths().sum(), 3 + 4 + 3 + 5 + 2 + 4 + 4 + 6 + 9);
    assert_eq!(b.prefix_counts().count(), 3);
    assert_eq!(b.prefix_counts().sum(), 12);
    assert_eq!(b.neighbors().iter().copied().collect::<Vec<_>>(), vec![200, 300, 500]);
    assert_eq!(b.path_length_histogram().get(&4), Some(&3));

    assert_eq!(model.profile(500).unwrap().snapshots_seen(), 1);
}

#[test]
fn test_training_is_order_independent() {
    let snaps = sample_snapshots();
    let forward = trained(&[&snaps[0], &snaps[1], &snaps[2]]);
    let backward = trained(&[&snaps[2], &snaps[1], &snaps[0]]);
    let shuffled = trained(&[&snaps[1], &snaps[2], &snaps[0]]);

    assert_eq!(forward.profiles(), backward.profiles());
    assert_eq!(forward.profiles(), shuffled.profiles());

    // Derived floats are bit-identical too
    let a = forward.profile(100).unwrap();
    let b = backward.profile(100).unwrap();
    assert_eq!(
        a.learned_mean_path_std_dev().unwrap().to_bits(),
        b.learned_mean_path_std_dev().unwrap().to_bits()
    );
    assert_eq!(
        serde_json::to_string(forward.profiles()).unwrap(),
        serde_json::to_string(shuffled.profiles()).unwrap()
    );
}

#[test]
fn test_merge_equals_sequential_training() {
    let snaps = sample_snapshots();
    let all = trained(&[&snaps[0], &snaps[1], &snaps[2]]);

    let mut left = trained(&[&snaps[0]]);
    let right = trained(&[&snaps[2], &snaps[1]]);
    left.merge(&right);

    assert_eq!(left.profiles(), all.profiles());
    assert_eq!(left.snapshots_trained(), 3);
}

#[test]
fn test_training_twice_doubles_sample_weight() {
    let once = snapshot("s", vec![AsProfile::from_parts(100, [200], &[3, 5], 4)]);
    let doubled = snapshot("d", vec![AsProfile::from_parts(100, [200], &[3, 5, 3, 5], 8)]);

    let twice = trained(&[&once, &once]);
    let single = trained(&[&doubled]);

    let t = twice.profile(100).unwrap();
    let s = single.profile(100).unwrap();
    assert_eq!(t.path_lengths(), s.path_lengths());
    assert_eq!(t.path_length_histogram(), s.path_length_histogram());
    assert_eq!(t.prefix_counts().sum(), s.prefix_counts().sum());
    assert_eq!(t.mean_path_length(), s.mean_path_length());
    assert_eq!(t.snapshots_seen(), 2);
}

#[test]
fn test_empty_snapshot_leaves_model_unchanged() {
    let snaps = sample_snapshots();
    let mut model = trained(&[&snaps[0]]);
    let before = serde_json::to_vec(&model).unwrap();

    let empty = snapshot("empty", vec![]);
    assert_eq!(model.train_snapshot(&empty), 0);
    model.train([&empty]);

    assert_eq!(serde_json::to_vec(&model).unwrap(), before);
}

#[test]
fn test_single_snapshot_has_no_variance() {
    let snaps = sample_snapshots();
    let model = trained(&[&snaps[0]]);
    let b = model.profile(100).unwrap();

    assert!(b.learned_mean_path().is_some());
    assert!(b.learned_mean_path_std_dev().is_none());
    assert!(b.prefix_count_std_dev().is_none());
}

#[test]
fn test_model_does_not_alias_snapshot() {
    let mut snaps = sample_snapshots();
    let model = trained(&[&snaps[0]]);
    let before = model.profiles().clone();

    snaps.clear();
    assert_eq!(model.profiles(), &before);
}

#[test]
fn test_reset_keeps_identity() {
    let snaps = sample_snapshots();
    let mut model = trained(&[&snaps[0], &snaps[1]]);
    let id = model.id.clone();

    model.reset();
    assert!(model.is_empty());
    assert_eq!(model.snapshots_trained(), 0);
    assert_eq!(model.id, id);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.json");

    let snaps = sample_snapshots();
    let model = trained(&[&snaps[0], &snaps[1], &snaps[2]]);
    model.save(&path).unwrap();

    let loaded = BaselineModel::load(&path, ScoringConfig::default()).unwrap();
    assert_eq!(loaded, model);

    // Resume training on the loaded model
    let mut resumed = loaded;
    resumed.train([&snaps[0]]);
    assert_eq!(resumed.snapshots_trained(), 4);
}

#[test]
fn test_load_applies_runtime_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    BaselineModel::new("cfg", ScoringConfig::default()).save(&path).unwrap();
    let loaded = BaselineModel::load(&path, ScoringConfig::high_sensitivity()).unwrap();
    assert_eq!(loaded.config(), &ScoringConfig::high_sensitivity());
}

#[test]
fn test_corrupt_file_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = BaselineModel::load(&path, ScoringConfig::default()).unwrap_err();
    assert!(err.is_corruption());

    let err = BaselineModel::load_or_new(&path, "x", ScoringConfig::default()).unwrap_err();
    assert!(matches!(err, BaselineError::SerializationError(_)));
}

#[test]
fn test_tampered_model_fails_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let snaps = sample_snapshots();
    trained(&[&snaps[0]]).save(&path).unwrap();

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    envelope["model"]["snapshots_trained"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_vec(&envelope).unwrap()).unwrap();

    let err = BaselineModel::load(&path, ScoringConfig::default()).unwrap_err();
    assert!(matches!(err, BaselineError::ChecksumMismatch { .. }));
    assert!(err.is_corruption());
}

#[test]
fn test_layout_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    BaselineModel::new("old", ScoringConfig::default()).save(&path).unwrap();

    let mut envelope: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    envelope["layout_hash"] = serde_json::json!(12345);
    std::fs::write(&path, serde_json::to_vec(&envelope).unwrap()).unwrap();

    let err = BaselineModel::load(&path, ScoringConfig::default()).unwrap_err();
    assert!(matches!(err, BaselineError::LayoutMismatch { actual_hash: 12345, .. }));
}

#[test]
fn test_load_or_new_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let model = BaselineModel::load_or_new(&path, "fresh", ScoringConfig::default()).unwrap();
    assert_eq!(model.name, "fresh");
    assert!(model.is_empty());

    let err = BaselineModel::load(&path, ScoringConfig::default()).unwrap_err();
    assert!(!err.is_corruption());
}

// ============================================================================
// EXPORT
// ============================================================================

#[test]
fn test_export_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let snaps = sample_snapshots();
    let model = trained(&[&snaps[0], &snaps[1], &snaps[2]]);

    let csv = dir.path().join("model.csv");
    assert_eq!(model.export_summaries(&csv, crate::logic::scorer::ExportFormat::Csv).unwrap(), 3);
    let text = std::fs::read_to_string(&csv).unwrap();
    assert!(text.starts_with("as_number,snapshots_seen"));
    assert!(text.lines().any(|l| l.starts_with("100,3,9,")));

    let json = dir.path().join("model.json");
    model.export_summaries(&json, crate::logic::scorer::ExportFormat::JsonArray).unwrap();
    let summaries: Vec<AsSummary> = serde_json::from_slice(&std::fs::read(&json).unwrap()).unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].as_number, 100);
    assert_eq!(summaries[0].neighbors, vec![200, 300, 500]);
}

// ============================================================================
// PER-SNAPSHOT PROPERTIES
// ============================================================================

fn from_dump(id: &str, text: &str) -> Snapshot {
    let config = crate::logic::snapshot::SnapshotConfig::default();
    Snapshot::from_reader(id, None, std::io::Cursor::new(text.to_string()), &config).unwrap()
}

#[test]
fn test_per_snapshot_properties_are_learned() {
    let a = from_dump(
        "a",
        "TABLE_DUMP2|1383307200|B|10.0.0.1|100|10.0.0.0/8|100 200 300\n\
         TABLE_DUMP2|1383307200|B|10.0.0.1|100|2001:db8::/32|100 200 300\n",
    );
    let b = from_dump("b", "TABLE_DUMP2|1383310800|B|10.0.0.1|100|10.1.0.0/16|100 300\n");
    let model = trained(&[&a, &b]);

    let origin = model.profile(300).unwrap();
    assert_eq!(origin.times_seen().count(), 2);
    assert_eq!(origin.times_seen().sum(), 3);
    assert_eq!(origin.end_path_counts().sum(), 3);
    assert_eq!(origin.mid_path_counts().sum(), 0);
    assert_eq!(origin.ipv4_counts().sum(), 2);
    assert_eq!(origin.ipv6_counts().sum(), 1);
    assert_eq!(origin.neighbor_counts().sum(), 2);
    assert_eq!(origin.announced_prefixes().len(), 3);
    assert_eq!(origin.neighbors().iter().copied().collect::<Vec<_>>(), vec![100, 200]);

    let transit = model.profile(200).unwrap();
    assert_eq!(transit.mid_path_count(), 2);
    assert_eq!(transit.end_path_count(), 0);
    assert!(transit.announced_prefixes().is_empty());

    let summary = AsSummary::from(origin);
    assert_eq!(summary.mean_times_seen, Some(1.5));
    assert_eq!(summary.mean_ipv4_count, Some(1.0));
    assert_eq!(summary.mean_ipv6_count, Some(0.5));
    assert_eq!(summary.mean_neighbor_count, Some(1.0));
    assert_eq!(summary.neighbor_count_std_dev, Some(0.0));
    assert_eq!(summary.announced_prefixes.len(), 3);
}

#[test]
fn test_per_snapshot_properties_survive_merge_and_export() {
    let a = from_dump("a", "TABLE_DUMP2|1383307200|B|10.0.0.1|100|10.0.0.0/8|100 200 300\n");
    let b = from_dump("b", "TABLE_DUMP2|1383310800|B|10.0.0.1|100|10.1.0.0/16|100 300\n");

    let mut merged = trained(&[&a]);
    merged.merge(&trained(&[&b]));
    let sequential = trained(&[&a, &b]);
    assert_eq!(merged.profiles(), sequential.profiles());

    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("model.csv");
    sequential.export_summaries(&csv, crate::logic::scorer::ExportFormat::Csv).unwrap();
    let text = std::fs::read_to_string(&csv).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.ends_with(",neighbor_count_std_dev,announced_prefix_count"));
    let row = text.lines().find(|l| l.starts_with("300,")).unwrap();
    assert_eq!(row.split(',').count(), header.split(',').count());
    assert!(row.ends_with(",2"));
}
