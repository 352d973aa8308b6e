use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use pf_ecm::{EcmError, Mode, load_json, parse_json_str};

fn table_json(charge_ocv: [f64; 3], discharge_ocv: [f64; 3]) -> String {
    let entry = |ocv: [f64; 3], r0: f64| {
        format!(
            "[[0.0, 0.5, 1.0], [{}, {}, {}], [{r0}, {r0}, {r0}], [0.01, 0.01, 0.01], \
             [0.005, 0.005, 0.005], [1000, 1000, 1000], [10000, 10000, 10000]]",
            ocv[0], ocv[1], ocv[2]
        )
    };
    format!(
        r#"{{"CHARGE": {{"T05": {}, "T45": {}}}, "DISCHARGE": {{"T25": {}}}}}"#,
        entry(charge_ocv, 0.04),
        entry(charge_ocv, 0.02),
        entry(discharge_ocv, 0.03)
    )
}

fn unique_temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("pf_ecm_{name}_{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn parses_both_modes_and_interpolates_temperature() {
    let table = parse_json_str("nmc", &table_json([3.0, 3.6, 4.2], [3.0, 3.6, 4.1])).unwrap();
    assert_eq!(table.name(), "nmc");
    assert_eq!(table.grid(Mode::Charge).temperature_axis(), &[5.0, 45.0]);

    let p = table.lookup(0.5, 25.0, Mode::Charge, 1.0);
    assert!((p.ocv - 3.6).abs() < 1e-12);
    assert!((p.r0 - 0.03).abs() < 1e-12);

    // Clamped beyond both axes.
    let edge = table.lookup(2.0, 100.0, Mode::Discharge, 1.0);
    assert!((edge.ocv - 4.1).abs() < 1e-12);
}

#[test]
fn loads_from_file_named_after_stem() {
    let dir = unique_temp_dir("file");
    let path = dir.join("lfp_cell.json");
    std::fs::write(&path, table_json([3.0, 3.3, 3.6], [3.0, 3.3, 3.6])).unwrap();
    let table = load_json(&path).unwrap();
    assert_eq!(table.name(), "lfp_cell");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_file_is_fatal() {
    let err = load_json(&PathBuf::from("/definitely/not/here.json")).unwrap_err();
    assert!(matches!(err, EcmError::Io { .. }));
}

#[test]
fn missing_mode_is_fatal() {
    let json = r#"{"CHARGE": {"T25": [[0.0, 1.0], [3.0, 4.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]]}}"#;
    let err = parse_json_str("x", json).unwrap_err();
    assert!(matches!(err, EcmError::MissingMode { mode: Mode::Discharge }));
}

#[test]
fn wrong_column_count_is_fatal() {
    let json = r#"{"CHARGE": {"T25": [[0.0, 1.0], [3.0, 4.0]]}, "DISCHARGE": {"T25": [[0.0, 1.0], [3.0, 4.0]]}}"#;
    let err = parse_json_str("x", json).unwrap_err();
    assert!(matches!(err, EcmError::ColumnCount { found: 2, .. }));
}

#[test]
fn inconsistent_soc_grid_is_fatal() {
    let json = r#"{
        "CHARGE": {
            "T05": [[0.0, 1.0], [3.0, 4.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]],
            "T25": [[0.0, 0.9], [3.0, 4.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]]
        },
        "DISCHARGE": {
            "T25": [[0.0, 1.0], [3.0, 4.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]]
        }
    }"#;
    let err = parse_json_str("x", json).unwrap_err();
    assert!(matches!(err, EcmError::InconsistentSocGrid { .. }));
}

#[test]
fn ragged_columns_are_fatal() {
    let json = r#"{
        "CHARGE": {"T25": [[0.0, 1.0], [3.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]]},
        "DISCHARGE": {"T25": [[0.0, 1.0], [3.0, 4.0], [0.01, 0.01], [0.01, 0.01], [0.01, 0.01], [1, 1], [1, 1]]}
    }"#;
    let err = parse_json_str("x", json).unwrap_err();
    assert!(matches!(err, EcmError::RaggedColumns { .. }));
}

#[test]
fn malformed_json_is_fatal() {
    assert!(matches!(
        parse_json_str("x", "{not json").unwrap_err(),
        EcmError::Json(_)
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lookup_stays_within_grid_bounds(soc in -1.0f64..2.0, temp in -40.0f64..90.0) {
            let table = parse_json_str("p", &table_json([3.0, 3.6, 4.2], [3.0, 3.5, 4.1])).unwrap();
            for mode in [Mode::Charge, Mode::Discharge] {
                let p = table.lookup(soc, temp, mode, 1.0);
                prop_assert!(p.ocv >= 3.0 - 1e-12 && p.ocv <= 4.2 + 1e-12);
                prop_assert!(p.r0 >= 0.02 - 1e-12 && p.r0 <= 0.04 + 1e-12);
            }
        }
    }
}
