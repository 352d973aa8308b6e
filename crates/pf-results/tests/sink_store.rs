use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pf_results::{
    FlushPolicy, Fingerprints, RecordSink, ResultRecord, ResultSink, ResultsHeader, RunManifest,
    RunStatus, RunStore, read_results,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn record(cell: usize, time_s: f64) -> ResultRecord {
    ResultRecord {
        cell_index: cell,
        cell_label: format!("C{cell}"),
        time_s,
        dt_s: 1.0,
        time_in_step_s: time_s,
        soc: 0.9,
        v_term: 3.9,
        ocv: 4.0,
        v_rc1: 0.0,
        v_rc2: 0.0,
        r0: 0.01,
        r1: 0.005,
        r2: 0.002,
        c1: 1000.0,
        c2: 5000.0,
        i_cell_a: 1.0,
        q_irr_w: 0.01,
        q_rev_w: 0.0,
        q_gen_w: 0.01,
        heat_cum_j: 0.01 * time_s,
        energy_wh: 0.0,
        temperature_k: 298.15,
        i_pack_a: 2.0,
        v_module_v: 3.9,
        row_index: 0,
        global_index: 0,
        day_of_year: 1,
        drive_cycle_id: "dc".to_string(),
        subcycle_id: "s1".to_string(),
        step_type: "fixed".to_string(),
        value_type: "current".to_string(),
        value: 2.0,
        unit: "A".to_string(),
        label: String::new(),
        location: String::new(),
        ambient_temp_c: 25.0,
        fired_triggers: Vec::new(),
    }
}

fn manifest(run_id: &str, pack_id: &str, created_at: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        project_name: "demo".to_string(),
        fingerprints: Fingerprints {
            pack_id: pack_id.to_string(),
            drive_cycle_id: "dc@0000".to_string(),
        },
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        status: RunStatus::Completed,
        reason: Some("table_exhausted".to_string()),
        resumable: false,
        sim_time_s: 10.0,
        substeps: 10,
        rows: 20,
        skipped_groups: 0,
        cell_count: 2,
        solver_version: "0.1.0".to_string(),
    }
}

#[test]
fn sink_batches_until_row_limit() {
    let dir = unique_temp_dir("pf_results_batch");
    let path = dir.join("results.jsonl");
    let policy = FlushPolicy {
        max_rows: 4,
        max_interval: Duration::from_secs(3600),
    };
    let mut sink = ResultSink::create(path.clone(), ResultsHeader::new("r1", 2), policy);

    sink.push_substep(vec![record(0, 1.0), record(1, 1.0)]).unwrap();
    assert_eq!(sink.buffered_rows(), 2);
    assert!(!path.exists());

    sink.push_substep(vec![record(0, 2.0), record(1, 2.0)]).unwrap();
    assert_eq!(sink.buffered_rows(), 0);
    assert_eq!(sink.flush_count(), 1);

    sink.push_substep(vec![record(0, 3.0), record(1, 3.0)]).unwrap();
    sink.flush().unwrap();
    assert_eq!(sink.rows_written(), 6);

    let (header, rows) = read_results(&path).unwrap();
    assert_eq!(header.run_id, "r1");
    assert_eq!(header.cell_count, 2);
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[5].time_s, 3.0);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn flush_without_rows_still_writes_header() {
    let dir = unique_temp_dir("pf_results_empty");
    let path = dir.join("results.jsonl");
    let mut sink = ResultSink::create(path.clone(), ResultsHeader::new("r0", 1), FlushPolicy::default());
    sink.flush().unwrap();

    let (header, rows) = read_results(&path).unwrap();
    assert_eq!(header.run_id, "r0");
    assert!(rows.is_empty());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn resumed_sink_appends_after_existing_rows() {
    let dir = unique_temp_dir("pf_results_resume");
    let path = dir.join("results.jsonl");
    let mut first = ResultSink::create(path.clone(), ResultsHeader::new("r2", 1), FlushPolicy::default());
    first.push_substep(vec![record(0, 1.0)]).unwrap();
    first.flush().unwrap();

    let mut second =
        ResultSink::resume(path.clone(), ResultsHeader::new("r2", 1), FlushPolicy::default(), 1)
            .unwrap();
    second.push_substep(vec![record(0, 2.0)]).unwrap();
    second.flush().unwrap();
    assert_eq!(second.rows_written(), 2);

    let (_, rows) = read_results(&path).unwrap();
    let times: Vec<f64> = rows.iter().map(|r| r.time_s).collect();
    assert_eq!(times, vec![1.0, 2.0]);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn resume_requires_existing_file() {
    let dir = unique_temp_dir("pf_results_resume_missing");
    let result = ResultSink::resume(
        dir.join("results.jsonl"),
        ResultsHeader::new("r3", 1),
        FlushPolicy::default(),
        0,
    );
    assert!(result.is_err());
}

#[test]
fn malformed_line_is_reported() {
    let dir = unique_temp_dir("pf_results_malformed");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("results.jsonl");
    let header = serde_json::to_string(&ResultsHeader::new("r4", 1)).unwrap();
    fs::write(&path, format!("{header}\n{{not json\n")).unwrap();

    let err = read_results(&path).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn store_roundtrip_and_filtering() {
    let project_dir = unique_temp_dir("pf_results_project");
    fs::create_dir_all(&project_dir).unwrap();
    let project_path = project_dir.join("project.yaml");
    fs::write(&project_path, "version: 1\n").unwrap();

    let store = RunStore::for_project(&project_path).unwrap();
    assert!(store.root().ends_with(".packflow/runs"));

    store.save_manifest(&manifest("run-b", "pack@1", "2026-02-02T00:00:00Z")).unwrap();
    store.save_manifest(&manifest("run-a", "pack@1", "2026-02-01T00:00:00Z")).unwrap();
    store.save_manifest(&manifest("run-c", "pack@2", "2026-02-03T00:00:00Z")).unwrap();

    let all = store.list_runs(None).unwrap();
    let ids: Vec<&str> = all.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run-a", "run-b", "run-c"]);

    let filtered = store.list_runs(Some("pack@2")).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].run_id, "run-c");

    let loaded = store.load_manifest("run-a").unwrap();
    assert_eq!(loaded.status, RunStatus::Completed);
    assert_eq!(loaded.reason.as_deref(), Some("table_exhausted"));

    assert!(store.load_results("run-a").is_err());
    assert!(store.load_manifest("missing").is_err());

    store.delete_run("run-b").unwrap();
    assert!(!store.has_run("run-b"));
    let _ = fs::remove_dir_all(project_dir);
}

#[test]
fn clear_markers_removes_pause_and_stop() {
    let root = unique_temp_dir("pf_results_markers");
    let store = RunStore::new(root.clone()).unwrap();
    fs::create_dir_all(store.run_dir("r")).unwrap();
    fs::write(store.pause_marker("r"), "").unwrap();
    fs::write(store.stop_marker("r"), "retain").unwrap();

    store.clear_markers("r").unwrap();
    assert!(!store.pause_marker("r").exists());
    assert!(!store.stop_marker("r").exists());
    let _ = fs::remove_dir_all(root);
}
