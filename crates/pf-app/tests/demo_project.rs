//! The bundled demo project must keep loading and compiling.

use std::path::Path;

use pf_app::{compile_project, load_project, project_service};

const DEMO: &str = "../../demos/two_by_two/project.yaml";

#[test]
fn demo_project_compiles() {
    let path = Path::new(DEMO);
    let project = load_project(path).expect("demo project should load");
    let runtime = compile_project(&project, path).expect("demo project should compile");

    assert_eq!(runtime.topology.n_cells(), 4);
    assert_eq!(runtime.topology.groups().len(), 2);
    assert_eq!(runtime.table.len(), 9);
    assert!(runtime.fingerprints.pack_id.starts_with("demo-2s2p@"));
    assert!(runtime.fingerprints.drive_cycle_id.starts_with("commute@"));
    assert_eq!(runtime.flush.max_rows, 4000);

    let s2p2 = runtime.topology.find_label("S2P2").unwrap().index();
    assert_eq!(runtime.initial_cells[s2p2].soc, 0.9);
    assert_eq!(runtime.initial_cells[s2p2].dcir_aging_factor, 1.15);
    assert_eq!(runtime.initial_cells[0].soc, 0.95);

    let summary = project_service::summarize_project(&project, path).unwrap();
    assert_eq!(summary.group_count, 2);
    assert_eq!(summary.step_count, 9);
}

#[test]
fn fingerprints_follow_content() {
    let path = Path::new(DEMO);
    let mut project = load_project(path).unwrap();
    let before = compile_project(&project, path).unwrap().fingerprints;
    let again = compile_project(&project, path).unwrap().fingerprints;
    assert_eq!(before, again);

    project.pack.r_series_ohm *= 2.0;
    let after = compile_project(&project, path).unwrap().fingerprints;
    assert_ne!(before.pack_id, after.pack_id);
    assert_eq!(before.drive_cycle_id, after.drive_cycle_id);
}
