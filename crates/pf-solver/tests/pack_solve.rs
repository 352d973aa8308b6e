use std::sync::Arc;

use pf_ecm::parse_json_str;
use pf_pack::{CellSpec, CellState, InitialState, PackBuilder, PackTopology};
use pf_solver::{Fallback, Target, commit, evaluate, resolve_current, rest_module_voltage};

fn table_json(r0: f64) -> String {
    let entry = format!(
        "[[0.0, 1.0], [3.0, 4.2], [{r0}, {r0}], [0.005, 0.005], [0.002, 0.002], [1000, 1000], [9000, 9000]]"
    );
    format!(r#"{{"CHARGE": {{"T25": {entry}}}, "DISCHARGE": {{"T25": {entry}}}}}"#)
}

fn pack(series: u32, parallel: u32, r0: f64, r_p: f64) -> PackTopology {
    let mut b = PackBuilder::new();
    let t = b.add_table(Arc::new(parse_json_str("t", &table_json(r0)).unwrap()));
    for g in 0..series {
        for p in 0..parallel {
            b.add_cell(
                format!("s{g}p{p}"),
                g,
                CellSpec {
                    capacity_ah: 5.0,
                    coulombic_efficiency: 0.99,
                    table: t,
                    thermal: None,
                },
            );
        }
    }
    b.interconnect_resistance(r_p);
    b.build().unwrap()
}

fn states(pack: &PackTopology, soc: f64) -> Vec<CellState> {
    let init = InitialState {
        soc,
        temperature_k: 298.15,
        ..InitialState::default()
    };
    pack.cells().iter().map(|_| CellState::at_rest(&init)).collect()
}

#[test]
fn every_group_carries_the_pack_current() {
    let pack = pack(3, 4, 0.01, 0.001);
    let mut cells = states(&pack, 0.8);
    cells[1].soc = 0.6;
    cells[6].dcir_aging_factor = 1.4;

    let sol = evaluate(&pack, &cells, 12.0, 1.0);
    assert!(sol.skipped_groups.is_empty());
    for group in pack.groups() {
        let sum: f64 = group.cells.iter().map(|c| sol.cells[c.index()].current_a).sum();
        assert!((sum - 12.0).abs() < 1e-9);
    }
    // The low-SOC cell contributes less discharge current.
    assert!(sol.cells[1].current_a < sol.cells[0].current_a);
}

#[test]
fn module_voltage_subtracts_series_links() {
    let pack = pack(3, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let sol = evaluate(&pack, &cells, 10.0, 1.0);
    let group_sum: f64 = sol.group_voltages.iter().sum();
    let expected = group_sum - 10.0 * pack.r_series_ohm() * 2.0;
    assert!((sol.module_voltage - expected).abs() < 1e-12);
}

#[test]
fn evaluate_is_pure_and_commit_advances_state() {
    let pack = pack(1, 2, 0.01, 0.001);
    let mut cells = states(&pack, 0.5);
    let before = cells.clone();
    let sol = evaluate(&pack, &cells, 10.0, 60.0);
    assert_eq!(cells, before);

    commit(&pack, &sol, &mut cells, 60.0, 25.0);
    for (c, s) in cells.iter().zip(&sol.cells) {
        let expected_soc = 0.5 - s.current_a * 60.0 / (5.0 * 3600.0);
        assert!((c.soc - expected_soc).abs() < 1e-12);
        assert_eq!(c.v_term, s.v_term);
        assert!(c.v_rc1 > 0.0);
        assert!(c.heat_j > 0.0);
        assert!(c.energy_wh > 0.0);
        // Isothermal without thermal parameters.
        assert_eq!(c.temperature_k, 298.15);
    }
}

#[test]
fn terminal_voltage_matches_branch_equation() {
    let pack = pack(1, 1, 0.02, 0.0);
    let cells = states(&pack, 0.5);
    let sol = evaluate(&pack, &cells, 5.0, 2.0);
    let c = &sol.cells[0];
    let expected = c.params.ocv - 5.0 * c.params.r0 - c.v_rc1 - c.v_rc2;
    assert!((c.v_term - expected).abs() < 1e-12);
    // Without interconnect resistance the node equals the terminal voltage.
    assert!((sol.module_voltage - c.v_term).abs() < 1e-12);
}

#[test]
fn singular_group_is_skipped_and_state_held() {
    let mut b = PackBuilder::new();
    let zero_r = r#"[[0.0, 1.0], [3.0, 4.2], [0, 0], [0, 0], [0, 0], [0, 0], [0, 0]]"#;
    let json = format!(r#"{{"CHARGE": {{"T25": {zero_r}}}, "DISCHARGE": {{"T25": {zero_r}}}}}"#);
    let t = b.add_table(Arc::new(parse_json_str("ideal", &json).unwrap()));
    for label in ["a", "b"] {
        b.add_cell(
            label,
            0,
            CellSpec {
                capacity_ah: 5.0,
                coulombic_efficiency: 1.0,
                table: t,
                thermal: None,
            },
        );
    }
    b.interconnect_resistance(0.0);
    let pack = b.build().unwrap();

    let mut cells = states(&pack, 0.5);
    rest_module_voltage(&pack, &mut cells);
    let before = cells.clone();
    let sol = evaluate(&pack, &cells, 5.0, 1.0);
    assert_eq!(sol.skipped_groups.len(), 1);
    assert!(sol.cells.iter().all(|c| !c.solved));

    commit(&pack, &sol, &mut cells, 1.0, 25.0);
    assert_eq!(cells, before);
    assert!((sol.module_voltage - 3.6).abs() < 1e-12);
}

#[test]
fn rest_voltage_is_sum_of_ocv() {
    let pack = pack(4, 2, 0.01, 0.001);
    let mut cells = states(&pack, 0.5);
    let v = rest_module_voltage(&pack, &mut cells);
    assert!((v - 4.0 * 3.6).abs() < 1e-9);
    assert!(cells.iter().all(|c| (c.v_term - 3.6).abs() < 1e-9));
}

#[test]
fn c_rate_uses_pack_capacity() {
    let pack = pack(2, 3, 0.01, 0.001);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::CRate(0.5), &pack, &cells, 1.0, 0.0);
    assert!((r.i_pack - 7.5).abs() < 1e-12);
    assert!(r.fallback.is_none());
}

#[test]
fn voltage_target_is_met_by_bisection() {
    let pack = pack(1, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::Voltage(3.5), &pack, &cells, 1.0, 3.6);
    assert!(r.fallback.is_none());
    assert!(r.i_pack > 0.0);
    let v = evaluate(&pack, &cells, r.i_pack, 1.0).module_voltage;
    assert!((v - 3.5).abs() < 1e-3);
}

#[test]
fn unreachable_voltage_falls_back_to_closest_bracket_end() {
    let pack = pack(1, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::Voltage(10.0), &pack, &cells, 1.0, 3.6);
    assert_eq!(r.fallback, Some(Fallback::UnreachableVoltage));
    assert!((r.i_pack + 50.0).abs() < 1e-12);
}

#[test]
fn power_target_is_met() {
    let pack = pack(1, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::Power(10.0), &pack, &cells, 1.0, 3.6);
    assert!(r.fallback.is_none());
    let v = evaluate(&pack, &cells, r.i_pack, 1.0).module_voltage;
    assert!((v * r.i_pack - 10.0).abs() < 1e-2);
}

#[test]
fn unreachable_power_uses_previous_voltage() {
    let pack = pack(1, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::Power(1.0e6), &pack, &cells, 1.0, 4.0);
    assert_eq!(r.fallback, Some(Fallback::UnreachablePower));
    assert!((r.i_pack - 50.0).abs() < 1e-12);
}

#[test]
fn resistance_target_runs_at_zero_current() {
    let pack = pack(1, 1, 0.01, 0.0);
    let cells = states(&pack, 0.5);
    let r = resolve_current(Target::Resistance(2.0), &pack, &cells, 1.0, 3.6);
    assert_eq!(r.i_pack, 0.0);
    assert_eq!(r.fallback, Some(Fallback::UnsupportedResistance));
}
