//! Step table: the ordered rows a run walks through.

use pf_solver::Target;

use crate::error::{SimError, SimResult};
use crate::trigger::Trigger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepType {
    /// Runs the declared duration; ordinary triggers are ignored.
    Fixed,
    /// Runs the declared duration unless a trigger fires first.
    FixedWithTriggers,
    /// Runs until a trigger fires.
    TriggerOnly,
}

impl StepType {
    pub fn parse(row: usize, value: &str) -> SimResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(StepType::Fixed),
            "fixed_with_triggers" => Ok(StepType::FixedWithTriggers),
            "trigger_only" => Ok(StepType::TriggerOnly),
            _ => Err(SimError::UnknownStepType {
                row,
                value: value.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepType::Fixed => "fixed",
            StepType::FixedWithTriggers => "fixed_with_triggers",
            StepType::TriggerOnly => "trigger_only",
        }
    }

    /// Whether step and subcycle triggers are evaluated for this row.
    pub fn uses_triggers(self) -> bool {
        !matches!(self, StepType::Fixed)
    }
}

/// Build a [`Target`] from a row's value type, value and unit.
pub fn parse_target(row: usize, value_type: &str, value: f64, unit: &str) -> SimResult<Target> {
    let kind = value_type.trim().to_ascii_lowercase();
    let unit_ok = |allowed: &[&str]| allowed.iter().any(|u| u.eq_ignore_ascii_case(unit.trim()));
    let (target, ok) = match kind.as_str() {
        "current" => (Target::Current(value), unit_ok(&["A"])),
        "c_rate" | "crate" => (Target::CRate(value), unit_ok(&["C", "1/hr", "1/h"])),
        "voltage" => (Target::Voltage(value), unit_ok(&["V"])),
        "power" => (Target::Power(value), unit_ok(&["W"])),
        "resistance" => (Target::Resistance(value), unit_ok(&["ohm", "Ω"])),
        _ => {
            return Err(SimError::UnknownValueType {
                row,
                value: value_type.to_string(),
            });
        }
    };
    if !ok {
        return Err(SimError::UnitMismatch {
            row,
            value_type: value_type.to_string(),
            unit: unit.to_string(),
        });
    }
    if !value.is_finite() {
        return Err(SimError::InvalidRow {
            row,
            what: format!("target value {value} is not finite"),
        });
    }
    Ok(target)
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepRow {
    pub global_index: u64,
    pub day_of_year: u32,
    pub drive_cycle_id: String,
    pub subcycle_id: String,
    pub subcycle_step: u32,
    pub target: Target,
    pub unit: String,
    pub step_type: StepType,
    /// Ignored for `trigger_only` rows.
    pub duration_s: f64,
    pub timestep_s: f64,
    pub ambient_temp_c: f64,
    pub location: String,
    pub label: String,
    pub step_triggers: Vec<Trigger>,
    pub subcycle_triggers: Vec<Trigger>,
}

impl StepRow {
    fn same_subcycle(&self, other: &StepRow) -> bool {
        self.day_of_year == other.day_of_year
            && self.drive_cycle_id == other.drive_cycle_id
            && self.subcycle_id == other.subcycle_id
    }
}

#[derive(Clone, Debug)]
pub struct StepTable {
    rows: Vec<StepRow>,
}

impl StepTable {
    pub fn new(rows: Vec<StepRow>) -> SimResult<Self> {
        if rows.is_empty() {
            return Err(SimError::EmptyTable);
        }
        for (i, row) in rows.iter().enumerate() {
            if !(row.timestep_s.is_finite() && row.timestep_s > 0.0) {
                return Err(SimError::InvalidRow {
                    row: i,
                    what: format!("timestep {} must be positive", row.timestep_s),
                });
            }
            if row.step_type != StepType::TriggerOnly
                && !(row.duration_s.is_finite() && row.duration_s >= 0.0)
            {
                return Err(SimError::InvalidRow {
                    row: i,
                    what: format!("duration {} must be non-negative", row.duration_s),
                });
            }
            if !row.ambient_temp_c.is_finite() {
                return Err(SimError::InvalidRow {
                    row: i,
                    what: "ambient temperature is not finite".to_string(),
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[StepRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row of the next subcycle on the same day, else of a later day.
    pub fn next_subcycle_row(&self, from: usize) -> Option<usize> {
        let current = self.rows.get(from)?;
        for (j, row) in self.rows.iter().enumerate().skip(from + 1) {
            if row.day_of_year != current.day_of_year {
                break;
            }
            if !row.same_subcycle(current) {
                return Some(j);
            }
        }
        self.next_day_row(from)
    }

    /// First later row whose day of year is greater.
    pub fn next_day_row(&self, from: usize) -> Option<usize> {
        let day = self.rows.get(from)?.day_of_year;
        self.rows
            .iter()
            .enumerate()
            .skip(from + 1)
            .find(|(_, row)| row.day_of_year > day)
            .map(|(j, _)| j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, subcycle: &str) -> StepRow {
        StepRow {
            global_index: 0,
            day_of_year: day,
            drive_cycle_id: "dc".to_string(),
            subcycle_id: subcycle.to_string(),
            subcycle_step: 0,
            target: Target::Current(1.0),
            unit: "A".to_string(),
            step_type: StepType::Fixed,
            duration_s: 10.0,
            timestep_s: 1.0,
            ambient_temp_c: 25.0,
            location: String::new(),
            label: String::new(),
            step_triggers: Vec::new(),
            subcycle_triggers: Vec::new(),
        }
    }

    #[test]
    fn empty_table_rejected() {
        assert!(matches!(StepTable::new(Vec::new()), Err(SimError::EmptyTable)));
    }

    #[test]
    fn non_positive_timestep_rejected() {
        let mut r = row(1, "a");
        r.timestep_s = 0.0;
        assert!(StepTable::new(vec![r]).is_err());
    }

    #[test]
    fn jump_targets() {
        let table = StepTable::new(vec![
            row(1, "a"),
            row(1, "a"),
            row(1, "b"),
            row(1, "b"),
            row(2, "a"),
            row(2, "b"),
        ])
        .unwrap();
        assert_eq!(table.next_subcycle_row(0), Some(2));
        assert_eq!(table.next_subcycle_row(2), Some(4));
        assert_eq!(table.next_day_row(1), Some(4));
        assert_eq!(table.next_subcycle_row(4), Some(5));
        assert_eq!(table.next_subcycle_row(5), None);
        assert_eq!(table.next_day_row(4), None);
    }

    #[test]
    fn targets_and_units() {
        assert_eq!(parse_target(0, "current", 2.0, "A").unwrap(), Target::Current(2.0));
        assert_eq!(parse_target(0, "c_rate", 1.0, "1/hr").unwrap(), Target::CRate(1.0));
        assert_eq!(parse_target(0, "Power", -5.0, "w").unwrap(), Target::Power(-5.0));
        assert!(matches!(
            parse_target(3, "voltage", 4.0, "A"),
            Err(SimError::UnitMismatch { row: 3, .. })
        ));
        assert!(matches!(
            parse_target(0, "torque", 1.0, "Nm"),
            Err(SimError::UnknownValueType { .. })
        ));
        assert!(StepType::parse(0, "sometimes").is_err());
        assert_eq!(StepType::parse(0, "Trigger_Only").unwrap(), StepType::TriggerOnly);
    }
}
