//! Trigger specs: `type[:threshold[:action]]` entries separated by `;`.
//!
//! Parsing is lenient. Unknown types, `nan` placeholders and unknown action
//! tokens are dropped with a warning; a missing threshold is kept and the
//! trigger is skipped when evaluated.

use std::fmt;

use tracing::warn;

use crate::metrics::{Comparator, Metrics, Quantity, Scope};

/// Where a run jumps when a trigger fires. Ordered by precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionLevel {
    Step,
    Subcycle,
    Day,
}

impl ActionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionLevel::Step => "step",
            ActionLevel::Subcycle => "subcycle",
            ActionLevel::Day => "day",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "step" => Some(ActionLevel::Step),
            "dc" | "subcycle" => Some(ActionLevel::Subcycle),
            "day" => Some(ActionLevel::Day),
            _ => None,
        }
    }
}

/// Column a trigger was registered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    Step,
    Subcycle,
    Internal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKind {
    Limit {
        quantity: Quantity,
        scope: Scope,
        cmp: Comparator,
    },
    /// Per-day simulated time reached the threshold.
    TimeElapsed,
}

macro_rules! limit {
    ($q:ident, $s:ident, $c:ident) => {
        TriggerKind::Limit {
            quantity: Quantity::$q,
            scope: Scope::$s,
            cmp: Comparator::$c,
        }
    };
}

const REGISTRY: [(&str, TriggerKind); 21] = [
    ("V_cell_high", limit!(Voltage, Cell, High)),
    ("V_cell_low", limit!(Voltage, Cell, Low)),
    ("I_cell_high", limit!(Current, Cell, High)),
    ("I_cell_low", limit!(Current, Cell, Low)),
    ("SOC_cell_high", limit!(Soc, Cell, High)),
    ("SOC_cell_low", limit!(Soc, Cell, Low)),
    ("C_rate_cell_high", limit!(CRate, Cell, High)),
    ("C_rate_cell_low", limit!(CRate, Cell, Low)),
    ("P_cell_high", limit!(Power, Cell, High)),
    ("P_cell_low", limit!(Power, Cell, Low)),
    ("V_pack_high", limit!(Voltage, Pack, High)),
    ("V_pack_low", limit!(Voltage, Pack, Low)),
    ("I_pack_high", limit!(Current, Pack, High)),
    ("I_pack_low", limit!(Current, Pack, Low)),
    ("SOC_pack_high", limit!(Soc, Pack, High)),
    ("SOC_pack_low", limit!(Soc, Pack, Low)),
    ("C_rate_pack_high", limit!(CRate, Pack, High)),
    ("C_rate_pack_low", limit!(CRate, Pack, Low)),
    ("P_pack_high", limit!(Power, Pack, High)),
    ("P_pack_low", limit!(Power, Pack, Low)),
    ("time_elapsed", TriggerKind::TimeElapsed),
];

impl TriggerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("time_elapsed")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub threshold: Option<f64>,
    pub action: Option<ActionLevel>,
    pub source: TriggerSource,
}

impl Trigger {
    /// The implicit end-of-day boundary every row carries.
    pub fn day_boundary() -> Self {
        Self {
            kind: TriggerKind::TimeElapsed,
            threshold: Some(pf_core::SECONDS_PER_DAY),
            action: Some(ActionLevel::Day),
            source: TriggerSource::Internal,
        }
    }

    /// The override if present, else the default for the kind and source.
    pub fn action(&self) -> ActionLevel {
        if let Some(action) = self.action {
            return action;
        }
        match (self.kind, self.source) {
            (TriggerKind::TimeElapsed, _) | (_, TriggerSource::Internal) => ActionLevel::Day,
            (_, TriggerSource::Subcycle) => ActionLevel::Subcycle,
            (_, TriggerSource::Step) => ActionLevel::Step,
        }
    }

    /// `None` when the trigger has no threshold to compare against.
    ///
    /// Limits compare strictly; `time_elapsed` fires once per-day time has
    /// reached the threshold.
    pub fn fires(&self, metrics: &Metrics, per_day_time_s: f64) -> Option<bool> {
        let threshold = self.threshold?;
        Some(match self.kind {
            TriggerKind::TimeElapsed => {
                pf_core::reached(per_day_time_s, threshold, pf_core::Tolerances::TIME)
            }
            TriggerKind::Limit {
                quantity,
                scope,
                cmp,
            } => {
                let live = metrics.value(quantity, scope, cmp);
                match cmp {
                    Comparator::High => live > threshold,
                    Comparator::Low => live < threshold,
                }
            }
        })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        match (self.threshold, self.action) {
            (None, None) => Ok(()),
            (Some(t), None) => write!(f, ":{t}"),
            (None, Some(a)) => write!(f, "::{}", a.as_str()),
            (Some(t), Some(a)) => write!(f, ":{t}:{}", a.as_str()),
        }
    }
}

/// Parse a trigger column.
pub fn parse_triggers(spec: &str, source: TriggerSource) -> Vec<Trigger> {
    spec.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| parse_entry(entry, source))
        .collect()
}

pub fn format_triggers(triggers: &[Trigger]) -> String {
    triggers
        .iter()
        .map(Trigger::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_entry(entry: &str, source: TriggerSource) -> Option<Trigger> {
    if entry.eq_ignore_ascii_case("nan") {
        warn!(entry, "dropping placeholder trigger");
        return None;
    }
    let mut parts = entry.split(':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let Some(kind) = TriggerKind::from_name(name) else {
        warn!(entry, "dropping trigger of unknown type");
        return None;
    };

    let threshold = match parts.next().filter(|t| !t.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(entry, threshold = raw, "unusable trigger threshold, treating as missing");
                None
            }
        },
    };

    let action = match parts.next().filter(|a| !a.is_empty()) {
        None => None,
        Some(token) => {
            let parsed = ActionLevel::parse(token);
            if parsed.is_none() {
                warn!(entry, action = token, "ignoring unknown trigger action");
            }
            parsed
        }
    };
    if parts.next().is_some() {
        warn!(entry, "ignoring extra trigger fields");
    }

    Some(Trigger {
        kind,
        threshold,
        action,
        source,
    })
}

/// Index of the trigger that wins: highest action level, first registered
/// among equals.
pub fn resolve_precedence(fired: &[Trigger]) -> Option<usize> {
    fired
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, ActionLevel)>, (i, t)| {
            let level = t.action();
            match best {
                Some((_, top)) if top >= level => best,
                _ => Some((i, level)),
            }
        })
        .map(|(i, _)| i)
}
