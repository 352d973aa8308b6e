//! Drive-cycle simulation for battery packs.
//!
//! Provides:
//! - the step table and its row types ([`step`])
//! - trigger parsing, evaluation and precedence ([`trigger`], [`metrics`])
//! - hard voltage cutoffs ([`cutoff`])
//! - resumable run state ([`state`]) and pause/stop signals ([`signals`])
//! - the walker that runs a table against a pack ([`walker`])

pub mod cutoff;
pub mod error;
pub mod metrics;
pub mod signals;
pub mod state;
pub mod step;
pub mod trigger;
pub mod walker;

pub use cutoff::{Bound, Cutoff};
pub use error::{SimError, SimResult};
pub use metrics::{Comparator, Metrics, Quantity, Scope, Span};
pub use signals::{ControlSignals, NoSignals, Signal, SignalFlags, StopMode};
pub use state::{CompletionReason, CutoffGuard, RunOutcome, RunState, SimulationState};
pub use step::{StepRow, StepTable, StepType, parse_target};
pub use trigger::{
    ActionLevel, Trigger, TriggerKind, TriggerSource, format_triggers, parse_triggers,
    resolve_precedence,
};
pub use walker::{SimOptions, SimProgress, Walker};
