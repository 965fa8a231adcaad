/// Trace functionality for inspecting how a resolution pass unfolded
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// What happened to one step during a resolution pass
///
/// Each step transitions exactly once: either it is structurally skipped,
/// it declines to contribute a value (opts out), or it resolves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StepOutcome {
    Resolved,
    Skipped,
    OptedOut,
}

/// One step's record within a resolution trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    /// Id of the step
    pub step: String,

    /// How the step left its pending state
    pub outcome: StepOutcome,

    /// The resolved value (only for resolved steps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl TraceEntry {
    pub fn new(step: impl Into<String>, outcome: StepOutcome) -> Self {
        TraceEntry {
            step: step.into(),
            outcome,
            value: None,
        }
    }

    /// Attach the resolved value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// The ordered record of one resolution pass
///
/// Meta steps never appear; they are context, not part of the fold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolutionTrace {
    pub steps: Vec<TraceEntry>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        ResolutionTrace::default()
    }

    pub fn record(&mut self, entry: TraceEntry) {
        self.steps.push(entry);
    }

    /// The entry for `step`, if the pass reached it
    pub fn entry(&self, step: &str) -> Option<&TraceEntry> {
        self.steps.iter().find(|entry| entry.step == step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_serialization() {
        let mut trace = ResolutionTrace::new();
        trace.record(
            TraceEntry::new("variant", StepOutcome::Resolved).with_value(Value::Bool(true)),
        );
        trace.record(TraceEntry::new("map", StepOutcome::Skipped));

        let json = serde_json::to_string(&trace).unwrap();
        assert_eq!(
            json,
            r#"{"steps":[{"step":"variant","outcome":"resolved","value":{"bool":true}},{"step":"map","outcome":"skipped"}]}"#
        );
        let back: ResolutionTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn test_entry_lookup() {
        let mut trace = ResolutionTrace::new();
        trace.record(TraceEntry::new("map", StepOutcome::OptedOut));
        assert_eq!(
            trace.entry("map").map(|entry| entry.outcome),
            Some(StepOutcome::OptedOut)
        );
        assert_eq!(trace.entry("variant"), None);
    }
}
