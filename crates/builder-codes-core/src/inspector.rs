use crate::attribution::{self, Attribution};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InspectorOutcome {
    #[default]
    NotAttempted,
    /// Input parsed but carries no valid attribution.
    Absent,
    Present(Attribution),
}

impl InspectorOutcome {
    /// Label/value rows for display; registry only for schema 1.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        match self {
            InspectorOutcome::Present(attribution) => {
                let mut rows = vec![
                    ("Schema ID", attribution.schema_id().to_string()),
                    ("Codes", attribution.codes().join(", ")),
                ];
                if let Some(registry) = attribution.registry() {
                    rows.push(("Registry Address", registry.to_checksum(None)));
                }
                rows
            }
            _ => Vec::new(),
        }
    }
}

/// State of the suffix inspector panel.
#[derive(Debug, Clone, Default)]
pub struct InspectorState {
    input: String,
    outcome: InspectorOutcome,
}

impl InspectorState {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn outcome(&self) -> &InspectorOutcome {
        &self.outcome
    }

    /// A new input invalidates the previous outcome.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
        self.outcome = InspectorOutcome::NotAttempted;
    }

    pub fn parse(&mut self) -> &InspectorOutcome {
        self.outcome = match attribution::decode_hex(&self.input) {
            Some(attribution) => InspectorOutcome::Present(attribution),
            None => InspectorOutcome::Absent,
        };
        &self.outcome
    }
}
