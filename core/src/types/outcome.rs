use serde::{Deserialize, Serialize};

/// Result of checking a single reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Alive,
    Down,
    /// The reference kind has no URL template, nothing was sent over the network.
    Unsupported,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Alive => "Alive",
            ProbeOutcome::Down => "Down",
            ProbeOutcome::Unsupported => "Unsupported",
        }
    }

    pub fn is_bad(&self) -> bool {
        !matches!(self, ProbeOutcome::Alive)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
