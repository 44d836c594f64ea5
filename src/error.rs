use std::path::PathBuf;

/// Errors raised by the energy ledger and its configuration layer.
#[derive(Debug, thiserror::Error)]
pub enum EnergyError {
    #[error("initial energy must be non-negative, got {0} J")]
    NegativeInitialEnergy(f64),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("invalid speed: {0} (must be finite and positive)")]
    InvalidSpeed(f64),
    /// A discrete cost larger than what remains. Non-fatal: the ledger is left untouched.
    #[error("energy exhausted: requested {requested_j} J, {remaining_j} J remaining")]
    Exhausted { requested_j: f64, remaining_j: f64 },
    #[error("energy source is disposed")]
    Disposed,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnergyError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, EnergyError::Exhausted { .. })
    }
}
