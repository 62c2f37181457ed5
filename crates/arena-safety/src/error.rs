use thiserror::Error;

/// Inputs the safety core refuses to act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// Alliance key other than "red" / "blue".
    #[error("unknown alliance key: {0:?}")]
    UnknownAlliance(String),

    /// Station code that is not `R1`..`R3` / `B1`..`B3`.
    #[error("invalid station code: {0:?}")]
    InvalidStation(String),
}
