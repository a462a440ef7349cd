use thiserror::Error;

/// Problems with booster configuration or draft setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("A draft needs at least one set")]
    NoSets,
    #[error("A draft needs at least one seat")]
    NoSeats,
    #[error("Set {set} defines no booster variants")]
    NoBoosterVariants { set: String },
    #[error("Set {set} references unknown sheet {sheet}")]
    UnknownSheet { set: String, sheet: String },
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}
