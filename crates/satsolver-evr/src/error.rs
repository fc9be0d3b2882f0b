use thiserror::Error;

/// Errors raised while parsing versions and dependency expressions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvrError {
    #[error("Invalid version string \"{0}\"")]
    InvalidEvr(String),

    #[error("Invalid epoch \"{epoch}\" in \"{evr}\"")]
    InvalidEpoch { evr: String, epoch: String },

    #[error("Invalid operator \"{0}\"")]
    InvalidOperator(String),

    #[error("Could not parse dependency \"{relation}\": {reason}")]
    MalformedRelation { relation: String, reason: String },
}
