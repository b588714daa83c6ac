// Error types - orbit math, registry structure and NEO feed ingestion

use thiserror::Error;

/// Result type for orbit math
pub type OrbitResult<T> = Result<T, OrbitError>;

/// Failures local to one body's geometry or time step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitError {
    #[error("invalid orbital elements: {0}")]
    InvalidElements(String),

    #[error(
        "Kepler solver did not converge (e = {eccentricity}, M = {mean_anomaly}) after {iterations} iterations"
    )]
    ConvergenceFailure {
        eccentricity: f64,
        mean_anomaly: f64,
        iterations: usize,
    },

    #[error("anomaly conversion produced a non-finite value (e = {eccentricity}, input = {input})")]
    NonFiniteAnomaly { eccentricity: f64, input: f64 },

    #[error("invalid sampling step: {0}")]
    InvalidSampleStep(f64),
}

/// Structural errors found while building or querying the registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("body '{body}' references unknown parent '{parent}'")]
    UnresolvedParent { body: String, parent: String },

    #[error("body '{0}' registered twice")]
    DuplicateBody(String),

    #[error("registry has no primary body")]
    MissingPrimary,

    #[error("registry has more than one primary body: '{0}' and '{1}'")]
    MultiplePrimaries(String, String),

    #[error("body '{0}' is not reachable from the primary")]
    UnreachableBody(String),

    #[error("unknown body: {0}")]
    UnknownBody(String),

    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// Feed-level failures; single bad rows are reported, not raised
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Feed returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
