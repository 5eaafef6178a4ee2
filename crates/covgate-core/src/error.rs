use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovgateError {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected status {status} returned: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation canceled")]
    Canceled,

    #[error("anonymous execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Coverage(#[from] CoverageDeficiencies),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub type Result<T> = std::result::Result<T, CovgateError>;

/// Kind of a requested deployable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Class,
    Trigger,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Class => write!(f, "class"),
            TargetKind::Trigger => write!(f, "trigger"),
        }
    }
}

/// One coverage problem found by the threshold validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Deficiency {
    Untested { kind: TargetKind, name: String },
    BelowThreshold { kind: TargetKind, name: String, ratio: f64 },
    AggregateBelowThreshold { ratio: f64 },
}

impl fmt::Display for Deficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deficiency::Untested { kind, name } => write!(f, "untested {kind} {name}"),
            Deficiency::BelowThreshold { kind, name, ratio } => write!(
                f,
                "coverage of {kind} {name} is less than 75%: {:.2}%",
                ratio * 100.0
            ),
            Deficiency::AggregateBelowThreshold { ratio } => {
                write!(f, "total coverage is less than 75%: {:.2}%", ratio * 100.0)
            }
        }
    }
}

/// Compound business failure: every untested or under-threshold target found
/// in one validation pass, one line each.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageDeficiencies {
    pub deficiencies: Vec<Deficiency>,
}

impl fmt::Display for CoverageDeficiencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.deficiencies.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CoverageDeficiencies {}

/// One failed batch of a bulk write, identified by its position and the
/// record range it carried.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub batch: usize,
    pub from: usize,
    pub to: usize,
    pub reason: String,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} (records {}..{}) failed: {}",
            self.batch, self.from, self.to, self.reason
        )
    }
}

/// Compound bulk-write failure. Partial success is reported by the caller's
/// response slots; this only enumerates the batches that failed outright.
#[derive(Debug, Clone)]
pub struct BatchError {
    pub failures: Vec<BatchFailure>,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}
