use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Environment faults. Any of these ends the run, since no scenario result can
/// be trusted once either root is unusable.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot create reference root under {parent}: {source}")]
    ReferenceSetup {
        parent: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fresh reference root {0} is not empty")]
    ReferenceNotEmpty(PathBuf),
    #[error("cannot remove reference root {path}: {source}")]
    ReferenceTeardown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reference parent {reference} lies inside candidate root {candidate}")]
    RootsOverlap { candidate: PathBuf, reference: PathBuf },
    #[error("candidate root {path} is unusable: {reason}")]
    CandidateUnavailable { path: PathBuf, reason: String },
    #[error("reference parent {path} is unusable: {reason}")]
    ReferenceParentUnavailable { path: PathBuf, reason: String },
    #[error("no scenario named {0:?}")]
    UnknownScenario(String),
    #[error("cannot encode report: {0}")]
    Report(#[from] serde_json::Error),
}
