use crate::error::HarnessError;
use std::fs;
use std::path::{Path, PathBuf};

pub const CANDIDATE_ENV: &str = "FS_PARITY_CANDIDATE";
pub const REFERENCE_PARENT_ENV: &str = "FS_PARITY_REFERENCE_PARENT";

/// Where the mounted candidate lives when nothing says otherwise.
pub const DEFAULT_CANDIDATE: &str = "../mountpoint";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Externally provisioned mount. Persists across scenarios.
    pub candidate_root: PathBuf,
    /// Directory under which each scenario's reference root is created.
    pub reference_parent: PathBuf,
    /// Restrict the run to these scenario names. Empty runs the whole catalog.
    pub only: Vec<String>,
}

impl HarnessConfig {
    pub fn new(candidate_root: impl Into<PathBuf>) -> Self {
        Self {
            candidate_root: candidate_root.into(),
            reference_parent: std::env::temp_dir(),
            only: Vec::new(),
        }
    }

    /// Reads `FS_PARITY_CANDIDATE` and `FS_PARITY_REFERENCE_PARENT`.
    pub fn from_env() -> Self {
        Self {
            candidate_root: std::env::var(CANDIDATE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CANDIDATE)),
            reference_parent: std::env::var(REFERENCE_PARENT_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            only: Vec::new(),
        }
    }

    pub fn with_reference_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.reference_parent = parent.into();
        self
    }

    pub fn with_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = names.into_iter().map(Into::into).collect();
        self
    }

    /// Checks both locations exist as directories and that reference roots
    /// cannot land inside the candidate.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let candidate = existing_dir(&self.candidate_root).map_err(|reason| {
            HarnessError::CandidateUnavailable { path: self.candidate_root.clone(), reason }
        })?;
        let reference = existing_dir(&self.reference_parent).map_err(|reason| {
            HarnessError::ReferenceParentUnavailable { path: self.reference_parent.clone(), reason }
        })?;
        if reference.starts_with(&candidate) {
            return Err(HarnessError::RootsOverlap { candidate, reference });
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf, String> {
    let canonical = fs::canonicalize(path).map_err(|e| e.to_string())?;
    if !canonical.is_dir() {
        return Err("not a directory".into());
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn separate_directories_validate() {
        let candidate = tempdir().unwrap();
        let parent = tempdir().unwrap();
        let cfg = HarnessConfig::new(candidate.path()).with_reference_parent(parent.path());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_candidate_is_rejected() {
        let parent = tempdir().unwrap();
        let cfg = HarnessConfig::new(parent.path().join("not-mounted"))
            .with_reference_parent(parent.path());
        assert!(matches!(cfg.validate(), Err(HarnessError::CandidateUnavailable { .. })));
    }

    #[test]
    fn candidate_file_is_rejected() {
        let parent = tempdir().unwrap();
        let file = parent.path().join("file");
        fs::write(&file, b"").unwrap();
        let cfg = HarnessConfig::new(&file).with_reference_parent(parent.path());
        assert!(matches!(cfg.validate(), Err(HarnessError::CandidateUnavailable { .. })));
    }

    #[test]
    fn reference_inside_candidate_overlaps() {
        let candidate = tempdir().unwrap();
        let nested = candidate.path().join("refs");
        fs::create_dir(&nested).unwrap();

        let cfg = HarnessConfig::new(candidate.path()).with_reference_parent(&nested);
        assert!(matches!(cfg.validate(), Err(HarnessError::RootsOverlap { .. })));

        let same = HarnessConfig::new(candidate.path()).with_reference_parent(candidate.path());
        assert!(matches!(same.validate(), Err(HarnessError::RootsOverlap { .. })));
    }

    #[test]
    fn only_collects_names() {
        let cfg = HarnessConfig::new("/mnt").with_only(["open-close", "open-missing"]);
        assert_eq!(cfg.only, ["open-close", "open-missing"]);
    }
}
