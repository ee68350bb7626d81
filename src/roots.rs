// Root Manager
// One fresh reference root per scenario, removed afterwards whatever state the
// scenario left it in.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use log::{debug, warn};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;
use vfs::{HostFs, Root};

const REFERENCE_PREFIX: &str = "fs-parity-ref-";

/// Owner-only access, enough to list and unlink during teardown.
const TEARDOWN_DIR_MODE: u32 = 0o700;

/// Exclusively owned by the scenario that set it up. Dropping it without
/// `teardown` still removes the tree, but cannot report a failure.
#[derive(Debug)]
pub struct ReferenceRoot {
    dir: TempDir,
    root: Root,
}

pub fn setup_reference(config: &HarnessConfig) -> Result<ReferenceRoot, HarnessError> {
    let parent = &config.reference_parent;
    ensure_disjoint(config)?;
    let dir = tempfile::Builder::new()
        .prefix(REFERENCE_PREFIX)
        .tempdir_in(parent)
        .map_err(|source| HarnessError::ReferenceSetup { parent: parent.clone(), source })?;

    let mut entries = fs::read_dir(dir.path())
        .map_err(|source| HarnessError::ReferenceSetup { parent: parent.clone(), source })?;
    if entries.next().is_some() {
        return Err(HarnessError::ReferenceNotEmpty(dir.path().to_path_buf()));
    }

    debug!("reference root ready at {}", dir.path().display());
    Ok(ReferenceRoot { root: Root::reference(dir.path()), dir })
}

impl ReferenceRoot {
    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn fs(&self) -> HostFs {
        HostFs::new(self.root.clone())
    }

    pub fn teardown(self) -> Result<(), HarnessError> {
        let path = self.dir.path().to_path_buf();
        let fail = |source| HarnessError::ReferenceTeardown { path: path.clone(), source };

        if let Err(first) = fs::remove_dir_all(&path) {
            // A scenario may leave unwritable directories behind.
            warn!("removing {} failed ({}), retrying with permissions restored", path.display(), first);
            restore_write_access(&path).map_err(fail)?;
            fs::remove_dir_all(&path).map_err(fail)?;
        }
        if path.exists() {
            return Err(fail(io::Error::other("tree still present after removal")));
        }
        debug!("reference root {} removed", path.display());
        Ok(())
    }
}

/// Reference roots must never land inside the candidate, whether or not the
/// configuration was validated up front.
fn ensure_disjoint(config: &HarnessConfig) -> Result<(), HarnessError> {
    // A candidate that does not resolve on the host cannot contain the parent.
    let Ok(candidate) = fs::canonicalize(&config.candidate_root) else {
        return Ok(());
    };
    let reference = fs::canonicalize(&config.reference_parent).map_err(|source| {
        HarnessError::ReferenceSetup { parent: config.reference_parent.clone(), source }
    })?;
    if reference.starts_with(&candidate) {
        return Err(HarnessError::RootsOverlap { candidate, reference });
    }
    Ok(())
}

fn restore_write_access(dir: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(dir)?;
    if !meta.is_dir() {
        return Ok(());
    }
    fs::set_permissions(dir, fs::Permissions::from_mode(TEARDOWN_DIR_MODE))?;
    for entry in fs::read_dir(dir)? {
        restore_write_access(&entry?.path())?;
    }
    Ok(())
}
