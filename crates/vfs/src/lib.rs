// Virtual File System (VFS)
// The surface a conformance root exposes to the harness. The candidate mount
// and the host reference are driven through exactly the same calls.

mod error;
mod host;

pub use error::VfsError;
pub use host::HostFs;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Reference,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Candidate => f.write_str("candidate"),
            Role::Reference => f.write_str("reference"),
        }
    }
}

/// A directory tree playing one side of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
    role: Role,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, role: Role) -> Self {
        Self { path: path.into(), role }
    }

    pub fn candidate(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Role::Candidate)
    }

    pub fn reference(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Role::Reference)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Resolves a root-relative operation path.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} root {}", self.role, self.path.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
    Other,
}

pub trait Vfs {
    /// Open descriptor. Owned by whoever opened it until handed back to `close`.
    type Handle;

    fn root(&self) -> &Root;

    /// Creates exactly one directory level.
    fn create_dir(&self, path: &str) -> Result<(), VfsError>;

    /// Creates an empty regular file, failing if anything already sits at `path`.
    fn create_node(&self, path: &str) -> Result<(), VfsError>;

    /// Entry names as raw bytes, without `.` and `..`.
    fn list_dir(&self, path: &str) -> Result<BTreeSet<OsString>, VfsError>;

    fn stat(&self, path: &str) -> Result<NodeKind, VfsError>;

    /// Never creates and never truncates.
    fn open(&self, path: &str, mode: OpenMode) -> Result<Self::Handle, VfsError>;

    fn close(&self, handle: Self::Handle) -> Result<(), VfsError>;

    /// Up to `count` bytes from the current position. Fewer at end of data.
    fn read(&self, handle: &mut Self::Handle, count: usize) -> Result<Vec<u8>, VfsError>;

    /// Returns the number of bytes the underlying call accepted.
    fn write(&self, handle: &mut Self::Handle, data: &[u8]) -> Result<usize, VfsError>;
}
