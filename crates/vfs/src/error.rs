// Normalized error codes.
// Two roots agree on a failure when their codes agree; the rendered OS message
// is never compared.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum VfsError {
    #[error("already exists")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("permission denied")]
    PermissionDenied,
    /// Raw errno, or -1 when the fault carried none.
    #[error("os error {0}")]
    Other(i32),
}

impl VfsError {
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EEXIST => VfsError::AlreadyExists,
            libc::ENOENT => VfsError::NotFound,
            libc::ENOTDIR => VfsError::NotADirectory,
            libc::EISDIR => VfsError::IsADirectory,
            libc::EACCES => VfsError::PermissionDenied,
            raw => VfsError::Other(raw),
        }
    }
}

impl From<io::Error> for VfsError {
    fn from(err: io::Error) -> Self {
        if let Some(raw) = err.raw_os_error() {
            return VfsError::from_errno(raw);
        }
        match err.kind() {
            io::ErrorKind::AlreadyExists => VfsError::AlreadyExists,
            io::ErrorKind::NotFound => VfsError::NotFound,
            io::ErrorKind::PermissionDenied => VfsError::PermissionDenied,
            _ => VfsError::Other(-1),
        }
    }
}
