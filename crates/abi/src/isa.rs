use serde::{Deserialize, Serialize};
use std::fmt;
use vfs::OpenMode;

/// Scenario-local name for an open descriptor. `OpenFile` binds it, the
/// other handle operations consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot(pub u8);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    // --- Namespace ---
    CreateDirectory,
    CreateNode,
    ListDirectory,
    Stat,

    // --- Descriptors ---
    OpenFile,
    CloseFile,

    // --- Data ---
    WriteBytes,
    ReadBytes,
}

/// A pure descriptor. Carries no result until a `Machine` executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateDirectory { path: String },
    CreateNode { path: String },
    ListDirectory { path: String },
    Stat { path: String },
    OpenFile { path: String, mode: OpenMode, slot: Slot },
    CloseFile { slot: Slot },
    WriteBytes { slot: Slot, data: Vec<u8> },
    ReadBytes { slot: Slot, count: usize },
}

impl Operation {
    pub fn mkdir(path: &str) -> Self {
        Operation::CreateDirectory { path: path.into() }
    }

    pub fn mknod(path: &str) -> Self {
        Operation::CreateNode { path: path.into() }
    }

    pub fn readdir(path: &str) -> Self {
        Operation::ListDirectory { path: path.into() }
    }

    pub fn stat(path: &str) -> Self {
        Operation::Stat { path: path.into() }
    }

    pub fn open(path: &str, mode: OpenMode, slot: Slot) -> Self {
        Operation::OpenFile { path: path.into(), mode, slot }
    }

    pub fn close(slot: Slot) -> Self {
        Operation::CloseFile { slot }
    }

    pub fn write(slot: Slot, data: &[u8]) -> Self {
        Operation::WriteBytes { slot, data: data.to_vec() }
    }

    pub fn read(slot: Slot, count: usize) -> Self {
        Operation::ReadBytes { slot, count }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operation::CreateDirectory { .. } => OpKind::CreateDirectory,
            Operation::CreateNode { .. } => OpKind::CreateNode,
            Operation::ListDirectory { .. } => OpKind::ListDirectory,
            Operation::Stat { .. } => OpKind::Stat,
            Operation::OpenFile { .. } => OpKind::OpenFile,
            Operation::CloseFile { .. } => OpKind::CloseFile,
            Operation::WriteBytes { .. } => OpKind::WriteBytes,
            Operation::ReadBytes { .. } => OpKind::ReadBytes,
        }
    }

    /// Root-relative path, for the operations addressed by path.
    pub fn path(&self) -> Option<&str> {
        match self {
            Operation::CreateDirectory { path }
            | Operation::CreateNode { path }
            | Operation::ListDirectory { path }
            | Operation::Stat { path }
            | Operation::OpenFile { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn slot(&self) -> Option<Slot> {
        match self {
            Operation::OpenFile { slot, .. }
            | Operation::CloseFile { slot }
            | Operation::WriteBytes { slot, .. }
            | Operation::ReadBytes { slot, .. } => Some(*slot),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateDirectory { path } => write!(f, "mkdir {path}"),
            Operation::CreateNode { path } => write!(f, "mknod {path}"),
            Operation::ListDirectory { path } => write!(f, "readdir {path}"),
            Operation::Stat { path } => write!(f, "stat {path}"),
            Operation::OpenFile { path, mode, slot } => write!(f, "open {path} {mode:?} -> {slot}"),
            Operation::CloseFile { slot } => write!(f, "close {slot}"),
            Operation::WriteBytes { slot, data } => write!(f, "write {slot} ({} bytes)", data.len()),
            Operation::ReadBytes { slot, count } => write!(f, "read {slot} ({count} bytes)"),
        }
    }
}
