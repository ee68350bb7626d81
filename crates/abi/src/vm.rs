use crate::isa::{Operation, Slot};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path};
use thiserror::Error;
use vfs::{NodeKind, Vfs, VfsError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Unit,
    /// Descriptor values are opaque; only the slot they were bound to is kept.
    Handle(Slot),
    Entries(BTreeSet<OsString>),
    Bytes(Vec<u8>),
    Written(usize),
    Node(NodeKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Success(Value),
    Failure(VfsError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Result<Value, VfsError>> for Outcome {
    fn from(res: Result<Value, VfsError>) -> Self {
        match res {
            Ok(value) => Outcome::Success(value),
            Err(code) => Outcome::Failure(code),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(Value::Unit) => f.write_str("ok"),
            Outcome::Success(Value::Handle(slot)) => write!(f, "ok(handle {slot})"),
            Outcome::Success(Value::Entries(names)) => {
                let names: Vec<_> = names.iter().map(|n| n.to_string_lossy()).collect();
                write!(f, "ok({{{}}})", names.join(", "))
            }
            Outcome::Success(Value::Bytes(bytes)) => {
                write!(f, "ok({:?})", String::from_utf8_lossy(bytes))
            }
            Outcome::Success(Value::Written(n)) => write!(f, "ok({n} bytes written)"),
            Outcome::Success(Value::Node(kind)) => write!(f, "ok({kind:?})"),
            Outcome::Failure(code) => write!(f, "err({code})"),
        }
    }
}

/// Broken harness invariants. These say the scenario itself cannot be trusted,
/// so they never become an `Outcome`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("short write: {written} of {expected} bytes accepted")]
    ShortWrite { expected: usize, written: usize },
    #[error("slot {0} already holds an open handle")]
    SlotInUse(Slot),
    #[error("slot {0} holds no open handle")]
    UnknownSlot(Slot),
    #[error("path {0:?} does not stay inside the root")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trap {
    pub step: usize,
    pub violation: Violation,
}

/// Outcomes of a program, in order, up to the first trap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub outcomes: Vec<Outcome>,
    pub trap: Option<Trap>,
}

/// Rejects empty, absolute and `..`-bearing paths.
pub fn check_path(path: &str) -> Result<(), Violation> {
    let inside = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if inside {
        Ok(())
    } else {
        Err(Violation::InvalidPath(path.to_string()))
    }
}

/// Executes operations against one root. Owns every handle it opens; anything
/// still open when the machine goes away is closed on the way out.
pub struct Machine<'fs, V: Vfs> {
    fs: &'fs V,
    handles: BTreeMap<Slot, V::Handle>,
}

impl<'fs, V: Vfs> Machine<'fs, V> {
    pub fn new(fs: &'fs V) -> Self {
        Self { fs, handles: BTreeMap::new() }
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    pub fn execute(&mut self, op: &Operation) -> Result<Outcome, Violation> {
        if let Some(path) = op.path() {
            check_path(path)?;
        }

        let outcome = match op {
            Operation::CreateDirectory { path } => {
                Outcome::from(self.fs.create_dir(path).map(|()| Value::Unit))
            }
            Operation::CreateNode { path } => {
                Outcome::from(self.fs.create_node(path).map(|()| Value::Unit))
            }
            Operation::ListDirectory { path } => {
                Outcome::from(self.fs.list_dir(path).map(Value::Entries))
            }
            Operation::Stat { path } => Outcome::from(self.fs.stat(path).map(Value::Node)),
            Operation::OpenFile { path, mode, slot } => {
                if self.handles.contains_key(slot) {
                    return Err(Violation::SlotInUse(*slot));
                }
                match self.fs.open(path, *mode) {
                    Ok(handle) => {
                        self.handles.insert(*slot, handle);
                        Outcome::Success(Value::Handle(*slot))
                    }
                    Err(code) => Outcome::Failure(code),
                }
            }
            Operation::CloseFile { slot } => {
                let handle = self.handles.remove(slot).ok_or(Violation::UnknownSlot(*slot))?;
                Outcome::from(self.fs.close(handle).map(|()| Value::Unit))
            }
            Operation::WriteBytes { slot, data } => {
                let handle = self.handles.get_mut(slot).ok_or(Violation::UnknownSlot(*slot))?;
                match self.fs.write(handle, data) {
                    Ok(written) if written != data.len() => {
                        return Err(Violation::ShortWrite { expected: data.len(), written });
                    }
                    Ok(written) => Outcome::Success(Value::Written(written)),
                    Err(code) => Outcome::Failure(code),
                }
            }
            Operation::ReadBytes { slot, count } => {
                let handle = self.handles.get_mut(slot).ok_or(Violation::UnknownSlot(*slot))?;
                Outcome::from(self.fs.read(handle, *count).map(Value::Bytes))
            }
        };

        debug!("{}: {} => {}", self.fs.root().role(), op, outcome);
        Ok(outcome)
    }

    /// Runs every step in order, stopping at the first trap. Handles left
    /// open by the program are released before returning.
    pub fn run(&mut self, program: &[Operation]) -> Trace {
        let mut trace = Trace::default();
        for (step, op) in program.iter().enumerate() {
            match self.execute(op) {
                Ok(outcome) => trace.outcomes.push(outcome),
                Err(violation) => {
                    warn!("{}: step {} ({}) trapped: {}", self.fs.root().role(), step, op, violation);
                    trace.trap = Some(Trap { step, violation });
                    break;
                }
            }
        }
        let released = self.release_all();
        if released > 0 {
            debug!("{}: released {} handle(s) after run", self.fs.root().role(), released);
        }
        trace
    }

    /// Closes every handle still held. Returns how many there were.
    pub fn release_all(&mut self) -> usize {
        let held = std::mem::take(&mut self.handles);
        let count = held.len();
        for (slot, handle) in held {
            if let Err(code) = self.fs.close(handle) {
                warn!("{}: closing {} failed: {}", self.fs.root().role(), slot, code);
            }
        }
        count
    }
}

impl<V: Vfs> Drop for Machine<'_, V> {
    fn drop(&mut self) {
        let leaked = self.release_all();
        if leaked > 0 {
            warn!("{}: {} handle(s) released on drop", self.fs.root(), leaked);
        }
    }
}
