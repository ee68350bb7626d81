// Harness Application Binary Interface (ABI)
// The fixed operation set a conformance scenario is written in, and the
// machine that executes it against one root.

pub mod isa;
pub mod vm;

pub use isa::{OpKind, Operation, Slot};
pub use vm::{Machine, Outcome, Trace, Trap, Value, Violation};
