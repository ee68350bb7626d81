// Equivalence Comparator
// Mixed success/failure is never equivalent. That mismatch is the signal the
// whole harness exists to find.

use abi::{OpKind, Outcome, Value};

pub fn compare(a: &Outcome, b: &Outcome, kind: OpKind) -> bool {
    match (a, b) {
        (Outcome::Failure(x), Outcome::Failure(y)) => x == y,
        (Outcome::Success(x), Outcome::Success(y)) => match kind {
            // Entries are already name sets, so creation and storage order drop out.
            OpKind::ListDirectory => {
                matches!((x, y), (Value::Entries(l), Value::Entries(r)) if l == r)
            }
            OpKind::ReadBytes => matches!((x, y), (Value::Bytes(l), Value::Bytes(r)) if l == r),
            OpKind::WriteBytes => {
                matches!((x, y), (Value::Written(l), Value::Written(r)) if l == r)
            }
            OpKind::Stat => matches!((x, y), (Value::Node(l), Value::Node(r)) if l == r),
            // Handles are not comparable across roots.
            OpKind::CreateDirectory | OpKind::CreateNode | OpKind::OpenFile | OpKind::CloseFile => {
                true
            }
        },
        _ => false,
    }
}
