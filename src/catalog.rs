// Scenario Catalog
// Fixed operation sequences run identically against both roots. The candidate
// root persists across scenarios, so every scenario creates under its own names.

use abi::vm::check_path;
use abi::{Operation, Slot, Violation};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use vfs::OpenMode;

pub const ROUNDTRIP_PAYLOAD: &[u8] = b"whatever bruh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Every step must be equivalent.
    Equivalent,
    /// At least one step must diverge.
    Divergent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<Operation>,
    pub expect: Expectation,
}

impl Scenario {
    pub fn new(name: &'static str, description: &'static str, steps: Vec<Operation>) -> Self {
        Self { name, description, steps, expect: Expectation::Equivalent }
    }

    pub fn expecting(mut self, expect: Expectation) -> Self {
        self.expect = expect;
        self
    }

    /// Static checks that need no filesystem: paths stay inside the root, and
    /// no step uses a slot that is not bound or rebinds one still open.
    pub fn validate(&self) -> Result<(), Violation> {
        let mut bound: BTreeSet<Slot> = BTreeSet::new();
        for op in &self.steps {
            if let Some(path) = op.path() {
                check_path(path)?;
            }
            match op {
                Operation::OpenFile { slot, .. } => {
                    if !bound.insert(*slot) {
                        return Err(Violation::SlotInUse(*slot));
                    }
                }
                Operation::CloseFile { slot } => {
                    if !bound.remove(slot) {
                        return Err(Violation::UnknownSlot(*slot));
                    }
                }
                Operation::WriteBytes { slot, .. } | Operation::ReadBytes { slot, .. } => {
                    if !bound.contains(slot) {
                        return Err(Violation::UnknownSlot(*slot));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Paths this scenario may create on the candidate.
    pub fn created_paths(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|op| match op {
            Operation::CreateDirectory { path } | Operation::CreateNode { path } => {
                Some(path.as_str())
            }
            _ => None,
        })
    }
}

static CATALOG: OnceLock<Vec<Scenario>> = OnceLock::new();

/// The conformance baseline followed by the extended edge cases.
pub fn catalog() -> &'static [Scenario] {
    CATALOG.get_or_init(build)
}

pub fn find(name: &str) -> Option<&'static Scenario> {
    catalog().iter().find(|s| s.name == name)
}

fn build() -> Vec<Scenario> {
    let fd = Slot(0);
    vec![
        Scenario::new(
            "create-directory",
            "directory can be created",
            vec![Operation::mkdir("testDir"), Operation::stat("testDir")],
        ),
        Scenario::new(
            "create-directory-duplicate",
            "creating the same directory twice fails the same way",
            vec![Operation::mkdir("testDirSame"), Operation::mkdir("testDirSame")],
        ),
        Scenario::new(
            "create-node",
            "node can be created",
            vec![Operation::mknod("hello.txt"), Operation::stat("hello.txt")],
        ),
        Scenario::new(
            "create-node-duplicate",
            "creating the same node twice fails the same way",
            vec![Operation::mknod("helloSame.txt"), Operation::mknod("helloSame.txt")],
        ),
        Scenario::new(
            "list-directory",
            "directory can be read",
            vec![
                Operation::mkdir("testReadDir"),
                Operation::mkdir("testReadDir/one"),
                Operation::mkdir("testReadDir/two"),
                Operation::mkdir("testReadDir/three"),
                Operation::readdir("testReadDir"),
            ],
        ),
        Scenario::new(
            "list-directory-missing",
            "listing a directory that was never created fails the same way",
            vec![Operation::readdir("bleh")],
        ),
        Scenario::new(
            "open-close",
            "a file can be opened and closed",
            vec![
                Operation::mknod("testOpenFile.txt"),
                Operation::open("testOpenFile.txt", OpenMode::Read, fd),
                Operation::close(fd),
            ],
        ),
        Scenario::new(
            "open-missing",
            "opening a file that does not exist fails the same way",
            vec![Operation::open("bleh", OpenMode::Read, fd)],
        ),
        Scenario::new(
            "write-read-roundtrip",
            "bytes written come back unchanged",
            vec![
                Operation::mknod("testWriteRead.txt"),
                Operation::open("testWriteRead.txt", OpenMode::Write, fd),
                Operation::write(fd, ROUNDTRIP_PAYLOAD),
                Operation::close(fd),
                Operation::open("testWriteRead.txt", OpenMode::Read, fd),
                Operation::read(fd, ROUNDTRIP_PAYLOAD.len()),
                Operation::close(fd),
            ],
        ),
        // Extended edge cases.
        Scenario::new(
            "create-directory-missing-parent",
            "creating below a missing parent fails the same way",
            vec![Operation::mkdir("noParent/child")],
        ),
        Scenario::new(
            "list-directory-not-a-directory",
            "listing a regular file fails the same way",
            vec![Operation::mknod("notADir.txt"), Operation::readdir("notADir.txt")],
        ),
        Scenario::new(
            "read-past-end",
            "reading past the end of data returns what is there",
            vec![
                Operation::mknod("testShortRead.txt"),
                Operation::open("testShortRead.txt", OpenMode::ReadWrite, fd),
                Operation::write(fd, b"short"),
                Operation::close(fd),
                Operation::open("testShortRead.txt", OpenMode::Read, fd),
                Operation::read(fd, 64),
                Operation::read(fd, 64),
                Operation::close(fd),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_present_in_order() {
        let names: Vec<_> = catalog().iter().take(9).map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "create-directory",
                "create-directory-duplicate",
                "create-node",
                "create-node-duplicate",
                "list-directory",
                "list-directory-missing",
                "open-close",
                "open-missing",
                "write-read-roundtrip",
            ]
        );
    }

    #[test]
    fn every_scenario_validates() {
        for scenario in catalog() {
            assert_eq!(scenario.validate(), Ok(()), "{}", scenario.name);
            assert_eq!(scenario.expect, Expectation::Equivalent);
        }
    }

    #[test]
    fn scenarios_create_disjoint_names() {
        let mut seen = BTreeSet::new();
        for scenario in catalog() {
            let mine: BTreeSet<&str> = scenario.created_paths().collect();
            for path in mine {
                assert!(seen.insert(path), "{} reuses {}", scenario.name, path);
            }
        }
    }

    #[test]
    fn names_are_unique_and_findable() {
        let names: BTreeSet<_> = catalog().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), catalog().len());
        assert!(find("open-missing").is_some());
        assert!(find("open-everything").is_none());
    }

    #[test]
    fn roundtrip_reads_back_the_whole_payload() {
        let scenario = find("write-read-roundtrip").unwrap();
        assert!(scenario.steps.contains(&Operation::read(Slot(0), 13)));
        assert_eq!(ROUNDTRIP_PAYLOAD.len(), 13);
    }

    #[test]
    fn validate_catches_slot_misuse() {
        let fd = Slot(1);
        let unbound = Scenario::new("x", "", vec![Operation::read(fd, 1)]);
        assert_eq!(unbound.validate(), Err(Violation::UnknownSlot(fd)));

        let rebound = Scenario::new(
            "y",
            "",
            vec![Operation::open("a", OpenMode::Read, fd), Operation::open("b", OpenMode::Read, fd)],
        );
        assert_eq!(rebound.validate(), Err(Violation::SlotInUse(fd)));

        let escaping = Scenario::new("z", "", vec![Operation::mkdir("../out")]);
        assert!(matches!(escaping.validate(), Err(Violation::InvalidPath(_))));
    }
}
