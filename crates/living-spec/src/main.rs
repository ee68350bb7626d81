use abi::{Machine, OpKind, Operation, Outcome, Value};
use colored::*;
use fs_parity::catalog::{self, ROUNDTRIP_PAYLOAD};
use fs_parity::{compare, setup_reference, Harness, HarnessConfig, Verdict};
use std::fs;
use tempfile::{tempdir, TempDir};
use vfs::{HostFs, Root, VfsError};

const MANIFESTO: &str = r#"
================================================================================
FS-PARITY // LIVING SPECIFICATION
================================================================================

[ MISSION ]
Prove a mounted filesystem answers a fixed catalog of operations exactly as
the host filesystem does, failures included.

[ PROPERTIES ]
--------------------------------------------------------------------------------
[x] Reference outcomes are deterministic on a clean root.
[x] Teardown then setup leaves a usable, empty reference root.
[x] Round trip of "whatever bruh" reads back 13 identical bytes.
[x] Duplicate mkdir fails with equal codes on both roots.
[x] Listing a missing directory fails with equal codes on both roots.
[x] Listings compare as sets, whatever the creation order.
[x] Success against failure is always flagged.

================================================================================
UNIT TEST SUITE
================================================================================
"#;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    println!("{}", MANIFESTO);
    let mut passed = 0;
    let mut failed = 0;

    run_test("REFERENCE_DETERMINISM", test_reference_determinism, &mut passed, &mut failed);
    run_test("TEARDOWN_IDEMPOTENCE", test_teardown_idempotence, &mut passed, &mut failed);
    run_test("WRITE_READ_ROUNDTRIP", test_roundtrip, &mut passed, &mut failed);
    run_test("DUPLICATE_MKDIR", test_duplicate_mkdir, &mut passed, &mut failed);
    run_test("MISSING_PATH_LISTING", test_missing_listing, &mut passed, &mut failed);
    run_test("LISTING_SET_EQUALITY", test_set_equality, &mut passed, &mut failed);
    run_test("DIVERGENCE_DETECTION", test_divergence_detection, &mut passed, &mut failed);
    run_test("HOST_CATALOG_PARITY", test_host_catalog, &mut passed, &mut failed);

    println!("\n--------------------------------------------------------------------------------");
    println!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", "ALL SYSTEMS NOMINAL.".green().bold());
    } else {
        std::process::exit(1);
    }
}

// --- TEST INFRASTRUCTURE ---

fn run_test<F>(name: &str, test_fn: F, passed: &mut i32, failed: &mut i32)
where F: Fn() -> Result<(), String> {
    print!("TEST: {:<30} ... ", name);
    match test_fn() {
        Ok(_) => { println!("{}", "PASS".green()); *passed += 1; }
        Err(e) => { println!("{}", "FAIL".red()); println!("  -> {}", e); *failed += 1; }
    }
}

/// A throwaway candidate mount and reference parent.
struct Sandbox {
    candidate: TempDir,
    parent: TempDir,
}

impl Sandbox {
    fn new() -> Result<Self, String> {
        Ok(Self {
            candidate: tempdir().map_err(|e| e.to_string())?,
            parent: tempdir().map_err(|e| e.to_string())?,
        })
    }

    fn config(&self) -> HarnessConfig {
        HarnessConfig::new(self.candidate.path()).with_reference_parent(self.parent.path())
    }

    fn harness(&self) -> Result<Harness<HostFs>, String> {
        Harness::for_mount(self.config()).map_err(|e| e.to_string())
    }
}

fn scenario(name: &str) -> Result<&'static catalog::Scenario, String> {
    catalog::find(name).ok_or_else(|| format!("{name} missing from catalog"))
}

fn reference_outcomes(name: &str) -> Result<Vec<Outcome>, String> {
    let sandbox = Sandbox::new()?;
    let report = sandbox.harness()?.run_scenario(scenario(name)?).map_err(|e| e.to_string())?;
    if !report.passed() {
        return Err(format!("{name}: {report}"));
    }
    Ok(report.reference_outcomes)
}

fn test_reference_determinism() -> Result<(), String> {
    for s in catalog::catalog() {
        let first = reference_outcomes(s.name)?;
        let second = reference_outcomes(s.name)?;
        if first != second { return Err(format!("{} differs between clean runs", s.name)); }
    }
    Ok(())
}

fn test_teardown_idempotence() -> Result<(), String> {
    let sandbox = Sandbox::new()?;
    let cfg = sandbox.config();
    let reference = setup_reference(&cfg).map_err(|e| e.to_string())?;
    let fs = reference.fs();
    let mut vm = Machine::new(&fs);
    for op in &scenario("list-directory")?.steps {
        vm.execute(op).map_err(|e| e.to_string())?;
    }
    drop(vm);
    reference.teardown().map_err(|e| e.to_string())?;

    let again = setup_reference(&cfg).map_err(|e| e.to_string())?;
    let entries = fs::read_dir(again.path()).map_err(|e| e.to_string())?.count();
    again.teardown().map_err(|e| e.to_string())?;
    if entries != 0 { return Err(format!("fresh root holds {entries} entries")); }

    let leftovers = fs::read_dir(sandbox.parent.path()).map_err(|e| e.to_string())?.count();
    if leftovers != 0 { return Err(format!("{leftovers} reference roots left behind")); }
    Ok(())
}

fn test_roundtrip() -> Result<(), String> {
    let outcomes = reference_outcomes("write-read-roundtrip")?;
    let expected = Outcome::Success(Value::Bytes(ROUNDTRIP_PAYLOAD.to_vec()));
    if outcomes.get(5) != Some(&expected) {
        return Err(format!("read back {:?}", outcomes.get(5)));
    }
    Ok(())
}

fn test_duplicate_mkdir() -> Result<(), String> {
    let outcomes = reference_outcomes("create-directory-duplicate")?;
    match outcomes.get(1) {
        Some(Outcome::Failure(VfsError::AlreadyExists)) => Ok(()),
        other => Err(format!("second mkdir gave {other:?}")),
    }
}

fn test_missing_listing() -> Result<(), String> {
    let outcomes = reference_outcomes("list-directory-missing")?;
    match outcomes.first() {
        Some(Outcome::Failure(VfsError::NotFound)) => Ok(()),
        other => Err(format!("listing bleh gave {other:?}")),
    }
}

fn test_set_equality() -> Result<(), String> {
    let sandbox = Sandbox::new()?;
    let left = HostFs::new(Root::candidate(sandbox.candidate.path()));
    let right = HostFs::new(Root::reference(sandbox.parent.path()));

    let forward = ["one", "two", "three"];
    let listing = |fs: &HostFs, order: &[&str]| -> Result<Outcome, String> {
        let mut vm = Machine::new(fs);
        vm.execute(&Operation::mkdir("testReadDir")).map_err(|e| e.to_string())?;
        for child in order {
            vm.execute(&Operation::mkdir(&format!("testReadDir/{child}"))).map_err(|e| e.to_string())?;
        }
        vm.execute(&Operation::readdir("testReadDir")).map_err(|e| e.to_string())
    };
    let a = listing(&left, &forward[..])?;
    let mut reversed = forward;
    reversed.reverse();
    let b = listing(&right, &reversed[..])?;

    if !compare(&a, &b, OpKind::ListDirectory) { return Err(format!("{a} != {b}")); }
    Ok(())
}

fn test_divergence_detection() -> Result<(), String> {
    let sandbox = Sandbox::new()?;
    fs::create_dir(sandbox.candidate.path().join("bleh")).map_err(|e| e.to_string())?;
    let report = sandbox
        .harness()?
        .run_scenario(scenario("list-directory-missing")?)
        .map_err(|e| e.to_string())?;
    if report.verdict != Verdict::Diverged {
        return Err(format!("expected divergence, got {:?}", report.verdict));
    }
    Ok(())
}

fn test_host_catalog() -> Result<(), String> {
    let sandbox = Sandbox::new()?;
    let report = sandbox.harness()?.run_catalog().map_err(|e| e.to_string())?;
    if !report.all_passed() { return Err(report.to_string()); }
    Ok(())
}
