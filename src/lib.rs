// fs-parity: differential conformance of a mounted filesystem against the
// host filesystem, over a fixed catalog of operations.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod roots;

pub use catalog::{catalog, Expectation, Scenario};
pub use compare::compare;
pub use config::HarnessConfig;
pub use driver::Harness;
pub use error::HarnessError;
pub use report::{Divergence, RunReport, ScenarioReport, Verdict};
pub use roots::{setup_reference, ReferenceRoot};

pub const BANNER: &str = r#"
================================================================================
FS-PARITY // CANDIDATE vs REFERENCE
================================================================================
"#;

/// Runs the selected catalog against the mount named in `config`.
pub fn run_suite(config: HarnessConfig) -> Result<RunReport, HarnessError> {
    Harness::for_mount(config)?.run_catalog()
}
