use abi::{Operation, Outcome};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// Candidate and reference disagreed on at least one step.
    Diverged,
    /// The scenario itself broke a harness invariant.
    Violated,
    /// An expected divergence never showed up.
    UnexpectedEquivalence,
}

impl Verdict {
    pub fn passed(self) -> bool {
        self == Verdict::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub step: usize,
    pub operation: Operation,
    pub candidate: Outcome,
    pub reference: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub verdict: Verdict,
    pub divergences: Vec<Divergence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
    /// Reference-side outcomes, in step order.
    #[serde(skip)]
    pub reference_outcomes: Vec<Outcome>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.verdict.passed()
    }

    pub fn first_divergence(&self) -> Option<&Divergence> {
        self.divergences.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn pass_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.scenarios.len() - self.pass_count()
    }

    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        write!(f, "SCENARIO: {:<34} ... {}", self.name, status)?;
        if !self.passed() {
            write!(f, " ({:?})", self.verdict)?;
        }
        for d in &self.divergences {
            write!(f, "\n  -> step {} `{}`", d.step, d.operation)?;
            write!(f, "\n       candidate: {}", d.candidate)?;
            write!(f, "\n       reference: {}", d.reference)?;
        }
        if let Some(violation) = &self.violation {
            write!(f, "\n  -> {violation}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scenario in &self.scenarios {
            writeln!(f, "{scenario}")?;
        }
        write!(f, "{} passed, {} failed", self.pass_count(), self.fail_count())
    }
}
