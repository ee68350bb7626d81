// Harness Driver
// Per scenario: Idle -> RootReady -> Executing -> Comparing -> TornDown.
// Every step runs against the candidate first, then the whole sequence runs
// against the reference; later steps may depend on earlier side effects.

use crate::catalog::{self, Expectation, Scenario};
use crate::compare::compare;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::report::{Divergence, RunReport, ScenarioReport, Verdict};
use crate::roots::{self, ReferenceRoot};
use abi::{Machine, Trace};
use log::{debug, error, info, warn};
use vfs::{HostFs, Role, Root, Vfs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    RootReady,
    Executing,
    Comparing,
    TornDown,
}

impl Phase {
    fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::RootReady,
            Phase::RootReady => Phase::Executing,
            Phase::Executing => Phase::Comparing,
            Phase::Comparing | Phase::TornDown => Phase::TornDown,
        }
    }
}

struct ScenarioRun<'a> {
    name: &'a str,
    phase: Phase,
}

impl ScenarioRun<'_> {
    fn advance(&mut self) {
        let next = self.phase.next();
        debug!("{}: {:?} -> {:?}", self.name, self.phase, next);
        self.phase = next;
    }
}

pub struct Harness<C: Vfs> {
    config: HarnessConfig,
    candidate: C,
}

impl Harness<HostFs> {
    /// Validates the configuration and drives the mount at `candidate_root`.
    pub fn for_mount(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let candidate = HostFs::new(Root::candidate(&config.candidate_root));
        Ok(Self { config, candidate })
    }
}

impl<C: Vfs> Harness<C> {
    pub fn new(config: HarnessConfig, candidate: C) -> Self {
        Self { config, candidate }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Catalog scenarios selected by `config.only`, in catalog order.
    pub fn selected(&self) -> Result<Vec<&'static Scenario>, HarnessError> {
        if self.config.only.is_empty() {
            return Ok(catalog::catalog().iter().collect());
        }
        if let Some(unknown) = self.config.only.iter().find(|n| catalog::find(n).is_none()) {
            return Err(HarnessError::UnknownScenario(unknown.clone()));
        }
        Ok(catalog::catalog()
            .iter()
            .filter(|s| self.config.only.iter().any(|n| n == s.name))
            .collect())
    }

    pub fn run_catalog(&self) -> Result<RunReport, HarnessError> {
        let scenarios = self.selected()?;
        self.run(scenarios)
    }

    /// Runs scenarios one at a time. A failing scenario is recorded and the
    /// run moves on; an environment fault stops it.
    pub fn run<'s>(
        &self,
        scenarios: impl IntoIterator<Item = &'s Scenario>,
    ) -> Result<RunReport, HarnessError> {
        let mut report = RunReport::default();
        for scenario in scenarios {
            match self.run_scenario(scenario) {
                Ok(result) => report.scenarios.push(result),
                Err(e) => {
                    error!("{}: aborting run: {}", scenario.name, e);
                    return Err(e);
                }
            }
        }
        info!("{} passed, {} failed", report.pass_count(), report.fail_count());
        Ok(report)
    }

    pub fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioReport, HarnessError> {
        if let Err(violation) = scenario.validate() {
            warn!("{}: malformed scenario: {}", scenario.name, violation);
            return Ok(ScenarioReport {
                name: scenario.name.to_string(),
                verdict: Verdict::Violated,
                divergences: Vec::new(),
                violation: Some(format!("malformed scenario: {violation}")),
                reference_outcomes: Vec::new(),
            });
        }

        let mut run = ScenarioRun { name: scenario.name, phase: Phase::Idle };
        let reference = roots::setup_reference(&self.config)?;
        run.advance();

        let (candidate, baseline) = self.execute(scenario, &reference, &mut run);
        run.advance();
        let report = judge(scenario, candidate, baseline);

        reference.teardown()?;
        run.advance();
        debug_assert_eq!(run.phase, Phase::TornDown);

        if report.passed() {
            info!("{}: passed", scenario.name);
        } else {
            warn!("{}: {:?}", scenario.name, report.verdict);
        }
        Ok(report)
    }

    fn execute(
        &self,
        scenario: &Scenario,
        reference: &ReferenceRoot,
        run: &mut ScenarioRun<'_>,
    ) -> (Trace, Trace) {
        run.advance();
        let candidate = Machine::new(&self.candidate).run(&scenario.steps);
        let reference_fs = reference.fs();
        let baseline = Machine::new(&reference_fs).run(&scenario.steps);
        (candidate, baseline)
    }
}

/// Compares two traces step by step over the steps both roots completed.
/// A divergence seen before a trap outranks the trap.
pub fn judge(scenario: &Scenario, candidate: Trace, reference: Trace) -> ScenarioReport {
    let divergences: Vec<Divergence> = scenario
        .steps
        .iter()
        .zip(candidate.outcomes.iter().zip(&reference.outcomes))
        .enumerate()
        .filter(|(_, (op, (c, r)))| !compare(c, r, op.kind()))
        .map(|(step, (op, (c, r)))| Divergence {
            step,
            operation: op.clone(),
            candidate: c.clone(),
            reference: r.clone(),
        })
        .collect();

    for d in &divergences {
        warn!(
            "{}: step {} `{}` diverged: candidate {} vs reference {}",
            scenario.name, d.step, d.operation, d.candidate, d.reference
        );
    }

    let traps: Vec<String> = [(Role::Candidate, &candidate.trap), (Role::Reference, &reference.trap)]
        .into_iter()
        .filter_map(|(role, trap)| {
            trap.as_ref().map(|t| format!("{role} trapped at step {}: {}", t.step, t.violation))
        })
        .collect();
    let violation = (!traps.is_empty()).then(|| traps.join("; "));

    let verdict = match (scenario.expect, divergences.is_empty(), violation.is_some()) {
        (Expectation::Equivalent, false, _) => Verdict::Diverged,
        (Expectation::Divergent, false, _) => Verdict::Passed,
        (_, true, true) => Verdict::Violated,
        (Expectation::Equivalent, true, false) => Verdict::Passed,
        (Expectation::Divergent, true, false) => Verdict::UnexpectedEquivalence,
    };

    ScenarioReport {
        name: scenario.name.to_string(),
        verdict,
        divergences,
        violation,
        reference_outcomes: reference.outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::{Operation, Outcome, Slot, Trap, Value, Violation};
    use vfs::VfsError;

    fn trace(outcomes: Vec<Outcome>) -> Trace {
        Trace { outcomes, trap: None }
    }

    fn dup() -> Scenario {
        Scenario::new("dup", "", vec![Operation::mkdir("d"), Operation::mkdir("d")])
    }

    #[test]
    fn phases_run_in_order() {
        let mut phase = Phase::Idle;
        let mut seen = vec![phase];
        for _ in 0..4 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            [Phase::Idle, Phase::RootReady, Phase::Executing, Phase::Comparing, Phase::TornDown]
        );
    }

    #[test]
    fn matching_traces_pass() {
        let t = trace(vec![
            Outcome::Success(Value::Unit),
            Outcome::Failure(VfsError::AlreadyExists),
        ]);
        let report = judge(&dup(), t.clone(), t);
        assert_eq!(report.verdict, Verdict::Passed);
        assert!(report.divergences.is_empty());
    }

    #[test]
    fn mismatched_codes_diverge_at_their_step() {
        let cand = trace(vec![Outcome::Success(Value::Unit), Outcome::Failure(VfsError::Other(99))]);
        let reference = trace(vec![
            Outcome::Success(Value::Unit),
            Outcome::Failure(VfsError::AlreadyExists),
        ]);
        let report = judge(&dup(), cand, reference);
        assert_eq!(report.verdict, Verdict::Diverged);
        assert_eq!(report.first_divergence().map(|d| d.step), Some(1));
    }

    #[test]
    fn divergence_before_a_trap_wins() {
        let scenario = Scenario::new(
            "trap",
            "",
            vec![
                Operation::open("f", vfs::OpenMode::Read, Slot(0)),
                Operation::read(Slot(0), 4),
            ],
        );
        let cand = Trace {
            outcomes: vec![Outcome::Failure(VfsError::NotFound)],
            trap: Some(Trap { step: 1, violation: Violation::UnknownSlot(Slot(0)) }),
        };
        let reference = trace(vec![
            Outcome::Success(Value::Handle(Slot(0))),
            Outcome::Success(Value::Bytes(Vec::new())),
        ]);
        let report = judge(&scenario, cand, reference);
        assert_eq!(report.verdict, Verdict::Diverged);
        assert!(report.violation.as_deref().unwrap().starts_with("candidate trapped at step 1"));
    }

    #[test]
    fn trap_without_divergence_is_a_violation() {
        let scenario = Scenario::new("w", "", vec![Operation::write(Slot(0), b"abc")]);
        let short = Trace {
            outcomes: Vec::new(),
            trap: Some(Trap { step: 0, violation: Violation::ShortWrite { expected: 3, written: 1 } }),
        };
        let report = judge(&scenario, short, trace(vec![Outcome::Success(Value::Written(3))]));
        assert_eq!(report.verdict, Verdict::Violated);
    }

    #[test]
    fn expected_divergence_must_appear() {
        let scenario = dup().expecting(Expectation::Divergent);
        let t = trace(vec![
            Outcome::Success(Value::Unit),
            Outcome::Failure(VfsError::AlreadyExists),
        ]);
        assert_eq!(judge(&scenario, t.clone(), t).verdict, Verdict::UnexpectedEquivalence);
    }
}
