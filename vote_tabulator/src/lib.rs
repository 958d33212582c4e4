/*!
Validation of election definitions and incremental tabulation of counter counts.

A [`Tabulator`] is built from a [`Jurisdiction`] and an [`Election`], or
reloaded from a persisted [`TabulatorState`]. Counter counts are then added one
at a time with [`Tabulator::add_counter_count`].

User mistakes are reported as errors and warnings (plain strings, see
[`Message`]). Violations of the tabulator's own invariants are returned as
[`TabulatorError`] and abort the operation.
*/

pub mod builder;
mod config;
pub mod counter_count;
pub mod expected;
pub mod manual;
mod messages;
pub mod tally;
mod uid;
pub mod validator;

use log::{debug, info, warn};
use snafu::ensure;

pub use crate::config::*;
pub use crate::expected::{Expectation, ExpectedCountLedger};
pub use crate::messages::{Diagnostics, Message};
pub use crate::uid::{Uid, UidKind, UidRegistry};

use crate::counter_count::validate_counter_count;
use crate::validator::{validate_definitions, ValidatedDefinitions};

/// One tabulation: the definitions, the running tallies, and the ledger of
/// expected counter counts.
///
/// All mutations go through `&mut self`; a tabulator shared between threads
/// must be put behind a lock by its owner.
#[derive(Debug, Clone)]
pub struct Tabulator {
    registry: UidRegistry,
    ledger: ExpectedCountLedger,
    tabulator_state: TabulatorState,
    definition_diagnostics: Diagnostics,
    // Diagnostics of the last validation (construction or last submission).
    last: Diagnostics,
}

impl Tabulator {
    /// Validates fresh definitions and builds an empty tabulation.
    ///
    /// The errors and warnings are written into the `error_list` and
    /// `warning_list` of the definitions. A dataset with errors still builds a
    /// tabulator, check [`Tabulator::is_valid`] before using it.
    pub fn new(mut jurisdiction: Jurisdiction, mut election: Election) -> TabulatorResult<Tabulator> {
        info!(
            "Tabulator::new: jurisdiction {} election {}",
            jurisdiction.ident, election.ident
        );
        let v = validate_definitions(&jurisdiction, &election)?;
        jurisdiction.error_list = v.jurisdiction_diagnostics.errors.clone();
        jurisdiction.warning_list = v.jurisdiction_diagnostics.warnings.clone();
        election.error_list = v.election_diagnostics.errors.clone();
        election.warning_list = v.election_diagnostics.warnings.clone();
        Ok(Tabulator::assemble(jurisdiction, election, v))
    }

    fn assemble(jurisdiction: Jurisdiction, election: Election, v: ValidatedDefinitions) -> Tabulator {
        let mut definition_diagnostics = v.jurisdiction_diagnostics;
        definition_diagnostics.extend(v.election_diagnostics);
        Tabulator {
            registry: v.registry,
            ledger: v.ledger,
            tabulator_state: TabulatorState {
                election_ident: election.ident.clone(),
                jurisdiction_ident: jurisdiction.ident.clone(),
                jurisdiction_definition: jurisdiction,
                election_definition: election,
                contest_count_list: v.contest_tallies,
                question_count_list: v.question_tallies,
                counter_count_list: Vec::new(),
                state: State::Initial,
            },
            last: definition_diagnostics.clone(),
            definition_diagnostics,
        }
    }

    /// Rebuilds a tabulator from a snapshot by replaying its whole history.
    ///
    /// The definitions are validated again and every stored counter count is
    /// added again, in order. Every diagnostic computed on the way must be
    /// identical to the one stored in the snapshot, and the final tallies and
    /// state must match the stored ones. Any difference is fatal.
    pub fn from_snapshot(snapshot: TabulatorState) -> TabulatorResult<Tabulator> {
        let TabulatorState {
            election_ident,
            jurisdiction_ident,
            jurisdiction_definition,
            election_definition,
            contest_count_list,
            question_count_list,
            counter_count_list,
            state,
        } = snapshot;
        info!(
            "Tabulator::from_snapshot: jurisdiction {} election {}, {} counter counts",
            jurisdiction_ident,
            election_ident,
            counter_count_list.len()
        );

        ensure!(
            election_ident == election_definition.ident,
            SnapshotInconsistentSnafu {
                reason: format!(
                    "election_ident {} but election definition {}",
                    election_ident, election_definition.ident
                )
            }
        );
        ensure!(
            jurisdiction_ident == jurisdiction_definition.ident,
            SnapshotInconsistentSnafu {
                reason: format!(
                    "jurisdiction_ident {} but jurisdiction definition {}",
                    jurisdiction_ident, jurisdiction_definition.ident
                )
            }
        );

        let v = validate_definitions(&jurisdiction_definition, &election_definition)?;
        let j_subject = format!("jurisdiction definition {}", jurisdiction_ident);
        check_replay(
            &j_subject,
            &jurisdiction_definition.error_list,
            &v.jurisdiction_diagnostics.errors,
        )?;
        check_replay(
            &j_subject,
            &jurisdiction_definition.warning_list,
            &v.jurisdiction_diagnostics.warnings,
        )?;
        let e_subject = format!("election definition {}", election_ident);
        check_replay(
            &e_subject,
            &election_definition.error_list,
            &v.election_diagnostics.errors,
        )?;
        check_replay(
            &e_subject,
            &election_definition.warning_list,
            &v.election_diagnostics.warnings,
        )?;

        let mut tabulator = Tabulator::assemble(jurisdiction_definition, election_definition, v);

        for stored in counter_count_list.iter() {
            let mut cc = stored.clone();
            cc.error_list.clear();
            cc.warning_list.clear();
            let report = tabulator.process(cc)?;
            let subject = format!("counter count {}", stored.file_ident);
            check_replay(&subject, &stored.error_list, &report.errors)?;
            check_replay(&subject, &stored.warning_list, &report.warnings)?;
        }

        let current = &tabulator.tabulator_state;
        ensure!(
            current.contest_count_list == contest_count_list,
            SnapshotInconsistentSnafu {
                reason: "the stored contest tallies differ from the replayed ones".to_string()
            }
        );
        ensure!(
            current.question_count_list == question_count_list,
            SnapshotInconsistentSnafu {
                reason: "the stored question tallies differ from the replayed ones".to_string()
            }
        );
        ensure!(
            current.state == state,
            SnapshotInconsistentSnafu {
                reason: format!(
                    "stored state {} but replayed state {}",
                    state, current.state
                )
            }
        );

        tabulator.last = tabulator.definition_diagnostics.clone();
        Ok(tabulator)
    }

    /// Validates a counter count and, if it has no error, adds it to the tallies.
    ///
    /// A rejected counter count leaves the tabulator untouched. An `Err` is
    /// only returned for a broken invariant, never for bad input.
    pub fn add_counter_count(&mut self, cc: CounterCount) -> TabulatorResult<SubmissionReport> {
        if !self.is_valid() {
            warn!(
                "add_counter_count: the definitions of this tabulator have {} errors",
                self.definition_diagnostics.errors.len()
            );
        }
        self.process(cc)
    }

    fn process(&mut self, mut cc: CounterCount) -> TabulatorResult<SubmissionReport> {
        let mut diag = validate_counter_count(
            &cc,
            &self.registry,
            &self.tabulator_state.contest_count_list,
            &self.tabulator_state.question_count_list,
            &self.ledger,
            self.tabulator_state.state,
        );
        tally::check_overflow(
            &self.tabulator_state.contest_count_list,
            &self.tabulator_state.question_count_list,
            &cc,
            &mut diag,
        );

        if diag.has_errors() {
            info!(
                "process: rejected counter count {} ({}) with {} errors",
                cc.file_ident,
                cc.triple(),
                diag.errors.len()
            );
            self.last = diag.clone();
            return Ok(SubmissionReport {
                accepted: false,
                errors: diag.errors,
                warnings: diag.warnings,
            });
        }

        // Work on copies so that a broken invariant leaves the tallies intact.
        let mut contests = self.tabulator_state.contest_count_list.clone();
        let mut questions = self.tabulator_state.question_count_list.clone();
        tally::aggregate(&mut contests, &mut questions, &cc)?;
        self.registry.add(UidKind::File, &cc.file_ident)?;
        self.tabulator_state.contest_count_list = contests;
        self.tabulator_state.question_count_list = questions;

        let (counter, group, precinct) = (&cc.counter_ident, &cc.reporting_group, &cc.precinct_ident);
        match self.ledger.classify(counter, group, precinct) {
            Expectation::Expected => {}
            Expectation::WrongCounter => diag.warning(
                Message::new("Unexpected Counter UID")
                    .value(counter)
                    .then("in Counter Count")
                    .value(cc.triple()),
            ),
            Expectation::WrongGroup => diag.warning(
                Message::new("Unexpected Reporting Group")
                    .value(group)
                    .then("for Counter UID")
                    .value(counter),
            ),
            Expectation::WrongPrecinct => diag.warning(
                Message::new("Unexpected Precinct UID")
                    .value(precinct)
                    .then("for Counter UID")
                    .value(counter)
                    .then("Reporting Group")
                    .value(group),
            ),
        }
        self.ledger.fulfill(counter, group, precinct);
        self.advance_state();

        info!(
            "process: accepted counter count {} ({}), state {}",
            cc.file_ident,
            cc.triple(),
            self.tabulator_state.state
        );
        cc.error_list = Vec::new();
        cc.warning_list = diag.warnings.clone();
        self.tabulator_state.counter_count_list.push(cc);
        self.last = diag.clone();
        Ok(SubmissionReport {
            accepted: true,
            errors: diag.errors,
            warnings: diag.warnings,
        })
    }

    // The state only moves forward: INITIAL -> ACCUMULATING -> DONE.
    fn advance_state(&mut self) {
        let previous = self.tabulator_state.state;
        let mut next = previous;
        if next == State::Initial {
            next = State::Accumulating;
        }
        if next == State::Accumulating && self.ledger.is_complete() {
            next = State::Done;
        }
        if next != previous {
            info!("advance_state: {} -> {}", previous, next);
            self.tabulator_state.state = next;
        } else {
            debug!("advance_state: staying in {}", previous);
        }
    }

    pub fn state(&self) -> StateReport {
        StateReport {
            state: self.tabulator_state.state,
            missing: self.ledger.missing().to_vec(),
            finished: self.ledger.finished().to_vec(),
            total_expected: self.ledger.total(),
        }
    }

    /// Errors of the last validation: construction, reload or last submission.
    pub fn errors(&self) -> &[String] {
        &self.last.errors
    }

    /// Warnings of the last validation: construction, reload or last submission.
    pub fn warnings(&self) -> &[String] {
        &self.last.warnings
    }

    /// True if the definitions had no errors.
    pub fn is_valid(&self) -> bool {
        !self.definition_diagnostics.has_errors()
    }

    pub fn contest_tallies(&self) -> &[ContestTally] {
        &self.tabulator_state.contest_count_list
    }

    pub fn question_tallies(&self) -> &[QuestionTally] {
        &self.tabulator_state.question_count_list
    }

    pub fn registry(&self) -> &UidRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> &TabulatorState {
        &self.tabulator_state
    }

    pub fn into_snapshot(self) -> TabulatorState {
        self.tabulator_state
    }
}

fn check_replay(subject: &str, stored: &[String], recomputed: &[String]) -> TabulatorResult<()> {
    ensure!(
        stored == recomputed,
        ReplayMismatchSnafu {
            subject,
            stored: stored.to_vec(),
            recomputed: recomputed.to_vec(),
        }
    );
    Ok(())
}
