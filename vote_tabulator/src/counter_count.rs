use log::debug;
use std::collections::BTreeSet;

use crate::config::*;
use crate::expected::ExpectedCountLedger;
use crate::messages::{Diagnostics, Message};
use crate::uid::{Uid, UidKind, UidRegistry};

/// Validates one counter count against the registered definitions.
///
/// Nothing is mutated here: the caller aggregates the counter count only if no
/// error was found.
pub fn validate_counter_count(
    cc: &CounterCount,
    registry: &UidRegistry,
    contests: &[ContestTally],
    questions: &[QuestionTally],
    ledger: &ExpectedCountLedger,
    state: State,
) -> Diagnostics {
    let mut diag = Diagnostics::new();
    let file = &cc.file_ident;

    let required = [
        (UidKind::Counter, "Non-Existent Counter UID", &cc.counter_ident),
        (UidKind::Precinct, "Non-Existent Precinct UID", &cc.precinct_ident),
        (
            UidKind::Jurisdiction,
            "Non-Existent Jurisdiction UID",
            &cc.jurisdiction_ident,
        ),
        (UidKind::Election, "Non-Existent Election UID", &cc.election_ident),
    ];
    for (kind, label, uid) in required.iter() {
        if !registry.exists(*kind, uid) {
            diag.error(
                Message::new(label)
                    .value(uid)
                    .then("in Counter Count")
                    .value(file),
            );
        }
    }
    // Unknown reporting groups are tolerated.
    if !registry.exists(UidKind::ReportingGroup, &cc.reporting_group) {
        diag.warning(
            Message::new("Non-Existent Reporting Group")
                .value(&cc.reporting_group)
                .then("in Counter Count")
                .value(file),
        );
    }
    if registry.exists(UidKind::File, file) {
        diag.error(
            Message::new("Non-Unique File UID")
                .value(file)
                .then("in Counter Count"),
        );
    }

    check_contests(cc, registry, contests, &mut diag);
    check_questions(cc, registry, questions, &mut diag);

    let triple = cc.triple();
    if ledger.is_accumulated(&triple) {
        diag.error(
            Message::new("Duplicate Counter Count")
                .value(&triple)
                .then("Input to Tabulator"),
        );
    }
    if state == State::Done {
        diag.warning(
            Message::new("Unexpected Counter Count")
                .value(&triple)
                .then("After Tabulator DONE"),
        );
    }

    debug!(
        "validate_counter_count: {}: {} errors {} warnings",
        file,
        diag.errors.len(),
        diag.warnings.len()
    );
    diag
}

fn check_contests(
    cc: &CounterCount,
    registry: &UidRegistry,
    contests: &[ContestTally],
    diag: &mut Diagnostics,
) {
    let file = &cc.file_ident;
    let mut seen: BTreeSet<&Uid> = BTreeSet::new();
    for ct in cc.contest_count_list.iter() {
        let uid = &ct.contest_ident;
        let reference = contests.iter().find(|t| t.contest_ident == *uid);
        if !registry.exists(UidKind::Contest, uid) || reference.is_none() {
            diag.error(
                Message::new("Non-Existent Contest UID")
                    .value(uid)
                    .then("in Counter Count")
                    .value(file),
            );
        }
        if !seen.insert(uid) {
            diag.error(
                Message::new("Duplicate Contest UID")
                    .value(uid)
                    .then("in Counter Count")
                    .value(file),
            );
            continue;
        }
        if let Some(reference) = reference {
            check_candidates(ct, reference, registry, diag);
        }
    }

    let missing: Vec<&Uid> = contests
        .iter()
        .map(|t| &t.contest_ident)
        .filter(|uid| !seen.contains(uid))
        .collect();
    if !missing.is_empty() {
        diag.error(
            Message::new("Missing Contest UIDs")
                .values(&missing)
                .then("in Counter Count")
                .value(file),
        );
    }
}

fn check_candidates(
    ct: &ContestTally,
    reference: &ContestTally,
    registry: &UidRegistry,
    diag: &mut Diagnostics,
) {
    let contest = &ct.contest_ident;
    let mut seen: BTreeSet<&Uid> = BTreeSet::new();
    for cc in ct.candidate_count_list.iter() {
        let uid = &cc.candidate_ident;
        if !registry.exists(UidKind::Candidate, uid) {
            diag.error(
                Message::new("Non-Existent Candidate UID")
                    .value(uid)
                    .then("for Contest UID")
                    .value(contest),
            );
        } else if reference.count_for(uid).is_none() {
            diag.error(
                Message::new("Improper Candidate UID")
                    .value(uid)
                    .then("for Contest UID")
                    .value(contest),
            );
        }
        if !seen.insert(uid) {
            diag.error(
                Message::new("Duplicate Candidate UID")
                    .value(uid)
                    .then("for Contest UID")
                    .value(contest),
            );
        }
    }
    let missing: Vec<&Uid> = reference
        .candidate_count_list
        .iter()
        .map(|c| &c.candidate_ident)
        .filter(|uid| !seen.contains(uid))
        .collect();
    if !missing.is_empty() {
        diag.error(
            Message::new("Missing Candidate UIDs")
                .values(&missing)
                .then("for Contest UID")
                .value(contest),
        );
    }
}

fn check_questions(
    cc: &CounterCount,
    registry: &UidRegistry,
    questions: &[QuestionTally],
    diag: &mut Diagnostics,
) {
    let file = &cc.file_ident;
    let mut seen: BTreeSet<&Uid> = BTreeSet::new();
    for qt in cc.question_count_list.iter() {
        let uid = &qt.question_ident;
        let reference = questions.iter().find(|t| t.question_ident == *uid);
        if !registry.exists(UidKind::Question, uid) || reference.is_none() {
            diag.error(
                Message::new("Non-Existent Question UID")
                    .value(uid)
                    .then("in Counter Count")
                    .value(file),
            );
        }
        if !seen.insert(uid) {
            diag.error(
                Message::new("Duplicate Question UID")
                    .value(uid)
                    .then("in Counter Count")
                    .value(file),
            );
            continue;
        }
        if let Some(reference) = reference {
            check_answers(qt, reference, diag);
        }
    }

    let missing: Vec<&Uid> = questions
        .iter()
        .map(|t| &t.question_ident)
        .filter(|uid| !seen.contains(uid))
        .collect();
    if !missing.is_empty() {
        diag.error(
            Message::new("Missing Question UIDs")
                .values(&missing)
                .then("in Counter Count")
                .value(file),
        );
    }
}

fn check_answers(qt: &QuestionTally, reference: &QuestionTally, diag: &mut Diagnostics) {
    let question = &qt.question_ident;
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for ac in qt.answer_count_list.iter() {
        if reference.count_for(&ac.answer).is_none() {
            diag.error(
                Message::new("Non-Existent Answer")
                    .value(&ac.answer)
                    .then("for Question UID")
                    .value(question),
            );
        }
        if !seen.insert(ac.answer.as_str()) {
            diag.error(
                Message::new("Duplicate Answer")
                    .value(&ac.answer)
                    .then("for Question UID")
                    .value(question),
            );
        }
    }
    let missing: Vec<&str> = reference
        .answer_count_list
        .iter()
        .map(|a| a.answer.as_str())
        .filter(|a| !seen.contains(a))
        .collect();
    if !missing.is_empty() {
        diag.error(
            Message::new("Missing Answers")
                .values(&missing)
                .then("for Question UID")
                .value(question),
        );
    }
}
