use log::{debug, info};
use snafu::OptionExt;
use std::collections::{BTreeSet, HashMap};

use crate::config::*;
use crate::expected::ExpectedCountLedger;
use crate::messages::{Diagnostics, Message};
use crate::uid::{Uid, UidKind, UidRegistry};

/// Everything built while validating a jurisdiction and an election.
#[derive(Debug, Clone)]
pub struct ValidatedDefinitions {
    pub registry: UidRegistry,
    pub ledger: ExpectedCountLedger,
    pub contest_tallies: Vec<ContestTally>,
    pub question_tallies: Vec<QuestionTally>,
    /// Diagnostics belonging to the jurisdiction definition.
    pub jurisdiction_diagnostics: Diagnostics,
    /// Diagnostics belonging to the election definition.
    pub election_diagnostics: Diagnostics,
}

/// Validates a jurisdiction and an election against a fresh registry.
///
/// All the problems are collected, validation never stops at the first one.
/// The registry, the ledger and the zero tallies are built even when errors
/// are found; it is up to the caller to refuse a dataset with errors.
pub fn validate_definitions(
    jurisdiction: &Jurisdiction,
    election: &Election,
) -> TabulatorResult<ValidatedDefinitions> {
    let mut registry = UidRegistry::new();
    let mut ledger = ExpectedCountLedger::new();

    let jurisdiction_diagnostics = validate_jurisdiction(jurisdiction, &mut registry)?;
    let (election_diagnostics, contest_tallies, question_tallies) =
        validate_election(election, &mut registry, &mut ledger)?;

    info!(
        "validate_definitions: jurisdiction {}: {} errors {} warnings, election {}: {} errors {} warnings",
        jurisdiction.ident,
        jurisdiction_diagnostics.errors.len(),
        jurisdiction_diagnostics.warnings.len(),
        election.ident,
        election_diagnostics.errors.len(),
        election_diagnostics.warnings.len()
    );

    Ok(ValidatedDefinitions {
        registry,
        ledger,
        contest_tallies,
        question_tallies,
        jurisdiction_diagnostics,
        election_diagnostics,
    })
}

fn validate_jurisdiction(
    jurisdiction: &Jurisdiction,
    registry: &mut UidRegistry,
) -> TabulatorResult<Diagnostics> {
    let mut diag = Diagnostics::new();
    registry.add(UidKind::Jurisdiction, &jurisdiction.ident)?;

    let mut seen_precincts: HashMap<Uid, Vec<&Precinct>> = HashMap::new();
    for p in jurisdiction.precinct_list.iter() {
        register_unique(
            UidKind::Precinct,
            &p.ident,
            p,
            &mut seen_precincts,
            registry,
            "in Jurisdiction Definition",
            &mut diag,
        )?;
    }

    let mut seen_districts: HashMap<Uid, Vec<&District>> = HashMap::new();
    for d in jurisdiction.district_list.iter() {
        register_unique(
            UidKind::District,
            &d.ident,
            d,
            &mut seen_districts,
            registry,
            "in Jurisdiction Definition",
            &mut diag,
        )?;
    }
    Ok(diag)
}

fn validate_election(
    election: &Election,
    registry: &mut UidRegistry,
    ledger: &mut ExpectedCountLedger,
) -> TabulatorResult<(Diagnostics, Vec<ContestTally>, Vec<QuestionTally>)> {
    let mut diag = Diagnostics::new();
    registry.add(UidKind::Election, &election.ident)?;

    let contest_tallies = validate_contests(election, registry, &mut diag)?;
    let contest_tallies = validate_candidates(election, registry, contest_tallies, &mut diag)?;
    let question_tallies = validate_questions(election, registry, &mut diag)?;

    let mut seen_counters: HashMap<Uid, Vec<&Counter>> = HashMap::new();
    for c in election.counter_list.iter() {
        register_unique(
            UidKind::Counter,
            &c.ident,
            c,
            &mut seen_counters,
            registry,
            "in Election Definition",
            &mut diag,
        )?;
    }

    validate_reporting_groups(election, registry, &mut diag)?;
    validate_expected_counts(election, registry, ledger, &mut diag);

    Ok((diag, contest_tallies, question_tallies))
}

/// Registers a UID, unless it was already declared.
///
/// Declaring the very same record as any earlier one is only a warning. A
/// record that differs from every earlier one with that UID is an error.
/// Returns true if the UID was registered.
fn register_unique<'a, T: PartialEq>(
    kind: UidKind,
    uid: &Uid,
    record: &'a T,
    seen: &mut HashMap<Uid, Vec<&'a T>>,
    registry: &mut UidRegistry,
    location: &str,
    diag: &mut Diagnostics,
) -> TabulatorResult<bool> {
    let previous = seen.entry(uid.clone()).or_default();
    if registry.exists(kind, uid) {
        if previous.iter().any(|p| *p == record) {
            diag.warning(
                Message::new(&format!("Duplicate {} UID", kind))
                    .value(uid)
                    .then(location),
            );
        } else {
            diag.error(
                Message::new(&format!("Non-Unique {} UID", kind))
                    .value(uid)
                    .then(location),
            );
            previous.push(record);
        }
        return Ok(false);
    }
    registry.add(kind, uid)?;
    previous.push(record);
    Ok(true)
}

fn validate_contests(
    election: &Election,
    registry: &mut UidRegistry,
    diag: &mut Diagnostics,
) -> TabulatorResult<Vec<ContestTally>> {
    let mut tallies: Vec<ContestTally> = Vec::new();
    let mut seen: HashMap<Uid, Vec<&Contest>> = HashMap::new();
    for c in election.contest_list.iter() {
        let is_new = register_unique(
            UidKind::Contest,
            &c.ident,
            c,
            &mut seen,
            registry,
            "in Election Definition",
            diag,
        )?;
        if !registry.exists(UidKind::District, &c.district_ident) {
            diag.error(
                Message::new("Non-Existent District UID")
                    .value(&c.district_ident)
                    .then("for Contest UID")
                    .value(&c.ident),
            );
        }
        if is_new {
            tallies.push(ContestTally::new(&c.ident));
        }
    }
    debug!("validate_contests: {} contest tallies", tallies.len());
    Ok(tallies)
}

fn validate_candidates(
    election: &Election,
    registry: &mut UidRegistry,
    mut tallies: Vec<ContestTally>,
    diag: &mut Diagnostics,
) -> TabulatorResult<Vec<ContestTally>> {
    let mut seen: HashMap<Uid, Vec<&Candidate>> = HashMap::new();
    for c in election.candidate_list.iter() {
        let is_new = register_unique(
            UidKind::Candidate,
            &c.ident,
            c,
            &mut seen,
            registry,
            "in Election Definition",
            diag,
        )?;
        if !registry.exists(UidKind::Contest, &c.contest_ident) {
            diag.error(
                Message::new("Non-Existent Contest UID")
                    .value(&c.contest_ident)
                    .then("for Candidate UID")
                    .value(&c.ident),
            );
            continue;
        }
        if is_new {
            let tally = tallies
                .iter_mut()
                .find(|t| t.contest_ident == c.contest_ident)
                .context(MissingTallyEntrySnafu {
                    kind: UidKind::Contest,
                    uid: c.contest_ident.clone(),
                    owner: "contest tallies".to_string(),
                })?;
            tally.candidate_count_list.push(CandidateCount {
                candidate_ident: c.ident.clone(),
                count: 0,
            });
        }
    }
    Ok(tallies)
}

fn validate_questions(
    election: &Election,
    registry: &mut UidRegistry,
    diag: &mut Diagnostics,
) -> TabulatorResult<Vec<QuestionTally>> {
    let mut tallies: Vec<QuestionTally> = Vec::new();
    let mut seen: HashMap<Uid, Vec<&Question>> = HashMap::new();
    for q in election.question_list.iter() {
        let is_new = register_unique(
            UidKind::Question,
            &q.ident,
            q,
            &mut seen,
            registry,
            "in Election Definition",
            diag,
        )?;
        if !registry.exists(UidKind::District, &q.district_ident) {
            diag.error(
                Message::new("Non-Existent District UID")
                    .value(&q.district_ident)
                    .then("for Question UID")
                    .value(&q.ident),
            );
        }

        // Distinct answers in order, and the answers seen more than once.
        let mut answers: Vec<String> = Vec::new();
        let mut duplicated: Vec<String> = Vec::new();
        for a in q.answer_list.iter() {
            if !answers.contains(a) {
                answers.push(a.clone());
            } else if !duplicated.contains(a) {
                duplicated.push(a.clone());
            }
        }
        if !duplicated.is_empty() {
            diag.error(
                Message::new("Duplicate Answers")
                    .values(&duplicated)
                    .then("for Question UID")
                    .value(&q.ident),
            );
        }

        if is_new {
            let mut tally = QuestionTally::new(&q.ident);
            tally.answer_count_list = answers
                .into_iter()
                .map(|answer| AnswerCount { answer, count: 0 })
                .collect();
            tallies.push(tally);
        }
    }
    Ok(tallies)
}

fn validate_reporting_groups(
    election: &Election,
    registry: &mut UidRegistry,
    diag: &mut Diagnostics,
) -> TabulatorResult<()> {
    if election.reporting_group_list.is_empty() {
        diag.warning(Message::new(
            "Empty Reporting Group List in Election Definition",
        ));
        return Ok(());
    }
    for g in election.reporting_group_list.iter() {
        if registry.exists(UidKind::ReportingGroup, g) {
            diag.warning(
                Message::new("Duplicate Reporting Group")
                    .value(g)
                    .then("in Election Definition"),
            );
        } else {
            registry.add(UidKind::ReportingGroup, g)?;
        }
    }
    Ok(())
}

fn validate_expected_counts(
    election: &Election,
    registry: &UidRegistry,
    ledger: &mut ExpectedCountLedger,
    diag: &mut Diagnostics,
) {
    if election.expected_count_list.is_empty() {
        diag.warning(Message::new(
            "Empty Expected Count List in Election Definition",
        ));
        return;
    }

    let mut used_counters: BTreeSet<&Uid> = BTreeSet::new();
    let mut used_groups: BTreeSet<&Uid> = BTreeSet::new();
    let mut used_precincts: BTreeSet<&Uid> = BTreeSet::new();

    for ec in election.expected_count_list.iter() {
        used_counters.insert(&ec.counter_ident);
        used_groups.insert(&ec.reporting_group);
        if !registry.exists(UidKind::Counter, &ec.counter_ident) {
            diag.error(
                Message::new("Non-Existent Counter UID")
                    .value(&ec.counter_ident)
                    .then("in Expected Count"),
            );
        }
        if !registry.exists(UidKind::ReportingGroup, &ec.reporting_group) {
            diag.error(
                Message::new("Non-Existent Reporting Group")
                    .value(&ec.reporting_group)
                    .then("in Expected Count"),
            );
        }
        for p in ec.precinct_ident_list.iter() {
            used_precincts.insert(p);
            if !registry.exists(UidKind::Precinct, p) {
                diag.error(
                    Message::new("Non-Existent Precinct UID")
                        .value(p)
                        .then("in Expected Count"),
                );
            }
            if let Some(w) = ledger.declare(&ec.counter_ident, &ec.reporting_group, p) {
                diag.warning(w);
            }
        }
    }

    let unused = [
        (UidKind::Counter, "Counter UID", &used_counters),
        (UidKind::ReportingGroup, "Reporting Group", &used_groups),
        (UidKind::Precinct, "Precinct UID", &used_precincts),
    ];
    for (kind, label, used) in unused.iter() {
        for uid in registry.uids(*kind) {
            if !used.contains(&uid) {
                diag.warning(
                    Message::new(label)
                        .value(&uid)
                        .then("missing from Expected Counts"),
                );
            }
        }
    }
    debug!(
        "validate_expected_counts: {} expected counts declared",
        ledger.total()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ElectionBuilder, JurisdictionBuilder};

    fn jurisdiction() -> Jurisdiction {
        JurisdictionBuilder::new("J1")
            .district("D1")
            .precinct("P1")
            .precinct("P2")
            .build()
    }

    fn election() -> ElectionBuilder {
        ElectionBuilder::new("E1")
            .contest("CONTEST_1", "D1")
            .candidate("CAND_1", "CONTEST_1")
            .candidate("CAND_2", "CONTEST_1")
            .question("Q1", "D1", &["Yes", "No"])
            .counter("C1")
            .reporting_group("Normal")
            .expected_count("C1", "Normal", &["P1", "P2"])
    }

    #[test]
    fn clean_dataset() {
        let v = validate_definitions(&jurisdiction(), &election().build()).unwrap();
        assert!(v.jurisdiction_diagnostics.errors.is_empty());
        assert!(v.jurisdiction_diagnostics.warnings.is_empty());
        assert!(v.election_diagnostics.errors.is_empty());
        assert!(v.election_diagnostics.warnings.is_empty());
        assert_eq!(v.contest_tallies.len(), 1);
        assert_eq!(v.contest_tallies[0].candidate_count_list.len(), 2);
        assert_eq!(v.question_tallies[0].answer_count_list.len(), 2);
        assert_eq!(v.ledger.total(), 2);
        assert!(v.registry.exists(UidKind::Candidate, &Uid::from("CAND_2")));
    }

    #[test]
    fn identical_redeclaration_is_a_warning() {
        let j = JurisdictionBuilder::new("J1")
            .district("D1")
            .precinct("P1")
            .precinct("P1")
            .precinct_named("P1", "Somewhere else")
            .build();
        let v = validate_definitions(&j, &election().build()).unwrap();
        assert_eq!(
            v.jurisdiction_diagnostics.warnings,
            vec!["Duplicate Precinct UID (P1) in Jurisdiction Definition"]
        );
        assert_eq!(
            v.jurisdiction_diagnostics.errors,
            vec!["Non-Unique Precinct UID (P1) in Jurisdiction Definition"]
        );
        assert_eq!(v.registry.count(UidKind::Precinct), 1);
    }

    #[test]
    fn redeclaration_matches_any_earlier_record() {
        let j = JurisdictionBuilder::new("J1")
            .district("D1")
            .precinct_named("P1", "A")
            .precinct_named("P1", "B")
            .precinct_named("P1", "B")
            .precinct_named("P1", "A")
            .precinct("P2")
            .build();
        let v = validate_definitions(&j, &election().build()).unwrap();
        assert_eq!(
            v.jurisdiction_diagnostics.errors,
            vec!["Non-Unique Precinct UID (P1) in Jurisdiction Definition"]
        );
        assert_eq!(
            v.jurisdiction_diagnostics.warnings,
            vec![
                "Duplicate Precinct UID (P1) in Jurisdiction Definition",
                "Duplicate Precinct UID (P1) in Jurisdiction Definition",
            ]
        );
    }

    #[test]
    fn duplicate_policy_for_every_kind() {
        let mut j = JurisdictionBuilder::new("J1")
            .district("D1")
            .district("D1")
            .precinct("P1")
            .precinct("P2")
            .build();
        j.district_list.push(District {
            ident: Uid::from("D1"),
            display_name: Some("Other".to_string()),
            district_type: None,
        });
        let mut e = election()
            .contest("CONTEST_1", "D1")
            .question("Q1", "D1", &["Yes", "No"])
            .question("Q1", "D1", &["Yes"])
            .counter("C1")
            .build();
        e.contest_list.push(Contest {
            ident: Uid::from("CONTEST_1"),
            district_ident: Uid::from("D1"),
            display_name: Some("Other".to_string()),
        });
        e.counter_list.push(Counter {
            ident: Uid::from("C1"),
            display_name: Some("Other".to_string()),
        });
        let v = validate_definitions(&j, &e).unwrap();
        assert_eq!(
            v.jurisdiction_diagnostics.errors,
            vec!["Non-Unique District UID (D1) in Jurisdiction Definition"]
        );
        assert_eq!(
            v.jurisdiction_diagnostics.warnings,
            vec!["Duplicate District UID (D1) in Jurisdiction Definition"]
        );
        assert_eq!(
            v.election_diagnostics.errors,
            vec![
                "Non-Unique Contest UID (CONTEST_1) in Election Definition",
                "Non-Unique Question UID (Q1) in Election Definition",
                "Non-Unique Counter UID (C1) in Election Definition",
            ]
        );
        assert_eq!(
            v.election_diagnostics.warnings,
            vec![
                "Duplicate Contest UID (CONTEST_1) in Election Definition",
                "Duplicate Question UID (Q1) in Election Definition",
                "Duplicate Counter UID (C1) in Election Definition",
            ]
        );
        // One tally per distinct UID, built from the first declaration.
        assert_eq!(v.contest_tallies.len(), 1);
        assert_eq!(v.question_tallies.len(), 1);
        assert_eq!(v.question_tallies[0].answer_count_list.len(), 2);
    }

    #[test]
    fn dangling_references() {
        let e = election()
            .contest("CONTEST_2", "D9")
            .candidate("CAND_3", "CONTEST_9")
            .question("Q2", "D9", &["Yes", "No", "Yes", "No", "Yes"])
            .build();
        let v = validate_definitions(&jurisdiction(), &e).unwrap();
        assert_eq!(
            v.election_diagnostics.errors,
            vec![
                "Non-Existent District UID (D9) for Contest UID (CONTEST_2)",
                "Non-Existent Contest UID (CONTEST_9) for Candidate UID (CAND_3)",
                "Non-Existent District UID (D9) for Question UID (Q2)",
                "Duplicate Answers (Yes, No) for Question UID (Q2)",
            ]
        );
        // The skeletons are still built.
        assert_eq!(v.contest_tallies.len(), 2);
        assert!(v.contest_tallies[1].candidate_count_list.is_empty());
        assert_eq!(v.question_tallies[1].answer_count_list.len(), 2);
    }

    #[test]
    fn candidate_listed_twice_gets_one_entry() {
        let e = election().candidate("CAND_1", "CONTEST_1").build();
        let v = validate_definitions(&jurisdiction(), &e).unwrap();
        assert_eq!(
            v.election_diagnostics.warnings,
            vec!["Duplicate Candidate UID (CAND_1) in Election Definition"]
        );
        assert_eq!(v.contest_tallies[0].candidate_count_list.len(), 2);
    }

    #[test]
    fn expected_count_coverage() {
        let e = ElectionBuilder::new("E1")
            .contest("CONTEST_1", "D1")
            .counter("C1")
            .counter("C2")
            .reporting_group("Normal")
            .reporting_group("Absentee")
            .reporting_group("Normal")
            .expected_count("C1", "Normal", &["P1", "P9"])
            .expected_count("C1", "Normal", &["P1"])
            .expected_count("C7", "Early", &["P1"])
            .build();
        let v = validate_definitions(&jurisdiction(), &e).unwrap();
        assert_eq!(
            v.election_diagnostics.errors,
            vec![
                "Non-Existent Precinct UID (P9) in Expected Count",
                "Non-Existent Counter UID (C7) in Expected Count",
                "Non-Existent Reporting Group (Early) in Expected Count",
            ]
        );
        assert_eq!(
            v.election_diagnostics.warnings,
            vec![
                "Duplicate Reporting Group (Normal) in Election Definition",
                "Duplicate Expected Count (C1, Normal, P1) in Election Definition",
                "Counter UID (C2) missing from Expected Counts",
                "Reporting Group (Absentee) missing from Expected Counts",
                "Precinct UID (P2) missing from Expected Counts",
            ]
        );
        assert_eq!(v.ledger.total(), 3);
    }

    #[test]
    fn expected_count_uids_checked_once() {
        let e = ElectionBuilder::new("E1")
            .counter("C1")
            .reporting_group("Normal")
            .expected_count("C1", "Normal", &["P1", "P2"])
            .expected_count("C7", "Normal", &["P1", "P2", "P9"])
            .expected_count("C8", "Early", &[])
            .build();
        let v = validate_definitions(&jurisdiction(), &e).unwrap();
        assert_eq!(
            v.election_diagnostics.errors,
            vec![
                "Non-Existent Counter UID (C7) in Expected Count",
                "Non-Existent Precinct UID (P9) in Expected Count",
                "Non-Existent Counter UID (C8) in Expected Count",
                "Non-Existent Reporting Group (Early) in Expected Count",
            ]
        );
        assert_eq!(v.ledger.total(), 5);
    }

    #[test]
    fn empty_lists_warn() {
        let e = ElectionBuilder::new("E1").build();
        let v = validate_definitions(&jurisdiction(), &e).unwrap();
        assert!(v.election_diagnostics.errors.is_empty());
        assert_eq!(
            v.election_diagnostics.warnings,
            vec![
                "Empty Reporting Group List in Election Definition",
                "Empty Expected Count List in Election Definition",
            ]
        );
        assert_eq!(v.ledger.total(), 0);
    }

    #[test]
    fn registered_uids_are_unique() {
        let v = validate_definitions(&jurisdiction(), &election().build()).unwrap();
        for kind in [UidKind::Precinct, UidKind::Contest, UidKind::Candidate] {
            let uids = v.registry.uids(kind);
            let distinct: BTreeSet<&Uid> = uids.iter().collect();
            assert_eq!(uids.len(), distinct.len());
        }
    }
}
