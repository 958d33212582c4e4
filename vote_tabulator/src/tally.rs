use log::debug;
use snafu::OptionExt;
use std::fmt::Display;

use crate::config::*;
use crate::messages::{Diagnostics, Message};
use crate::uid::{Uid, UidKind};

fn add_count(total: &mut u64, delta: u64, uid: &Uid) -> TabulatorResult<()> {
    // Zero deltas leave the tally untouched.
    if delta == 0 {
        return Ok(());
    }
    *total = total
        .checked_add(delta)
        .context(CountOverflowSnafu { uid: uid.clone() })?;
    Ok(())
}

fn overflows(total: u64, delta: u64) -> bool {
    total.checked_add(delta).is_none()
}

fn overflow_error(diag: &mut Diagnostics, what: impl Display, file: &Uid) {
    diag.error(
        Message::new("Count Overflow")
            .value(what)
            .then("in Counter Count")
            .value(file),
    );
}

/// Reports every count of a counter count that would overflow its running
/// total. The tallies are only read.
///
/// Entries without a tally are skipped, the coverage checks report them.
pub fn check_overflow(
    contests: &[ContestTally],
    questions: &[QuestionTally],
    cc: &CounterCount,
    diag: &mut Diagnostics,
) {
    let file = &cc.file_ident;
    for delta in cc.contest_count_list.iter() {
        let tally = match contests.iter().find(|t| t.contest_ident == delta.contest_ident) {
            Some(t) => t,
            None => continue,
        };
        if overflows(tally.overvote_count, delta.overvote_count)
            || overflows(tally.undervote_count, delta.undervote_count)
            || overflows(tally.writein_count, delta.writein_count)
        {
            overflow_error(diag, &delta.contest_ident, file);
        }
        for cd in delta.candidate_count_list.iter() {
            if let Some(total) = tally.count_for(&cd.candidate_ident) {
                if overflows(total, cd.count) {
                    overflow_error(diag, &cd.candidate_ident, file);
                }
            }
        }
    }
    for delta in cc.question_count_list.iter() {
        let tally = match questions.iter().find(|t| t.question_ident == delta.question_ident) {
            Some(t) => t,
            None => continue,
        };
        if overflows(tally.overvote_count, delta.overvote_count)
            || overflows(tally.undervote_count, delta.undervote_count)
        {
            overflow_error(diag, &delta.question_ident, file);
        }
        for ad in delta.answer_count_list.iter() {
            if let Some(total) = tally.count_for(&ad.answer) {
                if overflows(total, ad.count) {
                    overflow_error(diag, &ad.answer, file);
                }
            }
        }
    }
}

/// Adds the votes of a validated counter count to the running tallies.
///
/// The counter count must have passed validation: a contest, candidate,
/// question or answer without a tally entry is a fatal error here. On error the
/// tallies may be partially updated, callers work on a copy.
pub fn aggregate(
    contests: &mut [ContestTally],
    questions: &mut [QuestionTally],
    cc: &CounterCount,
) -> TabulatorResult<()> {
    for delta in cc.contest_count_list.iter() {
        let tally = contests
            .iter_mut()
            .find(|t| t.contest_ident == delta.contest_ident)
            .context(MissingTallyEntrySnafu {
                kind: UidKind::Contest,
                uid: delta.contest_ident.clone(),
                owner: "contest tallies".to_string(),
            })?;
        add_contest(tally, delta)?;
    }
    for delta in cc.question_count_list.iter() {
        let tally = questions
            .iter_mut()
            .find(|t| t.question_ident == delta.question_ident)
            .context(MissingTallyEntrySnafu {
                kind: UidKind::Question,
                uid: delta.question_ident.clone(),
                owner: "question tallies".to_string(),
            })?;
        add_question(tally, delta)?;
    }
    debug!(
        "aggregate: added {} contests and {} questions from {}",
        cc.contest_count_list.len(),
        cc.question_count_list.len(),
        cc.file_ident
    );
    Ok(())
}

fn add_contest(tally: &mut ContestTally, delta: &ContestTally) -> TabulatorResult<()> {
    let uid = &delta.contest_ident;
    add_count(&mut tally.overvote_count, delta.overvote_count, uid)?;
    add_count(&mut tally.undervote_count, delta.undervote_count, uid)?;
    add_count(&mut tally.writein_count, delta.writein_count, uid)?;
    for cd in delta.candidate_count_list.iter() {
        let entry = tally
            .candidate_count_list
            .iter_mut()
            .find(|c| c.candidate_ident == cd.candidate_ident)
            .context(MissingTallyEntrySnafu {
                kind: UidKind::Candidate,
                uid: cd.candidate_ident.clone(),
                owner: format!("contest {}", uid),
            })?;
        add_count(&mut entry.count, cd.count, &cd.candidate_ident)?;
    }
    Ok(())
}

fn add_question(tally: &mut QuestionTally, delta: &QuestionTally) -> TabulatorResult<()> {
    let uid = &delta.question_ident;
    add_count(&mut tally.overvote_count, delta.overvote_count, uid)?;
    add_count(&mut tally.undervote_count, delta.undervote_count, uid)?;
    for ad in delta.answer_count_list.iter() {
        let entry = tally
            .answer_count_list
            .iter_mut()
            .find(|a| a.answer == ad.answer)
            .context(MissingTallyEntrySnafu {
                kind: UidKind::Question,
                uid: uid.clone(),
                owner: format!("answer {}", ad.answer),
            })?;
        add_count(&mut entry.count, ad.count, uid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CounterCountBuilder;

    fn skeletons() -> (Vec<ContestTally>, Vec<QuestionTally>) {
        let mut c = ContestTally::new(&Uid::from("CONTEST_1"));
        for cand in ["CAND_1", "CAND_2"] {
            c.candidate_count_list.push(CandidateCount {
                candidate_ident: Uid::from(cand),
                count: 0,
            });
        }
        let mut q = QuestionTally::new(&Uid::from("Q1"));
        for answer in ["Yes", "No"] {
            q.answer_count_list.push(AnswerCount {
                answer: answer.to_string(),
                count: 0,
            });
        }
        (vec![c], vec![q])
    }

    #[test]
    fn adds_all_deltas() {
        let (mut contests, mut questions) = skeletons();
        let cc = CounterCountBuilder::covering("J1", "E1", &contests, &questions)
            .submission("F1", "C1", "Normal", "P1")
            .vote("CONTEST_1", "CAND_1", 5)
            .vote("CONTEST_1", "CAND_2", 2)
            .contest_extras("CONTEST_1", 1, 3, 4)
            .answer("Q1", "No", 7)
            .question_extras("Q1", 1, 0)
            .build();
        aggregate(&mut contests, &mut questions, &cc).unwrap();
        aggregate(&mut contests, &mut questions, &cc).unwrap();
        let c = &contests[0];
        assert_eq!(c.count_for(&Uid::from("CAND_1")), Some(10));
        assert_eq!(c.count_for(&Uid::from("CAND_2")), Some(4));
        assert_eq!(
            (c.overvote_count, c.undervote_count, c.writein_count),
            (2, 6, 8)
        );
        assert_eq!(questions[0].count_for("No"), Some(14));
        assert_eq!(questions[0].count_for("Yes"), Some(0));
        assert_eq!(questions[0].overvote_count, 2);
    }

    #[test]
    fn unknown_candidate_is_fatal() {
        let (mut contests, mut questions) = skeletons();
        let mut cc = CounterCountBuilder::covering("J1", "E1", &contests, &questions)
            .submission("F1", "C1", "Normal", "P1")
            .build();
        cc.contest_count_list[0]
            .candidate_count_list
            .push(CandidateCount {
                candidate_ident: Uid::from("NOBODY"),
                count: 1,
            });
        let res = aggregate(&mut contests, &mut questions, &cc);
        assert!(matches!(
            res,
            Err(TabulatorError::MissingTallyEntry {
                kind: UidKind::Candidate,
                ..
            })
        ));
    }

    #[test]
    fn overflow_is_fatal() {
        let (mut contests, mut questions) = skeletons();
        contests[0].candidate_count_list[0].count = u64::MAX;
        let cc = CounterCountBuilder::covering("J1", "E1", &contests, &questions)
            .submission("F1", "C1", "Normal", "P1")
            .vote("CONTEST_1", "CAND_1", 1)
            .build();
        let res = aggregate(&mut contests, &mut questions, &cc);
        assert!(matches!(res, Err(TabulatorError::CountOverflow { .. })));
    }

    #[test]
    fn overflow_check_reports_each_entry() {
        let (mut contests, mut questions) = skeletons();
        contests[0].candidate_count_list[1].count = u64::MAX - 1;
        contests[0].writein_count = u64::MAX;
        questions[0].answer_count_list[0].count = u64::MAX;
        let cc = CounterCountBuilder::covering("J1", "E1", &contests, &questions)
            .submission("F2", "C1", "Normal", "P1")
            .vote("CONTEST_1", "CAND_1", 10)
            .vote("CONTEST_1", "CAND_2", 2)
            .contest_extras("CONTEST_1", 0, 0, 1)
            .answer("Q1", "Yes", 1)
            .answer("Q1", "No", 1)
            .build();
        let before = (contests.clone(), questions.clone());
        let mut diag = Diagnostics::new();
        check_overflow(&contests, &questions, &cc, &mut diag);
        assert_eq!(
            diag.errors,
            vec![
                "Count Overflow (CONTEST_1) in Counter Count (F2)",
                "Count Overflow (CAND_2) in Counter Count (F2)",
                "Count Overflow (Yes) in Counter Count (F2)",
            ]
        );
        assert_eq!((contests, questions), before);

        // One short of the limit is fine.
        let (contests, questions) = skeletons();
        let cc = CounterCountBuilder::covering("J1", "E1", &contests, &questions)
            .submission("F3", "C1", "Normal", "P1")
            .vote("CONTEST_1", "CAND_1", u64::MAX)
            .build();
        let mut diag = Diagnostics::new();
        check_overflow(&contests, &questions, &cc, &mut diag);
        assert!(diag.errors.is_empty());
    }
}
