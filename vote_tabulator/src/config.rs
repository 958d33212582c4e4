// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt::Display;

use crate::uid::{Uid, UidKind};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_type: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Precinct {
    pub ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The geographic definition: the districts and precincts the election runs in.
///
/// `error_list` and `warning_list` are filled in by the first validation and
/// checked again when the definition is reloaded from a snapshot.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub district_list: Vec<District>,
    #[serde(default)]
    pub precinct_list: Vec<Precinct>,
    #[serde(default)]
    pub error_list: Vec<String>,
    #[serde(default)]
    pub warning_list: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub ident: Uid,
    pub district_ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub ident: Uid,
    pub contest_ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_ident: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub ident: Uid,
    pub district_ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default)]
    pub answer_list: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    pub ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Declares that one counter will report, under one reporting group, for
/// each of the listed precincts.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedCount {
    pub counter_ident: Uid,
    pub reporting_group: Uid,
    #[serde(default)]
    pub precinct_ident_list: Vec<Uid>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub ident: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub contest_list: Vec<Contest>,
    #[serde(default)]
    pub candidate_list: Vec<Candidate>,
    #[serde(default)]
    pub question_list: Vec<Question>,
    #[serde(default)]
    pub counter_list: Vec<Counter>,
    #[serde(default)]
    pub reporting_group_list: Vec<Uid>,
    #[serde(default)]
    pub expected_count_list: Vec<ExpectedCount>,
    #[serde(default)]
    pub error_list: Vec<String>,
    #[serde(default)]
    pub warning_list: Vec<String>,
}

// ********* Tallies ***********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCount {
    pub candidate_ident: Uid,
    pub count: u64,
}

/// Votes for one contest. The same shape carries both the running totals of
/// the tabulator and the deltas of a single counter count.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ContestTally {
    pub contest_ident: Uid,
    #[serde(default)]
    pub overvote_count: u64,
    #[serde(default)]
    pub undervote_count: u64,
    #[serde(default)]
    pub writein_count: u64,
    #[serde(default)]
    pub candidate_count_list: Vec<CandidateCount>,
}

impl ContestTally {
    pub fn new(contest_ident: &Uid) -> ContestTally {
        ContestTally {
            contest_ident: contest_ident.clone(),
            overvote_count: 0,
            undervote_count: 0,
            writein_count: 0,
            candidate_count_list: Vec::new(),
        }
    }

    pub fn count_for(&self, candidate_ident: &Uid) -> Option<u64> {
        self.candidate_count_list
            .iter()
            .find(|cc| cc.candidate_ident == *candidate_ident)
            .map(|cc| cc.count)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnswerCount {
    pub answer: String,
    pub count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTally {
    pub question_ident: Uid,
    #[serde(default)]
    pub overvote_count: u64,
    #[serde(default)]
    pub undervote_count: u64,
    #[serde(default)]
    pub answer_count_list: Vec<AnswerCount>,
}

impl QuestionTally {
    pub fn new(question_ident: &Uid) -> QuestionTally {
        QuestionTally {
            question_ident: question_ident.clone(),
            overvote_count: 0,
            undervote_count: 0,
            answer_count_list: Vec::new(),
        }
    }

    pub fn count_for(&self, answer: &str) -> Option<u64> {
        self.answer_count_list
            .iter()
            .find(|ac| ac.answer == answer)
            .map(|ac| ac.count)
    }
}

/// One submission from a counter: the votes it counted for one reporting
/// group in one precinct.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CounterCount {
    pub counter_ident: Uid,
    pub reporting_group: Uid,
    pub precinct_ident: Uid,
    pub jurisdiction_ident: Uid,
    pub election_ident: Uid,
    /// Provenance token of the submitted file. Must never be seen twice.
    pub file_ident: Uid,
    #[serde(default)]
    pub contest_count_list: Vec<ContestTally>,
    #[serde(default)]
    pub question_count_list: Vec<QuestionTally>,
    #[serde(default)]
    pub error_list: Vec<String>,
    #[serde(default)]
    pub warning_list: Vec<String>,
}

impl CounterCount {
    pub fn triple(&self) -> Triple {
        Triple {
            counter: self.counter_ident.clone(),
            reporting_group: self.reporting_group.clone(),
            precinct: self.precinct_ident.clone(),
        }
    }
}

// ******** Output data structures *********

/// A (counter, reporting group, precinct) combination.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Triple {
    pub counter: Uid,
    pub reporting_group: Uid,
    pub precinct: Uid,
}

impl Triple {
    pub fn new(counter: &Uid, reporting_group: &Uid, precinct: &Uid) -> Triple {
        Triple {
            counter: counter.clone(),
            reporting_group: reporting_group.clone(),
            precinct: precinct.clone(),
        }
    }
}

impl Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.counter, self.reporting_group, self.precinct
        )
    }
}

/// The completion state of a tabulator. It only ever moves forward.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    /// No counter count accepted yet.
    Initial,
    /// Some counter counts accepted, some expected ones still missing.
    Accumulating,
    /// Every expected counter count has been accepted.
    Done,
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Initial => "INITIAL",
            State::Accumulating => "ACCUMULATING",
            State::Done => "DONE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StateReport {
    pub state: State,
    /// The expected counts not received yet, in declaration order.
    pub missing: Vec<Triple>,
    /// The precincts for which every expected count has been received.
    pub finished: Vec<Uid>,
    pub total_expected: usize,
}

/// The outcome of submitting one counter count.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SubmissionReport {
    pub accepted: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Everything needed to rebuild a tabulator, as persisted between runs.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TabulatorState {
    pub election_ident: Uid,
    pub jurisdiction_ident: Uid,
    pub jurisdiction_definition: Jurisdiction,
    pub election_definition: Election,
    pub contest_count_list: Vec<ContestTally>,
    pub question_count_list: Vec<QuestionTally>,
    pub counter_count_list: Vec<CounterCount>,
    pub state: State,
}

/// Violations of the tabulator's own invariants.
///
/// These are never caused by a user mistake in a definition or a counter count
/// (those are reported as errors and warnings). They indicate a defect in the
/// caller or a corrupted snapshot, and abort the whole operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabulatorError {
    #[snafu(display("{kind} UID {uid} registered twice"))]
    DuplicateUid { kind: UidKind, uid: Uid },

    #[snafu(display("No tally entry for {kind} {uid} in {owner}"))]
    MissingTallyEntry {
        kind: UidKind,
        uid: Uid,
        owner: String,
    },

    #[snafu(display("Count overflow for {uid}"))]
    CountOverflow { uid: Uid },

    #[snafu(display(
        "Replayed {subject} does not match the stored diagnostics: stored {stored:?}, recomputed {recomputed:?}"
    ))]
    ReplayMismatch {
        subject: String,
        stored: Vec<String>,
        recomputed: Vec<String>,
    },

    #[snafu(display("Inconsistent snapshot: {reason}"))]
    SnapshotInconsistent { reason: String },
}

pub type TabulatorResult<T> = Result<T, TabulatorError>;
