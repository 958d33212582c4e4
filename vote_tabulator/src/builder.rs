pub use crate::config::*;
use crate::uid::Uid;
use crate::Tabulator;

/// A builder for jurisdiction definitions.
pub struct JurisdictionBuilder {
    _jurisdiction: Jurisdiction,
}

impl JurisdictionBuilder {
    pub fn new(ident: &str) -> JurisdictionBuilder {
        JurisdictionBuilder {
            _jurisdiction: Jurisdiction {
                ident: Uid::from(ident),
                display_name: None,
                district_list: Vec::new(),
                precinct_list: Vec::new(),
                error_list: Vec::new(),
                warning_list: Vec::new(),
            },
        }
    }

    pub fn district(mut self, ident: &str) -> JurisdictionBuilder {
        self._jurisdiction.district_list.push(District {
            ident: Uid::from(ident),
            display_name: None,
            district_type: None,
        });
        self
    }

    pub fn precinct(mut self, ident: &str) -> JurisdictionBuilder {
        self._jurisdiction.precinct_list.push(Precinct {
            ident: Uid::from(ident),
            display_name: None,
        });
        self
    }

    pub fn precinct_named(mut self, ident: &str, display_name: &str) -> JurisdictionBuilder {
        self._jurisdiction.precinct_list.push(Precinct {
            ident: Uid::from(ident),
            display_name: Some(display_name.to_string()),
        });
        self
    }

    pub fn build(self) -> Jurisdiction {
        self._jurisdiction
    }
}

/// A builder for election definitions.
///
/// ```
/// use vote_tabulator::builder::{ElectionBuilder, JurisdictionBuilder};
/// use vote_tabulator::{State, Tabulator};
///
/// let jurisdiction = JurisdictionBuilder::new("J1")
///     .district("D1")
///     .precinct("P1")
///     .build();
/// let election = ElectionBuilder::new("E1")
///     .contest("MAYOR", "D1")
///     .candidate("ANNA", "MAYOR")
///     .counter("C1")
///     .reporting_group("Normal")
///     .expected_count("C1", "Normal", &["P1"])
///     .build();
///
/// let tabulator = Tabulator::new(jurisdiction, election)?;
/// assert!(tabulator.is_valid());
/// assert_eq!(tabulator.state().state, State::Initial);
/// # Ok::<(), vote_tabulator::TabulatorError>(())
/// ```
pub struct ElectionBuilder {
    _election: Election,
}

impl ElectionBuilder {
    pub fn new(ident: &str) -> ElectionBuilder {
        ElectionBuilder {
            _election: Election {
                ident: Uid::from(ident),
                display_name: None,
                start_date: None,
                contest_list: Vec::new(),
                candidate_list: Vec::new(),
                question_list: Vec::new(),
                counter_list: Vec::new(),
                reporting_group_list: Vec::new(),
                expected_count_list: Vec::new(),
                error_list: Vec::new(),
                warning_list: Vec::new(),
            },
        }
    }

    pub fn contest(mut self, ident: &str, district_ident: &str) -> ElectionBuilder {
        self._election.contest_list.push(Contest {
            ident: Uid::from(ident),
            district_ident: Uid::from(district_ident),
            display_name: None,
        });
        self
    }

    pub fn candidate(mut self, ident: &str, contest_ident: &str) -> ElectionBuilder {
        self._election.candidate_list.push(Candidate {
            ident: Uid::from(ident),
            contest_ident: Uid::from(contest_ident),
            display_name: None,
            party_ident: None,
        });
        self
    }

    pub fn question(mut self, ident: &str, district_ident: &str, answers: &[&str]) -> ElectionBuilder {
        self._election.question_list.push(Question {
            ident: Uid::from(ident),
            district_ident: Uid::from(district_ident),
            display_name: None,
            question: None,
            answer_list: answers.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    pub fn counter(mut self, ident: &str) -> ElectionBuilder {
        self._election.counter_list.push(Counter {
            ident: Uid::from(ident),
            display_name: None,
        });
        self
    }

    pub fn reporting_group(mut self, name: &str) -> ElectionBuilder {
        self._election.reporting_group_list.push(Uid::from(name));
        self
    }

    pub fn expected_count(
        mut self,
        counter_ident: &str,
        reporting_group: &str,
        precincts: &[&str],
    ) -> ElectionBuilder {
        self._election.expected_count_list.push(ExpectedCount {
            counter_ident: Uid::from(counter_ident),
            reporting_group: Uid::from(reporting_group),
            precinct_ident_list: precincts.iter().map(|p| Uid::from(*p)).collect(),
        });
        self
    }

    pub fn build(self) -> Election {
        self._election
    }
}

/// A builder for counter counts.
///
/// It starts from a submission that covers every contest, candidate, question
/// and answer with a zero count, so that only the non-zero votes need to be
/// filled in.
pub struct CounterCountBuilder {
    _counter_count: CounterCount,
}

impl CounterCountBuilder {
    pub fn covering(
        jurisdiction_ident: &str,
        election_ident: &str,
        contests: &[ContestTally],
        questions: &[QuestionTally],
    ) -> CounterCountBuilder {
        let contest_count_list = contests
            .iter()
            .map(|t| ContestTally {
                candidate_count_list: t
                    .candidate_count_list
                    .iter()
                    .map(|c| CandidateCount {
                        candidate_ident: c.candidate_ident.clone(),
                        count: 0,
                    })
                    .collect(),
                ..ContestTally::new(&t.contest_ident)
            })
            .collect();
        let question_count_list = questions
            .iter()
            .map(|t| QuestionTally {
                answer_count_list: t
                    .answer_count_list
                    .iter()
                    .map(|a| AnswerCount {
                        answer: a.answer.clone(),
                        count: 0,
                    })
                    .collect(),
                ..QuestionTally::new(&t.question_ident)
            })
            .collect();
        CounterCountBuilder {
            _counter_count: CounterCount {
                counter_ident: Uid::default(),
                reporting_group: Uid::default(),
                precinct_ident: Uid::default(),
                jurisdiction_ident: Uid::from(jurisdiction_ident),
                election_ident: Uid::from(election_ident),
                file_ident: Uid::default(),
                contest_count_list,
                question_count_list,
                error_list: Vec::new(),
                warning_list: Vec::new(),
            },
        }
    }

    /// Starts from the contests and questions registered in a tabulator.
    pub fn for_tabulator(tabulator: &Tabulator) -> CounterCountBuilder {
        let s = tabulator.snapshot();
        CounterCountBuilder::covering(
            s.jurisdiction_ident.as_str(),
            s.election_ident.as_str(),
            &s.contest_count_list,
            &s.question_count_list,
        )
    }

    pub fn submission(
        mut self,
        file_ident: &str,
        counter_ident: &str,
        reporting_group: &str,
        precinct_ident: &str,
    ) -> CounterCountBuilder {
        let cc = &mut self._counter_count;
        cc.file_ident = Uid::from(file_ident);
        cc.counter_ident = Uid::from(counter_ident);
        cc.reporting_group = Uid::from(reporting_group);
        cc.precinct_ident = Uid::from(precinct_ident);
        self
    }

    pub fn idents(mut self, jurisdiction_ident: &str, election_ident: &str) -> CounterCountBuilder {
        self._counter_count.jurisdiction_ident = Uid::from(jurisdiction_ident);
        self._counter_count.election_ident = Uid::from(election_ident);
        self
    }

    fn contest_mut(&mut self, contest_ident: &str) -> &mut ContestTally {
        let uid = Uid::from(contest_ident);
        let list = &mut self._counter_count.contest_count_list;
        let idx = match list.iter().position(|t| t.contest_ident == uid) {
            Some(idx) => idx,
            None => {
                list.push(ContestTally::new(&uid));
                list.len() - 1
            }
        };
        &mut list[idx]
    }

    fn question_mut(&mut self, question_ident: &str) -> &mut QuestionTally {
        let uid = Uid::from(question_ident);
        let list = &mut self._counter_count.question_count_list;
        let idx = match list.iter().position(|t| t.question_ident == uid) {
            Some(idx) => idx,
            None => {
                list.push(QuestionTally::new(&uid));
                list.len() - 1
            }
        };
        &mut list[idx]
    }

    /// Sets the votes of a candidate.
    pub fn vote(mut self, contest_ident: &str, candidate_ident: &str, count: u64) -> CounterCountBuilder {
        let uid = Uid::from(candidate_ident);
        let tally = self.contest_mut(contest_ident);
        match tally
            .candidate_count_list
            .iter_mut()
            .find(|c| c.candidate_ident == uid)
        {
            Some(c) => c.count = count,
            None => tally.candidate_count_list.push(CandidateCount {
                candidate_ident: uid,
                count,
            }),
        }
        self
    }

    pub fn contest_extras(
        mut self,
        contest_ident: &str,
        overvote: u64,
        undervote: u64,
        writein: u64,
    ) -> CounterCountBuilder {
        let tally = self.contest_mut(contest_ident);
        tally.overvote_count = overvote;
        tally.undervote_count = undervote;
        tally.writein_count = writein;
        self
    }

    /// Sets the votes of an answer.
    pub fn answer(mut self, question_ident: &str, answer: &str, count: u64) -> CounterCountBuilder {
        let tally = self.question_mut(question_ident);
        match tally.answer_count_list.iter_mut().find(|a| a.answer == answer) {
            Some(a) => a.count = count,
            None => tally.answer_count_list.push(AnswerCount {
                answer: answer.to_string(),
                count,
            }),
        }
        self
    }

    pub fn question_extras(
        mut self,
        question_ident: &str,
        overvote: u64,
        undervote: u64,
    ) -> CounterCountBuilder {
        let tally = self.question_mut(question_ident);
        tally.overvote_count = overvote;
        tally.undervote_count = undervote;
        self
    }

    pub fn build(self) -> CounterCount {
        self._counter_count
    }
}
