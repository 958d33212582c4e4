use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Triple;
use crate::messages::Message;
use crate::uid::Uid;

/// How close an incoming counter count comes to a declared expected count.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Expectation {
    /// The triple was declared.
    Expected,
    /// The counter and the reporting group are expected, but not for this precinct.
    WrongPrecinct,
    /// The counter is expected, but not under this reporting group.
    WrongGroup,
    /// The counter is not expected at all.
    WrongCounter,
}

/// Tracks which (counter, reporting group, precinct) submissions are
/// expected, and which of them have been received.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ExpectedCountLedger {
    // counter -> reporting group -> precinct -> fulfilled
    entries: BTreeMap<Uid, BTreeMap<Uid, BTreeMap<Uid, bool>>>,
    // All the expected precincts, in first declaration order.
    precincts: Vec<Uid>,
    // Declared and not fulfilled yet, in declaration order.
    missing: Vec<Triple>,
    finished: Vec<Uid>,
    total: usize,
    // Every accepted triple, expected or not.
    accumulated: BTreeSet<Triple>,
}

impl ExpectedCountLedger {
    pub fn new() -> ExpectedCountLedger {
        ExpectedCountLedger::default()
    }

    /// Declares an expected submission.
    ///
    /// Returns a warning if the exact same triple was already declared.
    pub fn declare(&mut self, counter: &Uid, group: &Uid, precinct: &Uid) -> Option<Message> {
        let precincts = self
            .entries
            .entry(counter.clone())
            .or_default()
            .entry(group.clone())
            .or_default();
        if precincts.contains_key(precinct) {
            return Some(
                Message::new("Duplicate Expected Count")
                    .value(Triple::new(counter, group, precinct))
                    .then("in Election Definition"),
            );
        }
        precincts.insert(precinct.clone(), false);
        if !self.precincts.contains(precinct) {
            self.precincts.push(precinct.clone());
        }
        self.missing.push(Triple::new(counter, group, precinct));
        self.total += 1;
        self.update_finished();
        None
    }

    pub fn classify(&self, counter: &Uid, group: &Uid, precinct: &Uid) -> Expectation {
        match self.entries.get(counter) {
            None => Expectation::WrongCounter,
            Some(groups) => match groups.get(group) {
                None => Expectation::WrongGroup,
                Some(precincts) if precincts.contains_key(precinct) => Expectation::Expected,
                Some(_) => Expectation::WrongPrecinct,
            },
        }
    }

    /// Records an accepted submission.
    ///
    /// Returns true if this fulfilled a declared, outstanding expectation.
    pub fn fulfill(&mut self, counter: &Uid, group: &Uid, precinct: &Uid) -> bool {
        let triple = Triple::new(counter, group, precinct);
        self.accumulated.insert(triple.clone());
        let slot = self
            .entries
            .get_mut(counter)
            .and_then(|groups| groups.get_mut(group))
            .and_then(|precincts| precincts.get_mut(precinct));
        match slot {
            Some(fulfilled) if !*fulfilled => {
                *fulfilled = true;
                self.missing.retain(|t| *t != triple);
                self.update_finished();
                debug!(
                    "fulfill: {} fulfilled, {} still missing",
                    triple,
                    self.missing.len()
                );
                if self.is_complete() {
                    info!("fulfill: all {} expected counts received", self.total);
                }
                true
            }
            _ => {
                debug!("fulfill: {} was not an outstanding expected count", triple);
                false
            }
        }
    }

    fn update_finished(&mut self) {
        let missing_precincts: BTreeSet<&Uid> = self.missing.iter().map(|t| &t.precinct).collect();
        self.finished = self
            .precincts
            .iter()
            .filter(|p| !missing_precincts.contains(p))
            .cloned()
            .collect();
    }

    pub fn is_accumulated(&self, triple: &Triple) -> bool {
        self.accumulated.contains(triple)
    }

    pub fn missing(&self) -> &[Triple] {
        &self.missing
    }

    pub fn finished(&self) -> &[Uid] {
        &self.finished
    }

    pub fn precincts(&self) -> &[Uid] {
        &self.precincts
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// True once every declared triple is fulfilled. A ledger with nothing
    /// declared is never complete.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.missing.is_empty()
    }
}
