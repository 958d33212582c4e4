use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JSValue;
use snafu::ensure;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::config::{DuplicateUidSnafu, TabulatorError};

/// A unique identifier, in canonical string form.
///
/// Identifiers may arrive as JSON strings or numbers. They are all converted
/// to the same textual form at construction, so `7` and `"7"` are the same
/// identifier everywhere else in the crate.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Default)]
pub struct Uid(String);

impl Uid {
    pub fn new(s: impl Into<String>) -> Uid {
        Uid(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Converts any JSON scalar into its canonical identifier.
    pub fn from_json(js: &JSValue) -> Option<Uid> {
        match js {
            JSValue::String(s) => Some(Uid(s.clone())),
            JSValue::Number(n) => Some(Uid(n.to_string())),
            JSValue::Bool(b) => Some(Uid(b.to_string())),
            _ => None,
        }
    }
}

impl Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Uid {
        Uid(s.to_string())
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Uid {
        Uid(s)
    }
}

impl From<&String> for Uid {
    fn from(s: &String) -> Uid {
        Uid(s.clone())
    }
}

impl From<u64> for Uid {
    fn from(x: u64) -> Uid {
        Uid(x.to_string())
    }
}

impl From<i64> for Uid {
    fn from(x: i64) -> Uid {
        Uid(x.to_string())
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Uid, D::Error> {
        let js = JSValue::deserialize(deserializer)?;
        Uid::from_json(&js).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a string or a number as UID: {}", js))
        })
    }
}

/// The namespaces of the registry. A UID only has to be unique within its kind.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum UidKind {
    Jurisdiction,
    District,
    Precinct,
    Election,
    ReportingGroup,
    Contest,
    Candidate,
    Question,
    Counter,
    File,
}

impl Display for UidKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UidKind::Jurisdiction => "Jurisdiction",
            UidKind::District => "District",
            UidKind::Precinct => "Precinct",
            UidKind::Election => "Election",
            UidKind::ReportingGroup => "Reporting Group",
            UidKind::Contest => "Contest",
            UidKind::Candidate => "Candidate",
            UidKind::Question => "Question",
            UidKind::Counter => "Counter",
            UidKind::File => "File",
        };
        write!(f, "{}", s)
    }
}

/// All the identifiers registered for one tabulator instance.
///
/// Adding an identifier twice is a programming error: every user-facing
/// duplicate check happens before `add` is called.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct UidRegistry {
    uids: BTreeMap<UidKind, BTreeSet<Uid>>,
}

impl UidRegistry {
    pub fn new() -> UidRegistry {
        UidRegistry::default()
    }

    pub fn exists(&self, kind: UidKind, uid: &Uid) -> bool {
        self.uids
            .get(&kind)
            .map(|s| s.contains(uid))
            .unwrap_or(false)
    }

    pub fn add(&mut self, kind: UidKind, uid: &Uid) -> Result<(), TabulatorError> {
        let set = self.uids.entry(kind).or_default();
        ensure!(
            set.insert(uid.clone()),
            DuplicateUidSnafu {
                kind,
                uid: uid.clone()
            }
        );
        debug!("UidRegistry::add: {} {:?}", kind, uid);
        Ok(())
    }

    /// The registered identifiers of a kind, in sorted order.
    pub fn uids(&self, kind: UidKind) -> Vec<Uid> {
        self.uids
            .get(&kind)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: UidKind) -> usize {
        self.uids.get(&kind).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_strings_are_the_same_uid() {
        let a: Uid = serde_json::from_value(json!(17)).unwrap();
        let b: Uid = serde_json::from_value(json!("17")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Uid::from(17u64));
        assert!(serde_json::from_value::<Uid>(json!(["17"])).is_err());
    }

    #[test]
    fn add_twice_is_fatal() {
        let mut reg = UidRegistry::new();
        let p = Uid::from("P1");
        reg.add(UidKind::Precinct, &p).unwrap();
        assert!(reg.exists(UidKind::Precinct, &p));
        assert!(!reg.exists(UidKind::District, &p));
        // The same UID in another namespace is fine.
        reg.add(UidKind::District, &p).unwrap();
        let res = reg.add(UidKind::Precinct, &p);
        assert!(matches!(res, Err(TabulatorError::DuplicateUid { kind: UidKind::Precinct, .. })));
        assert_eq!(reg.count(UidKind::Precinct), 1);
    }

    #[test]
    fn uids_are_sorted() {
        let mut reg = UidRegistry::new();
        for s in ["C3", "C1", "C2"] {
            reg.add(UidKind::Counter, &Uid::from(s)).unwrap();
        }
        let names: Vec<String> = reg
            .uids(UidKind::Counter)
            .iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(names, vec!["C1", "C2", "C3"]);
        assert!(reg.uids(UidKind::File).is_empty());
    }
}
