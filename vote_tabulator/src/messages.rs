use log::{debug, warn};
use std::fmt::Display;

/// A diagnostic message, built from ordered (label, value) pairs.
///
/// It renders as `Label (value) label2 (value2) ...`; a pair without value
/// only renders its label. The rendered strings are stored in snapshots and
/// compared for exact equality on replay, so the template must not change.
///
/// ```
/// use vote_tabulator::Message;
///
/// let m = Message::new("Non-Existent Contest UID")
///     .value("CONTEST_9")
///     .then("for Candidate UID")
///     .value("CAND_1");
/// assert_eq!(
///     m.to_string(),
///     "Non-Existent Contest UID (CONTEST_9) for Candidate UID (CAND_1)"
/// );
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    parts: Vec<(String, Option<String>)>,
}

impl Message {
    pub fn new(label: &str) -> Message {
        Message {
            parts: vec![(label.to_string(), None)],
        }
    }

    /// Attaches a value to the last label.
    pub fn value(mut self, v: impl Display) -> Message {
        if let Some(last) = self.parts.last_mut() {
            last.1 = Some(v.to_string());
        }
        self
    }

    /// Attaches a list of values to the last label, separated by commas.
    pub fn values<T: Display>(self, vs: &[T]) -> Message {
        let joined: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
        self.value(joined.join(", "))
    }

    /// Starts a new label.
    pub fn then(mut self, label: &str) -> Message {
        self.parts.push((label.to_string(), None));
        self
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (label, value) in self.parts.iter() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", label)?;
            if let Some(v) = value {
                write!(f, " ({})", v)?;
            }
        }
        Ok(())
    }
}

/// The errors and warnings found by one validation, in the order found.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error(&mut self, m: Message) {
        let s = m.to_string();
        warn!("error: {}", s);
        self.errors.push(s);
    }

    pub fn warning(&mut self, m: Message) {
        let s = m.to_string();
        debug!("warning: {}", s);
        self.warnings.push(s);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_without_values() {
        let m = Message::new("Duplicate Counter Count")
            .value("C1, Normal, P1")
            .then("Input to Tabulator");
        assert_eq!(
            m.to_string(),
            "Duplicate Counter Count (C1, Normal, P1) Input to Tabulator"
        );
        assert_eq!(
            Message::new("Empty Reporting Group List in Election Definition").to_string(),
            "Empty Reporting Group List in Election Definition"
        );
    }

    #[test]
    fn list_values() {
        let m = Message::new("Missing Contest UIDs")
            .values(&["A", "B"])
            .then("in Counter Count")
            .value("F1");
        assert_eq!(m.to_string(), "Missing Contest UIDs (A, B) in Counter Count (F1)");
    }

    #[test]
    fn diagnostics_keep_order() {
        let mut d = Diagnostics::new();
        d.warning(Message::new("w1"));
        d.error(Message::new("e1"));
        d.warning(Message::new("w2"));
        assert!(d.has_errors());
        assert_eq!(d.warnings, vec!["w1", "w2"]);
        assert_eq!(d.errors, vec!["e1"]);
    }
}
