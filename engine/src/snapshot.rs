//! Change tracking against the last server-agreed state.
//!
//! A [`ChangeSnapshot`] is taken when a record is constructed and again after
//! every successful fetch or save. Comparing the live fields to it tells the
//! application what has been modified locally since then.

use crate::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Baseline field values of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSnapshot {
    baseline: Fields,
}

impl ChangeSnapshot {
    /// Capture the given fields as the new baseline.
    pub fn capture(fields: &Fields) -> Self {
        Self {
            baseline: fields.clone(),
        }
    }

    /// Replace the baseline with the given fields.
    pub fn reset(&mut self, fields: &Fields) {
        self.baseline = fields.clone();
    }

    /// Fields of `current` (or of `candidate`, when given) whose value
    /// differs from the baseline, mapped to that value.
    pub fn changed_attributes(&self, current: &Fields, candidate: Option<&Fields>) -> Fields {
        candidate
            .unwrap_or(current)
            .iter()
            .filter(|(name, value)| self.baseline.get(name.as_str()) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Whether `field` (or, without a field, anything at all) differs from
    /// the baseline. A field that was removed counts as changed.
    pub fn has_changed(&self, current: &Fields, field: Option<&str>) -> bool {
        match field {
            Some(name) => self.baseline.get(name) != current.get(name),
            None => {
                current
                    .iter()
                    .any(|(name, value)| self.baseline.get(name) != Some(value))
                    || self.baseline.keys().any(|name| !current.contains_key(name))
            }
        }
    }

    /// The baseline value of `field`.
    pub fn previous(&self, field: &str) -> Option<&Value> {
        self.baseline.get(field)
    }

    /// A copy of the whole baseline.
    pub fn previous_attributes(&self) -> Fields {
        self.baseline.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn nothing_changed_right_after_capture() {
        let current = fields(json!({"name": "Tim", "age": 10}));
        let snapshot = ChangeSnapshot::capture(&current);

        assert!(snapshot.changed_attributes(&current, None).is_empty());
        assert!(!snapshot.has_changed(&current, None));
    }

    #[test]
    fn single_field_change() {
        let mut current = fields(json!({"name": "Tim", "age": 10}));
        let snapshot = ChangeSnapshot::capture(&current);
        current.insert("name".into(), json!("Rob"));

        assert!(snapshot.has_changed(&current, Some("name")));
        assert!(!snapshot.has_changed(&current, Some("age")));
        assert!(snapshot.has_changed(&current, None));
        assert_eq!(
            snapshot.changed_attributes(&current, None),
            fields(json!({"name": "Rob"}))
        );
        assert_eq!(snapshot.previous("name"), Some(&json!("Tim")));
    }

    #[test]
    fn added_and_removed_fields() {
        let mut current = fields(json!({"name": "Tim", "age": 10}));
        let snapshot = ChangeSnapshot::capture(&current);

        current.remove("age");
        assert!(snapshot.has_changed(&current, Some("age")));
        assert!(snapshot.has_changed(&current, None));
        assert!(snapshot.changed_attributes(&current, None).is_empty());

        current.insert("email".into(), json!("tim@example.com"));
        assert_eq!(
            snapshot.changed_attributes(&current, None),
            fields(json!({"email": "tim@example.com"}))
        );
        assert_eq!(snapshot.previous("email"), None);
    }

    #[test]
    fn candidate_diff_does_not_touch_state() {
        let current = fields(json!({"name": "Tim", "age": 10}));
        let snapshot = ChangeSnapshot::capture(&current);
        let candidate = fields(json!({"name": "Tim", "age": 11, "city": "Oslo"}));

        assert_eq!(
            snapshot.changed_attributes(&current, Some(&candidate)),
            fields(json!({"age": 11, "city": "Oslo"}))
        );
        assert_eq!(snapshot.previous_attributes(), current);
    }

    #[test]
    fn reset_moves_the_baseline() {
        let mut current = fields(json!({"name": "Tim"}));
        let mut snapshot = ChangeSnapshot::capture(&current);
        current.insert("name".into(), json!("Rob"));
        snapshot.reset(&current);

        assert!(!snapshot.has_changed(&current, None));
        assert_eq!(snapshot.previous("name"), Some(&json!("Rob")));
    }
}
