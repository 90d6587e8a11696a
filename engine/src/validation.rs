//! Declarative field validation.
//!
//! Record types declare [`Validations`]: for each field an ordered list of
//! [`Rule`]s. A rule is either the built-in `required` check or the name of
//! a validator function, looked up on the record type chain and then among
//! the built-ins (`min`, `max`, `minLength`, `maxLength`, `pattern`).
//! Failures are collected per field into [`ValidationErrors`].

use crate::{Fields, Provider};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Message used for a failed `required` rule.
pub const REQUIRED_MESSAGE: &str = "is required";

/// Message used for every other failed rule.
pub const INVALID_MESSAGE: &str = "is invalid";

/// A validator: `(field_value, rule_value) -> passes`.
pub type ValidatorFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// One rule applied to one field.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule name, `required` or the name of a validator
    pub name: String,
    /// Argument handed to the validator
    pub value: Value,
    /// Message used instead of the type's or the default one
    pub message: Option<Provider<String>>,
}

impl Rule {
    /// Create a rule calling the validator `name` with `value`.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            message: None,
        }
    }

    pub fn required() -> Self {
        Self::new("required", true)
    }

    pub fn min(value: impl Into<Value>) -> Self {
        Self::new("min", value)
    }

    pub fn max(value: impl Into<Value>) -> Self {
        Self::new("max", value)
    }

    pub fn min_length(len: u64) -> Self {
        Self::new("minLength", len)
    }

    pub fn max_length(len: u64) -> Self {
        Self::new("maxLength", len)
    }

    pub fn pattern(regex: &str) -> Self {
        Self::new("pattern", regex)
    }

    /// Override the failure message for this rule only.
    pub fn message(mut self, message: impl Into<Provider<String>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Override the failure message with a function evaluated on failure.
    pub fn message_with(mut self, f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.message = Some(Provider::thunk(f));
        self
    }

    fn is_required(&self) -> bool {
        self.name == "required"
    }
}

/// Rules per field, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Validations {
    fields: Vec<(String, Vec<Rule>)>,
}

impl Validations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the rules for a field, appending to any earlier ones.
    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        let name = name.into();
        let rules: Vec<Rule> = rules.into_iter().collect();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => existing.extend(rules),
            None => self.fields.push((name, rules)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields
            .iter()
            .map(|(field, rules)| (field.as_str(), rules.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-type replacements for the default messages, keyed by rule name.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    by_rule: HashMap<String, Provider<String>>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl Into<String>, message: impl Into<Provider<String>>) -> Self {
        self.by_rule.insert(rule.into(), message.into());
        self
    }

    pub fn get(&self, rule: &str) -> Option<&Provider<String>> {
        self.by_rule.get(rule)
    }
}

/// Failure messages per field. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages for a field, if it failed.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, messages)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Run `validations` against `fields`.
///
/// `resolve` maps a rule name to a validator declared on the record type;
/// names it does not know fall back to [`builtin_validator`], and names
/// nobody knows fail.
pub fn validate_fields(
    fields: &Fields,
    validations: &Validations,
    messages: &Messages,
    resolve: impl Fn(&str) -> Option<ValidatorFn>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for (field, rules) in validations.iter() {
        let value = fields.get(field);

        for rule in rules {
            let passed = if rule.is_required() {
                rule.value == Value::Bool(false) || !is_blank(value)
            } else if is_blank(value) {
                // Only required rules apply to empty fields.
                true
            } else {
                match resolve(&rule.name).or_else(|| builtin_validator(&rule.name)) {
                    Some(validator) => validator(value.unwrap_or(&Value::Null), &rule.value),
                    None => false,
                }
            };

            if !passed {
                errors.add(field, message_for(rule, messages));
            }
        }
    }

    errors
}

fn message_for(rule: &Rule, messages: &Messages) -> String {
    if let Some(message) = &rule.message {
        return message.resolve();
    }
    if let Some(message) = messages.get(&rule.name) {
        return message.resolve();
    }
    if rule.is_required() {
        REQUIRED_MESSAGE.to_string()
    } else {
        INVALID_MESSAGE.to_string()
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Validators every record type understands.
pub fn builtin_validator(name: &str) -> Option<ValidatorFn> {
    let validator: ValidatorFn = match name {
        "min" => Arc::new(|value: &Value, min: &Value| compare(value, min, |v, m| v >= m)),
        "max" => Arc::new(|value: &Value, max: &Value| compare(value, max, |v, m| v <= m)),
        "minLength" => Arc::new(|value: &Value, len: &Value| length(value, len, |v, l| v >= l)),
        "maxLength" => Arc::new(|value: &Value, len: &Value| length(value, len, |v, l| v <= l)),
        "pattern" => Arc::new(matches_pattern),
        _ => return None,
    };
    Some(validator)
}

fn compare(value: &Value, bound: &Value, ok: impl Fn(f64, f64) -> bool) -> bool {
    match (value.as_f64(), bound.as_f64()) {
        (Some(v), Some(b)) => ok(v, b),
        _ => false,
    }
}

fn length(value: &Value, bound: &Value, ok: impl Fn(u64, u64) -> bool) -> bool {
    let len = match value {
        Value::String(s) => s.chars().count() as u64,
        Value::Array(items) => items.len() as u64,
        _ => return false,
    };
    bound.as_u64().map(|b| ok(len, b)).unwrap_or(false)
}

fn matches_pattern(value: &Value, pattern: &Value) -> bool {
    let (Some(text), Some(pattern)) = (value.as_str(), pattern.as_str()) else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(text),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "invalid validation pattern");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn no_custom(_: &str) -> Option<ValidatorFn> {
        None
    }

    #[test]
    fn required_fails_on_missing_null_and_empty() {
        let validations = Validations::new()
            .field("a", [Rule::required()])
            .field("b", [Rule::required()])
            .field("c", [Rule::required()])
            .field("d", [Rule::required()]);
        let data = fields(json!({"b": null, "c": "", "d": 0}));

        let errors = validate_fields(&data, &validations, &Messages::new(), no_custom);

        assert_eq!(errors.get("a"), Some(&["is required".to_string()][..]));
        assert_eq!(errors.get("b"), Some(&["is required".to_string()][..]));
        assert_eq!(errors.get("c"), Some(&["is required".to_string()][..]));
        assert_eq!(errors.get("d"), None);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn required_false_is_not_enforced() {
        let validations = Validations::new().field("a", [Rule::new("required", false)]);
        let errors = validate_fields(&Fields::new(), &validations, &Messages::new(), no_custom);
        assert!(errors.is_empty());
    }

    #[test]
    fn min_rule() {
        let validations = Validations::new().field("number", [Rule::min(5)]);

        let errors = validate_fields(
            &fields(json!({"number": 3})),
            &validations,
            &Messages::new(),
            no_custom,
        );
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"number": ["is invalid"]})
        );

        let errors = validate_fields(
            &fields(json!({"number": 5})),
            &validations,
            &Messages::new(),
            no_custom,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn optional_fields_skip_non_required_rules() {
        let validations = Validations::new().field("number", [Rule::min(5)]);
        let errors = validate_fields(&Fields::new(), &validations, &Messages::new(), no_custom);
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_rule_always_fails() {
        let validations = Validations::new().field("name", [Rule::new("palindrome", true)]);
        let errors = validate_fields(
            &fields(json!({"name": "abba"})),
            &validations,
            &Messages::new(),
            no_custom,
        );
        assert_eq!(errors.get("name"), Some(&["is invalid".to_string()][..]));
    }

    #[test]
    fn custom_validator_is_used() {
        let validations = Validations::new().field("n", [Rule::new("even", true)]);
        let even = |name: &str| -> Option<ValidatorFn> {
            (name == "even").then(|| -> ValidatorFn {
                Arc::new(|value: &Value, _: &Value| value.as_i64().map(|n| n % 2 == 0).unwrap_or(false))
            })
        };

        let ok = validate_fields(&fields(json!({"n": 4})), &validations, &Messages::new(), even);
        assert!(ok.is_empty());

        let bad = validate_fields(&fields(json!({"n": 3})), &validations, &Messages::new(), even);
        assert_eq!(bad.get("n").map(<[String]>::len), Some(1));
    }

    #[test]
    fn message_precedence() {
        let validations = Validations::new()
            .field("a", [Rule::required()])
            .field("b", [Rule::required().message("can't be blank")])
            .field("c", [Rule::min(10).message_with(|| format!("must be at least {}", 10))]);
        let messages = Messages::new().with("required", "must be given");
        let data = fields(json!({"c": 1}));

        let errors = validate_fields(&data, &validations, &messages, no_custom);

        assert_eq!(errors.get("a"), Some(&["must be given".to_string()][..]));
        assert_eq!(errors.get("b"), Some(&["can't be blank".to_string()][..]));
        assert_eq!(errors.get("c"), Some(&["must be at least 10".to_string()][..]));
    }

    #[test]
    fn multiple_messages_keep_rule_order() {
        let validations = Validations::new()
            .field("code", [Rule::min_length(4), Rule::pattern("^[0-9]+$")]);
        let errors = validate_fields(
            &fields(json!({"code": "ab"})),
            &validations,
            &Messages::new().with("pattern", "must be digits"),
            no_custom,
        );
        assert_eq!(
            errors.get("code"),
            Some(&["is invalid".to_string(), "must be digits".to_string()][..])
        );
    }

    #[test]
    fn builtin_validators() {
        let max = builtin_validator("max").unwrap();
        assert!(max(&json!(3), &json!(5)));
        assert!(!max(&json!(6), &json!(5)));
        assert!(!max(&json!("3"), &json!(5)));

        let max_len = builtin_validator("maxLength").unwrap();
        assert!(max_len(&json!("héllo"), &json!(5)));
        assert!(!max_len(&json!([1, 2, 3]), &json!(2)));

        let pattern = builtin_validator("pattern").unwrap();
        assert!(pattern(&json!("abc"), &json!("^a")));
        assert!(!pattern(&json!("abc"), &json!("(")));

        assert!(builtin_validator("palindrome").is_none());
    }

    #[test]
    fn errors_display() {
        let mut errors = ValidationErrors::new();
        errors.add("number", "is invalid");
        errors.add("name", "is required");
        errors.add("name", "is invalid");
        assert_eq!(
            errors.to_string(),
            "name is required, is invalid; number is invalid"
        );
    }
}
