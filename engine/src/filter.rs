//! Field filters applied to incoming and outgoing record data.
//!
//! A [`FilterMap`] names, per field path, how a value is transformed: either
//! by a closure declared inline or by a filter looked up by name in a
//! [`FilterRegistry`]. Read filters run on data coming from the backend,
//! write filters on the copy of the record that is sent to it.

use crate::{error::Result, Error, Fields};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A registered filter: `(value, args) -> value`.
pub type FilterFn = Arc<dyn Fn(Value, &[Value]) -> Value + Send + Sync>;

/// An inline transform. Receives the current value and the object that
/// holds the field (the whole record payload).
pub type TransformFn = Arc<dyn Fn(Value, &Fields) -> Value + Send + Sync>;

/// How a single field is transformed.
#[derive(Clone)]
pub enum Filter {
    /// Inline closure.
    Transform(TransformFn),
    /// Registry lookup by name or pipe expression, with extra arguments.
    Named { name: String, args: Vec<Value> },
}

impl Filter {
    /// Inline transform filter.
    pub fn transform(f: impl Fn(Value, &Fields) -> Value + Send + Sync + 'static) -> Self {
        Filter::Transform(Arc::new(f))
    }

    /// Named filter without extra arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Filter::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Named filter called as `filter(value, args...)`.
    pub fn with_args(name: impl Into<String>, args: Vec<Value>) -> Self {
        Filter::Named {
            name: name.into(),
            args,
        }
    }
}

impl From<&str> for Filter {
    fn from(name: &str) -> Self {
        Filter::named(name)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Transform(_) => f.write_str("Transform(..)"),
            Filter::Named { name, args } => f
                .debug_struct("Named")
                .field("name", name)
                .field("args", args)
                .finish(),
        }
    }
}

/// Ordered mapping of field path to filter.
#[derive(Debug, Clone, Default)]
pub struct FilterMap {
    entries: Vec<(String, Filter)>,
}

impl FilterMap {
    /// Create an empty filter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, path: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.insert(path, filter);
        self
    }

    /// Set the filter for a path, replacing an earlier one for the same path.
    pub fn insert(&mut self, path: impl Into<String>, filter: impl Into<Filter>) {
        let path = path.into();
        let filter = filter.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = filter,
            None => self.entries.push((path, filter)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.entries.iter().map(|(p, f)| (p.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named filters available to filter maps.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl FilterRegistry {
    /// A registry with no filters at all.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// A registry holding the built-in filters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("suffix", suffix);
        registry.register("lowercase", |value, _| map_str(value, str::to_lowercase));
        registry.register("uppercase", |value, _| map_str(value, str::to_uppercase));
        registry.register("toTimestamp", to_timestamp);
        registry.register("toISO8601", to_iso8601);
        registry
    }

    /// Register (or replace) a named filter.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(Value, &[Value]) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Builder-style method to register a filter.
    pub fn with(
        mut self,
        name: impl Into<String>,
        filter: impl Fn(Value, &[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.register(name, filter);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Resolve a filter name or a pipe expression such as
    /// `"suffix:'!'|uppercase"` into a single callable.
    ///
    /// Arguments given at call time are appended to the first stage's
    /// inline arguments.
    pub fn lookup(&self, expr: &str) -> Result<FilterFn> {
        let stages = split_unquoted(expr, '|');
        if stages.len() == 1 && !expr.contains(':') {
            let name = expr.trim();
            return self
                .filters
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownFilter(name.to_string()));
        }

        let mut pipeline = Vec::with_capacity(stages.len());
        for stage in stages {
            let mut parts = split_unquoted(stage, ':').into_iter();
            let name = parts.next().unwrap_or_default().trim();
            let filter = self
                .filters
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownFilter(name.to_string()))?;
            let args: Vec<Value> = parts.map(parse_arg).collect();
            pipeline.push((filter, args));
        }

        Ok(Arc::new(move |value: Value, extra: &[Value]| -> Value {
            let mut value = value;
            for (i, (filter, args)) in pipeline.iter().enumerate() {
                value = if i == 0 && !extra.is_empty() {
                    let mut all = args.clone();
                    all.extend_from_slice(extra);
                    filter(value, &all)
                } else {
                    filter(value, args)
                };
            }
            value
        }))
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

/// Apply every filter whose path is present in `target`, in place.
///
/// Paths may use dots to reach into nested objects. A path whose leaf or
/// any intermediate object is missing is skipped.
pub fn apply_filters(
    filters: &FilterMap,
    registry: &FilterRegistry,
    target: &mut Fields,
) -> Result<()> {
    for (path, filter) in filters.iter() {
        let Some(current) = lookup_path(target, path).cloned() else {
            continue;
        };

        let filtered = match filter {
            Filter::Transform(f) => f(current, &*target),
            Filter::Named { name, args } => registry.lookup(name)?(current, args),
        };

        if let Some(slot) = lookup_path_mut(target, path) {
            *slot = filtered;
        }
    }
    Ok(())
}

fn lookup_path<'a>(target: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut value = target.get(segments.next()?)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn lookup_path_mut<'a>(target: &'a mut Fields, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let mut value = target.get_mut(segments.next()?)?;
    for segment in segments {
        value = value.as_object_mut()?.get_mut(segment)?;
    }
    Some(value)
}

/// Split on `sep` outside of single or double quotes.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == sep => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Inline pipe arguments are JSON literals; anything else is a string.
fn parse_arg(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| {
        let unquoted = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(raw);
        Value::String(unquoted.to_string())
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn suffix(value: Value, args: &[Value]) -> Value {
    match args.first() {
        Some(suffix) => Value::String(format!("{}{}", display(&value), display(suffix))),
        None => value,
    }
}

fn to_timestamp(value: Value, _args: &[Value]) -> Value {
    let Value::String(text) = &value else {
        return value;
    };

    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp_millis())
        });

    match parsed {
        Ok(millis) => Value::from(millis),
        Err(_) => {
            tracing::warn!(value = %text, "not a valid ISO8601 date");
            value
        }
    }
}

fn to_iso8601(value: Value, _args: &[Value]) -> Value {
    match value.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value,
    }
}
