//! Record types and how they extend one another.
//!
//! A [`RecordType`] is the declared blueprint for records: where they live
//! (URL root, id attribute), how their data is shaped (defaults, parse hook,
//! read and write filters), how they are validated, and which transport
//! carries them. Types form a chain: [`RecordType::extend`] starts a child
//! declaration, and every setting the child leaves out is looked up on its
//! parent, then the parent's parent, and so on.
//!
//! Hooks and named methods receive a [`Super`] handle pointing at the
//! parent of the type that declared them, so an override can delegate to
//! the behavior it replaces.

use crate::filter::{FilterMap, FilterRegistry};
use crate::record::{default_url, Record};
use crate::transport::HttpClient;
use crate::validation::{Messages, ValidatorFn, Validations};
use crate::{error::Result, Error, Fields, Provider, SyncOptions};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default name of the id attribute.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Hook turning a response body (or constructor input) into record fields.
pub type ParseFn = Arc<dyn Fn(&Super<'_>, Value, &SyncOptions) -> Value + Send + Sync>;

/// Hook replacing URL resolution.
pub type UrlFn = Arc<dyn Fn(&Super<'_>, &Record) -> Result<String> + Send + Sync>;

/// Hook run on every new record before its first snapshot.
pub type InitializeFn = Arc<dyn Fn(&Super<'_>, &mut Record) + Send + Sync>;

/// A named instance method.
pub type MethodFn = Arc<dyn Fn(&Super<'_>, &Record, &[Value]) -> Result<Value> + Send + Sync>;

/// What one level of the chain declares. `None` means "ask the parent".
#[derive(Default)]
struct Behavior {
    id_attribute: Option<String>,
    url_root: Option<Provider<String>>,
    defaults: Option<Provider<Fields>>,
    read_filters: Option<FilterMap>,
    write_filters: Option<FilterMap>,
    validations: Option<Validations>,
    messages: Option<Messages>,
    client: Option<Arc<dyn HttpClient>>,
    parse: Option<ParseFn>,
    url: Option<UrlFn>,
    initialize: Option<InitializeFn>,
    methods: HashMap<String, MethodFn>,
    validators: HashMap<String, ValidatorFn>,
}

struct Inner {
    name: String,
    parent: Option<RecordType>,
    behavior: Behavior,
    statics: Fields,
    registry: Arc<FilterRegistry>,
}

/// A declared record type. Cheap to clone; clones are the same type.
#[derive(Clone)]
pub struct RecordType {
    inner: Arc<Inner>,
}

impl RecordType {
    /// Start declaring a root type.
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name.into(), None)
    }

    /// Start declaring a type that inherits everything from this one.
    pub fn extend(&self, name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name.into(), Some(self.clone()))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&RecordType> {
        self.inner.parent.as_ref()
    }

    /// This type followed by its parent chain.
    pub fn ancestors(&self) -> impl Iterator<Item = &RecordType> {
        std::iter::successors(Some(self), |ty| ty.parent())
    }

    /// Whether this type is `other` or was extended from it.
    pub fn is_a(&self, other: &RecordType) -> bool {
        self.ancestors().any(|ty| ty == other)
    }

    fn find<'a, T>(&'a self, pick: impl Fn(&'a Behavior) -> Option<T>) -> Option<T> {
        self.ancestors().find_map(|ty| pick(&ty.inner.behavior))
    }

    /// Like `find`, but also returns the type that declared the value.
    fn find_with_level<'a, T>(
        &'a self,
        pick: impl Fn(&'a Behavior) -> Option<T>,
    ) -> Option<(&'a RecordType, T)> {
        self.ancestors()
            .find_map(|ty| pick(&ty.inner.behavior).map(|value| (ty, value)))
    }

    /// Field holding the record id. Defaults to `"id"`.
    pub fn id_attribute(&self) -> &str {
        self.find(|b| b.id_attribute.as_deref())
            .unwrap_or(DEFAULT_ID_ATTRIBUTE)
    }

    /// The resolved URL root, if one is declared.
    pub fn url_root(&self) -> Option<String> {
        self.find(|b| b.url_root.as_ref()).map(Provider::resolve)
    }

    /// Freshly resolved default fields.
    pub fn defaults(&self) -> Option<Fields> {
        self.find(|b| b.defaults.as_ref()).map(Provider::resolve)
    }

    pub fn read_filters(&self) -> Option<&FilterMap> {
        self.find(|b| b.read_filters.as_ref())
    }

    pub fn write_filters(&self) -> Option<&FilterMap> {
        self.find(|b| b.write_filters.as_ref())
    }

    pub fn validations(&self) -> Option<&Validations> {
        self.find(|b| b.validations.as_ref())
    }

    pub fn messages(&self) -> Option<&Messages> {
        self.find(|b| b.messages.as_ref())
    }

    /// Registry used to resolve named filters.
    pub fn filter_registry(&self) -> &FilterRegistry {
        &self.inner.registry
    }

    /// Transport used by records of this type.
    pub fn client(&self) -> Option<&Arc<dyn HttpClient>> {
        self.find(|b| b.client.as_ref())
    }

    /// Validator declared for a rule name on this type chain.
    pub fn validator(&self, rule: &str) -> Option<ValidatorFn> {
        self.find(|b| b.validators.get(rule).cloned())
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.find(|b| b.methods.get(name)).is_some()
    }

    /// A type-level field, inherited from the parent chain.
    pub fn static_field(&self, name: &str) -> Option<&Value> {
        self.ancestors().find_map(|ty| ty.inner.statics.get(name))
    }

    /// All type-level fields, with children overriding parents.
    pub fn statics(&self) -> Fields {
        let chain: Vec<&RecordType> = self.ancestors().collect();
        let mut statics = Fields::new();
        for ty in chain.into_iter().rev() {
            for (name, value) in &ty.inner.statics {
                statics.insert(name.clone(), value.clone());
            }
        }
        statics
    }

    /// Run the parse hook, or return `data` unchanged if none is declared.
    pub fn parse(&self, data: Value, options: &SyncOptions) -> Value {
        match self.find_with_level(|b| b.parse.clone()) {
            Some((level, hook)) => hook(&Super::of(level), data, options),
            None => data,
        }
    }

    /// Run the initialize hook, if one is declared on the chain.
    pub fn initialize(&self, record: &mut Record) {
        if let Some((level, hook)) = self.find_with_level(|b| b.initialize.clone()) {
            hook(&Super::of(level), record);
        }
    }

    /// Resolve the URL of `record` through the URL hook, or the default
    /// `root/id` scheme.
    pub fn resolve_url(&self, record: &Record) -> Result<String> {
        match self.find_with_level(|b| b.url.clone()) {
            Some((level, hook)) => hook(&Super::of(level), record),
            None => default_url(record),
        }
    }

    /// Call a named method on behalf of `record`.
    pub fn call(&self, name: &str, record: &Record, args: &[Value]) -> Result<Value> {
        match self.find_with_level(|b| b.methods.get(name).cloned()) {
            Some((level, method)) => method(&Super::of(level), record, args),
            None => Err(Error::UnknownMethod(name.to_string())),
        }
    }

    /// A record with defaults applied and no other fields.
    pub fn new_record(&self) -> Record {
        Record::from_fields(self, None)
    }

    /// A record built from `fields` (over the defaults), without parsing
    /// or filtering.
    pub fn record(&self, fields: Fields) -> Record {
        Record::from_fields(self, Some(fields))
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<&str> = self.ancestors().map(RecordType::name).collect();
        f.debug_struct("RecordType")
            .field("name", &self.inner.name)
            .field("chain", &chain)
            .finish()
    }
}

/// Handle to the behavior an override replaced.
pub struct Super<'a> {
    parent: Option<&'a RecordType>,
}

impl<'a> Super<'a> {
    fn of(declaring: &'a RecordType) -> Self {
        Self {
            parent: declaring.parent(),
        }
    }

    /// The parent of the declaring type, if any.
    pub fn record_type(&self) -> Option<&'a RecordType> {
        self.parent
    }

    /// The parent's parse behavior.
    pub fn parse(&self, data: Value, options: &SyncOptions) -> Value {
        match self.parent {
            Some(parent) => parent.parse(data, options),
            None => data,
        }
    }

    /// The parent's initialize hook. A no-op at the root.
    pub fn initialize(&self, record: &mut Record) {
        if let Some(parent) = self.parent {
            parent.initialize(record);
        }
    }

    /// The parent's URL resolution.
    pub fn url(&self, record: &Record) -> Result<String> {
        match self.parent {
            Some(parent) => parent.resolve_url(record),
            None => default_url(record),
        }
    }

    /// The parent's implementation of a named method.
    pub fn call(&self, name: &str, record: &Record, args: &[Value]) -> Result<Value> {
        match self.parent {
            Some(parent) => parent.call(name, record, args),
            None => Err(Error::UnknownMethod(name.to_string())),
        }
    }
}

/// Declares a [`RecordType`].
pub struct RecordTypeBuilder {
    name: String,
    parent: Option<RecordType>,
    behavior: Behavior,
    statics: Fields,
    registry: Option<Arc<FilterRegistry>>,
}

impl RecordTypeBuilder {
    fn new(name: String, parent: Option<RecordType>) -> Self {
        Self {
            name,
            parent,
            behavior: Behavior::default(),
            statics: Fields::new(),
            registry: None,
        }
    }

    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.behavior.id_attribute = Some(name.into());
        self
    }

    pub fn url_root(mut self, root: impl Into<Provider<String>>) -> Self {
        self.behavior.url_root = Some(root.into());
        self
    }

    /// URL root computed each time a URL is built.
    pub fn url_root_with(mut self, f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.behavior.url_root = Some(Provider::thunk(f));
        self
    }

    pub fn defaults(mut self, defaults: Fields) -> Self {
        self.behavior.defaults = Some(Provider::Value(defaults));
        self
    }

    /// Defaults computed for every new record.
    pub fn defaults_with(mut self, f: impl Fn() -> Fields + Send + Sync + 'static) -> Self {
        self.behavior.defaults = Some(Provider::thunk(f));
        self
    }

    pub fn read_filters(mut self, filters: FilterMap) -> Self {
        self.behavior.read_filters = Some(filters);
        self
    }

    pub fn write_filters(mut self, filters: FilterMap) -> Self {
        self.behavior.write_filters = Some(filters);
        self
    }

    pub fn validations(mut self, validations: Validations) -> Self {
        self.behavior.validations = Some(validations);
        self
    }

    pub fn messages(mut self, messages: Messages) -> Self {
        self.behavior.messages = Some(messages);
        self
    }

    pub fn filter_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.behavior.client = Some(client);
        self
    }

    pub fn parse(
        mut self,
        f: impl Fn(&Super<'_>, Value, &SyncOptions) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.behavior.parse = Some(Arc::new(f));
        self
    }

    pub fn url(
        mut self,
        f: impl Fn(&Super<'_>, &Record) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.behavior.url = Some(Arc::new(f));
        self
    }

    /// Adjust each new record after defaults and properties are merged.
    /// Changes made here are part of the first snapshot.
    pub fn initialize(
        mut self,
        f: impl Fn(&Super<'_>, &mut Record) + Send + Sync + 'static,
    ) -> Self {
        self.behavior.initialize = Some(Arc::new(f));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Super<'_>, &Record, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.behavior.methods.insert(name.into(), Arc::new(f));
        self
    }

    /// Declare a validator usable as a rule name in validations.
    pub fn validator(
        mut self,
        rule: impl Into<String>,
        f: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.behavior.validators.insert(rule.into(), Arc::new(f));
        self
    }

    /// A type-level field, kept apart from instance fields.
    pub fn static_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> RecordType {
        let registry = self
            .registry
            .or_else(|| self.parent.as_ref().map(|p| Arc::clone(&p.inner.registry)))
            .unwrap_or_else(|| Arc::new(FilterRegistry::new()));
        RecordType {
            inner: Arc::new(Inner {
                name: self.name,
                parent: self.parent,
                behavior: self.behavior,
                statics: self.statics,
                registry,
            }),
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

    #[test]
    fn settings_fall_through_to_parent() {
        let base = RecordType::builder("Base")
            .url_root("/base")
            .id_attribute("key")
            .build();
        let child = base.extend("Child").url_root("/child").build();

        assert_eq!(child.url_root().as_deref(), Some("/child"));
        assert_eq!(child.id_attribute(), "key");
        assert_eq!(base.url_root().as_deref(), Some("/base"));
        assert_eq!(RecordType::builder("Plain").build().id_attribute(), "id");
    }

    #[test]
    fn is_a_follows_the_chain() {
        let base = RecordType::builder("Base").build();
        let a = base.extend("A").build();
        let b = base.extend("B").build();
        let a2 = a.extend("A2").build();

        assert!(a2.is_a(&a));
        assert!(a2.is_a(&base));
        assert!(!a2.is_a(&b));
        assert!(!a.is_a(&a2));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn identically_declared_types_are_distinct() {
        let one = RecordType::builder("Same").build();
        let two = RecordType::builder("Same").build();
        assert_ne!(one, two);
    }

    #[test]
    fn methods_override_and_delegate() {
        let base = RecordType::builder("Person")
            .method("greeting", |_, record, _| {
                Ok(json!(format!("Hello {}", record.get("name").and_then(Value::as_str).unwrap_or(""))))
            })
            .method("kind", |_, _, _| Ok(json!("person")))
            .build();
        let middle = base.extend("Employee").build();
        let leaf = middle
            .extend("Manager")
            .method("greeting", |sup, record, args| {
                let inner = sup.call("greeting", record, args)?;
                Ok(json!(format!("{}, boss", inner.as_str().unwrap_or(""))))
            })
            .build();

        let record = leaf.record(fields(json!({"name": "Ann"})));
        assert_eq!(record.call("greeting", &[]).unwrap(), json!("Hello Ann, boss"));
        assert_eq!(record.call("kind", &[]).unwrap(), json!("person"));
        assert!(matches!(
            record.call("fire", &[]),
            Err(Error::UnknownMethod(m)) if m == "fire"
        ));

        let plain = middle.record(fields(json!({"name": "Bo"})));
        assert_eq!(plain.call("greeting", &[]).unwrap(), json!("Hello Bo"));
    }

    #[test]
    fn parse_hook_can_delegate() {
        let base = RecordType::builder("Envelope")
            .parse(|_, data, _| data.get("data").cloned().unwrap_or(data))
            .build();
        let child = base
            .extend("Counted")
            .parse(|sup, data, options| {
                let mut parsed = sup.parse(data, options);
                if let Some(obj) = parsed.as_object_mut() {
                    obj.insert("parsed".into(), json!(true));
                }
                parsed
            })
            .build();

        let parsed = child.parse(json!({"data": {"id": 1}}), &SyncOptions::default());
        assert_eq!(parsed, json!({"id": 1, "parsed": true}));
        assert_eq!(
            RecordType::builder("Raw").build().parse(json!([1]), &SyncOptions::default()),
            json!([1])
        );
    }

    #[test]
    fn statics_inherit_and_override() {
        let base = RecordType::builder("Base")
            .static_field("version", 1)
            .static_field("plural", "bases")
            .build();
        let child = base.extend("Child").static_field("plural", "children").build();

        assert_eq!(child.static_field("version"), Some(&json!(1)));
        assert_eq!(child.static_field("plural"), Some(&json!("children")));
        assert_eq!(base.static_field("plural"), Some(&json!("bases")));
        assert_eq!(child.statics(), fields(json!({"version": 1, "plural": "children"})));

        // Type-level fields never leak into instances.
        assert!(child.new_record().fields().is_empty());
    }

    #[test]
    fn defaults_thunk_runs_per_record() {
        let ty = RecordType::builder("Stamped")
            .defaults_with(|| fields(json!({"tags": []})))
            .build();
        let mut one = ty.new_record();
        one.fields_mut()
            .get_mut("tags")
            .and_then(Value::as_array_mut)
            .unwrap()
            .push(json!("x"));
        let two = ty.new_record();

        assert_eq!(two.get("tags"), Some(&json!([])));
    }

    #[test]
    fn validators_resolve_through_chain() {
        let base = RecordType::builder("Base")
            .validator("even", |v, _| v.as_i64().map(|n| n % 2 == 0).unwrap_or(false))
            .build();
        let child = base.extend("Child").build();

        let even = child.validator("even").unwrap();
        assert!(even(&json!(2), &json!(true)));
        assert!(child.validator("odd").is_none());
    }

    #[test]
    fn initialize_runs_before_first_snapshot() {
        let base = RecordType::builder("Base")
            .initialize(|_, record| {
                if record.get("status").is_none() {
                    record.set("status", "draft");
                }
            })
            .build();
        let child = base
            .extend("Child")
            .initialize(|sup, record| {
                sup.initialize(record);
                let status = record.get("status").cloned().unwrap_or(Value::Null);
                record.set("label", format!("child:{}", status.as_str().unwrap_or("")));
            })
            .build();

        let record = base.new_record();
        assert_eq!(record.get("status"), Some(&json!("draft")));
        assert!(!record.has_changed());

        let record = child.record(fields(json!({"status": "live"})));
        assert_eq!(record.get("label"), Some(&json!("child:live")));
        assert!(record.changed_attributes().is_empty());
        assert_eq!(record.previous("label"), Some(&json!("child:live")));
    }

    #[test]
    fn child_registry_replaces_parent_registry() {
        let base = RecordType::builder("Base").build();
        let child = base
            .extend("Child")
            .filter_registry(FilterRegistry::empty())
            .build();

        assert!(base.filter_registry().contains("suffix"));
        assert!(!child.filter_registry().contains("suffix"));
    }
}
