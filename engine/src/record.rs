//! Record instances and their lifecycle.
//!
//! A [`Record`] is one live object bound to one remote resource. It is
//! built from its [`RecordType`] (defaults, then the given properties),
//! mutated freely by the application, and synchronized through
//! [`Record::fetch`], [`Record::save`] and [`Record::destroy`]. Every
//! successful fetch or save merges the server's answer back and moves the
//! change-tracking baseline.

use crate::filter::{apply_filters, FilterMap};
use crate::snapshot::ChangeSnapshot;
use crate::transport::{HttpRequest, HttpResponse};
use crate::validation::{validate_fields, Messages, ValidationErrors};
use crate::{error::Result, Error, Fields, Operation, RecordType, SyncOptions};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Characters left alone when an id is put into a URL, matching
/// JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Options for [`Record::new`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitOptions {
    /// Run the type's parse hook on the properties
    pub parse: bool,
    /// Apply the type's read filters to the properties
    pub read_filters: bool,
    /// Fixed URL for this record, bypassing URL resolution
    pub url: Option<String>,
    /// URL root for this record instead of the type's
    pub url_root: Option<String>,
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self) -> Self {
        self.parse = true;
        self
    }

    pub fn read_filters(mut self) -> Self {
        self.read_filters = true;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url_root(mut self, root: impl Into<String>) -> Self {
        self.url_root = Some(root.into());
        self
    }
}

/// A live record.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: RecordType,
    fields: Fields,
    snapshot: ChangeSnapshot,
    valid: Option<bool>,
    url: Option<String>,
    url_root: Option<String>,
}

impl Record {
    /// Build a record: defaults first, then `properties` (parsed and
    /// read-filtered only if `options` ask for it).
    pub fn new(
        record_type: &RecordType,
        properties: Option<Fields>,
        options: InitOptions,
    ) -> Result<Self> {
        let properties = match properties {
            Some(mut props) => {
                if options.parse {
                    props = match record_type.parse(Value::Object(props), &SyncOptions::default()) {
                        Value::Object(parsed) => parsed,
                        _ => return Err(Error::InvalidResponse),
                    };
                }
                if options.read_filters {
                    if let Some(filters) = record_type.read_filters() {
                        apply_filters(filters, record_type.filter_registry(), &mut props)?;
                    }
                }
                Some(props)
            }
            None => None,
        };

        Ok(Self::assemble(
            record_type,
            properties,
            options.url,
            options.url_root,
        ))
    }

    pub(crate) fn from_fields(record_type: &RecordType, properties: Option<Fields>) -> Self {
        Self::assemble(record_type, properties, None, None)
    }

    /// Defaults, then properties, then the initialize hook, then the first
    /// snapshot.
    fn assemble(
        record_type: &RecordType,
        properties: Option<Fields>,
        url: Option<String>,
        url_root: Option<String>,
    ) -> Self {
        let mut fields = record_type.defaults().unwrap_or_default();
        if let Some(props) = properties {
            fields.extend(props);
        }
        let mut record = Self {
            record_type: record_type.clone(),
            fields,
            snapshot: ChangeSnapshot::default(),
            valid: None,
            url,
            url_root,
        };
        record_type.initialize(&mut record);
        record.snapshot();
        record
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    /// Whether this record's type is `record_type` or extends it.
    pub fn is_a(&self, record_type: &RecordType) -> bool {
        self.record_type.is_a(record_type)
    }

    // ---- fields ----

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Shallow-merge `values` into the fields.
    pub fn merge(&mut self, values: Fields) -> &mut Self {
        self.fields.extend(values);
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// The fields as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// The id value, unless it is missing or `null`.
    pub fn id(&self) -> Option<&Value> {
        self.fields
            .get(self.record_type.id_attribute())
            .filter(|id| !id.is_null())
    }

    /// A record is new until it has an id.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    // ---- change tracking ----

    /// Make the current fields the baseline.
    pub fn snapshot(&mut self) {
        self.snapshot.reset(&self.fields);
    }

    /// Fields changed since the last snapshot, with their current values.
    pub fn changed_attributes(&self) -> Fields {
        self.snapshot.changed_attributes(&self.fields, None)
    }

    /// The part of `candidate` that would be a change.
    pub fn changed_attributes_in(&self, candidate: &Fields) -> Fields {
        self.snapshot.changed_attributes(&self.fields, Some(candidate))
    }

    pub fn has_changed(&self) -> bool {
        self.snapshot.has_changed(&self.fields, None)
    }

    pub fn has_field_changed(&self, field: &str) -> bool {
        self.snapshot.has_changed(&self.fields, Some(field))
    }

    /// Value of `field` at the last snapshot.
    pub fn previous(&self, field: &str) -> Option<&Value> {
        self.snapshot.previous(field)
    }

    pub fn previous_attributes(&self) -> Fields {
        self.snapshot.previous_attributes()
    }

    // ---- validation ----

    /// Run the type's validations and remember the outcome.
    pub fn validate(&mut self) -> ValidationErrors {
        let errors = match self.record_type.validations() {
            Some(validations) => {
                let default_messages = Messages::new();
                let messages = self.record_type.messages().unwrap_or(&default_messages);
                validate_fields(&self.fields, validations, messages, |rule| {
                    self.record_type.validator(rule)
                })
            }
            None => ValidationErrors::new(),
        };
        self.valid = Some(errors.is_empty());
        errors
    }

    /// Outcome of the last [`Record::validate`]. Rules are not re-run; a
    /// record that was never validated counts as valid.
    pub fn is_valid(&self) -> bool {
        self.valid.unwrap_or(true)
    }

    // ---- urls and methods ----

    /// URL used for fetch, save and destroy.
    pub fn url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        self.record_type.resolve_url(self)
    }

    /// Call a named method declared on the type chain.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.record_type.call(method, self, args)
    }

    // ---- synchronization ----

    /// Send one operation through the type's transport.
    ///
    /// The verb comes from `options.verb` or the operation, the URL from
    /// `options.url` or [`Record::url`].
    pub async fn sync(
        &self,
        operation: Operation,
        data: Option<Value>,
        options: &SyncOptions,
    ) -> Result<HttpResponse> {
        let client = self.record_type.client().cloned().ok_or_else(|| {
            Error::Configuration(format!(
                "no HTTP client configured for record type `{}`",
                self.record_type.name()
            ))
        })?;

        let url = match &options.url {
            Some(url) => url.clone(),
            None => self.url()?,
        };
        let request = HttpRequest {
            verb: options.verb.unwrap_or_else(|| operation.verb()),
            url,
            data,
            headers: options.headers.clone(),
            params: options.params.clone(),
            extra: options.extra.clone(),
        };

        tracing::debug!(
            record_type = %self.record_type.name(),
            %operation,
            verb = %request.verb,
            url = %request.url,
            "syncing record"
        );

        Ok(client.send(request).await?)
    }

    /// Reload the record from the backend.
    pub async fn fetch(&mut self, options: SyncOptions) -> Result<&mut Self> {
        let response = self.sync(Operation::Read, None, &options).await?;
        match self.record_type.parse(response.data, &options) {
            Value::Object(data) => {
                self.absorb(data)?;
                Ok(self)
            }
            other => {
                tracing::warn!(
                    record_type = %self.record_type.name(),
                    response = %other,
                    "fetch response is not an object"
                );
                Err(Error::InvalidResponse)
            }
        }
    }

    /// Merge `values` (if any), validate, and create or update the record
    /// on the backend.
    pub async fn save(&mut self, values: Option<Fields>, options: SyncOptions) -> Result<&mut Self> {
        if let Some(values) = values {
            self.merge(values);
        }
        let operation = if self.is_new() {
            Operation::Create
        } else {
            Operation::Update
        };

        let errors = self.validate();
        if !errors.is_empty() {
            tracing::debug!(
                record_type = %self.record_type.name(),
                %errors,
                "save rejected by validation"
            );
            return Err(Error::Validation(errors));
        }

        let mut payload = self.fields.clone();
        if let Some(filters) = self.record_type.write_filters() {
            self.filter(filters, &mut payload)?;
        }

        let response = self
            .sync(operation, Some(Value::Object(payload)), &options)
            .await?;
        match self.record_type.parse(response.data, &options) {
            Value::Object(data) if !data.is_empty() => self.absorb(data)?,
            _ => self.snapshot(),
        }
        Ok(self)
    }

    /// Set a single field, then [`Record::save`].
    pub async fn save_field(
        &mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
        options: SyncOptions,
    ) -> Result<&mut Self> {
        let mut values = Fields::new();
        values.insert(field.into(), value.into());
        self.save(Some(values), options).await
    }

    /// Delete the record on the backend. New records are never sent.
    pub async fn destroy(&self, options: SyncOptions) -> Result<()> {
        if self.is_new() {
            return Ok(());
        }
        self.sync(Operation::Delete, None, &options).await?;
        Ok(())
    }

    /// Read-filter server data, merge it, and take a new snapshot.
    fn absorb(&mut self, mut data: Fields) -> Result<()> {
        if let Some(filters) = self.record_type.read_filters() {
            self.filter(filters, &mut data)?;
        }
        self.fields.extend(data);
        self.snapshot();
        Ok(())
    }

    fn filter(&self, filters: &FilterMap, target: &mut Fields) -> Result<()> {
        apply_filters(filters, self.record_type.filter_registry(), target)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// `root` for new records, `root/<encoded id>` otherwise.
pub(crate) fn default_url(record: &Record) -> Result<String> {
    let root = record
        .url_root
        .clone()
        .or_else(|| record.record_type.url_root())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "specify a url root or a url hook for record type `{}`",
                record.record_type.name()
            ))
        })?;

    let Some(id) = record.id() else {
        return Ok(root);
    };
    let id = match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_segment(n),
        other => other.to_string(),
    };
    let separator = if root.ends_with('/') { "" } else { "/" };
    Ok(format!(
        "{}{}{}",
        root,
        separator,
        utf8_percent_encode(&id, URI_COMPONENT)
    ))
}

/// Whole floats print without a fraction, so `1.0` and `1` name the same
/// resource.
fn number_segment(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", f)
            }
        }
        _ => n.to_string(),
    }
}
