//! Loading records in bulk or by id.

use crate::filter::apply_filters;
use crate::{error::Result, Error, Operation, Record, RecordType, SyncOptions};
use serde_json::Value;

impl RecordType {
    /// Load every record at the type's URL root.
    ///
    /// The response must be an array. Each element is read-filtered and
    /// becomes one clean record; data known to come from the backend is
    /// always filtered, regardless of constructor options.
    pub async fn fetch_all(&self, options: SyncOptions) -> Result<Vec<Record>> {
        let scratch = self.new_record();
        let response = scratch.sync(Operation::Read, None, &options).await?;

        let Value::Array(items) = self.parse(response.data, &options) else {
            tracing::warn!(record_type = %self.name(), "collection response is not an array");
            return Err(Error::InvalidCollectionResponse);
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(mut props) = item else {
                return Err(Error::InvalidResponse);
            };
            if let Some(filters) = self.read_filters() {
                apply_filters(filters, self.filter_registry(), &mut props)?;
            }
            records.push(self.record(props));
        }

        tracing::debug!(record_type = %self.name(), count = records.len(), "fetched collection");
        Ok(records)
    }

    /// Load a single record by id.
    pub async fn fetch_one(&self, id: impl Into<Value>, options: SyncOptions) -> Result<Record> {
        let mut record = self.new_record();
        record.set(self.id_attribute().to_string(), id);
        record.fetch(options).await?;
        Ok(record)
    }
}
