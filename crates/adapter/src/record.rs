//! Records and the demultiplexing of batched responses.
//!
//! A find-many response carries every record of a group under the resource's
//! collection key:
//!
//! ```json
//! { "testRecords": [ { "id": 1 }, { "id": 2 } ] }
//! ```

use std::collections::HashMap;

use derive_getters::Getters;
use recordstore_types::{Identifier, ResourceName};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{AdapterError, AdapterResult};

/// A single record payload returned by the server.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Record {
    id: Identifier,
    payload: Value,
}

impl Record {
    pub fn new(id: Identifier, payload: Value) -> Self {
        Self { id, payload }
    }

    /// Look up one attribute of the payload
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Records of one group response, indexed by id.
#[derive(Debug, Clone)]
pub struct BatchResponse {
    resource: ResourceName,
    records: HashMap<Identifier, Record>,
}

impl BatchResponse {
    /// Split a find-many payload into records.
    ///
    /// Records are read from the resource's collection key, falling back to
    /// the singular resource name. Anything else is a malformed response and
    /// fails the whole group.
    pub fn from_payload(resource: &ResourceName, payload: Value) -> AdapterResult<Self> {
        trace!("Demultiplexing {} payload: {:#?}", resource, payload);

        let mut object = match payload {
            Value::Object(object) => object,
            other => {
                return Err(AdapterError::MalformedResponse(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let plural = resource.path_for_type();
        let entries = object
            .remove(&plural)
            .or_else(|| object.remove(resource.as_str()))
            .ok_or_else(|| {
                AdapterError::MalformedResponse(format!(
                    "response has no '{}' key (found: {:?})",
                    plural,
                    object.keys().collect::<Vec<_>>()
                ))
            })?;

        let entries = match entries {
            Value::Array(entries) => entries,
            // A lone record is accepted as a one-element batch
            single @ Value::Object(_) => vec![single],
            other => {
                return Err(AdapterError::MalformedResponse(format!(
                    "'{}' should hold an array of records, got {}",
                    plural,
                    json_kind(&other)
                )))
            }
        };

        let mut records = HashMap::with_capacity(entries.len());
        for entry in entries {
            let id = entry
                .get("id")
                .cloned()
                .and_then(|id| serde_json::from_value::<Identifier>(id).ok())
                .ok_or_else(|| {
                    AdapterError::MalformedResponse(format!(
                        "record in '{}' has no usable id: {}",
                        plural, entry
                    ))
                })?;

            records.insert(id.clone(), Record::new(id, entry));
        }

        debug!("Response for {} contained {} record(s)", resource, records.len());

        Ok(Self {
            resource: resource.clone(),
            records,
        })
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &Identifier) -> Option<&Record> {
        self.records.get(id)
    }

    /// Take the record for `id`, or fail with [`AdapterError::MissingRecord`].
    pub fn take(&mut self, id: &Identifier) -> AdapterResult<Record> {
        self.records
            .remove(id)
            .ok_or_else(|| AdapterError::missing_record(&self.resource, id))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource() -> ResourceName {
        ResourceName::new("testRecord").unwrap()
    }

    #[test]
    fn test_numeric_and_string_ids() {
        let payload = json!({ "testRecords": [ { "id": 1 }, { "id": "my-id:2", "name": "two" } ] });
        let mut response = BatchResponse::from_payload(&resource(), payload).unwrap();

        assert_eq!(response.len(), 2);
        let one = response.take(&Identifier::from("1")).unwrap();
        assert_eq!(one.id(), &Identifier::from(1));

        let two = response.take(&"my-id:2".into()).unwrap();
        assert_eq!(two.attribute("name"), Some(&json!("two")));
    }

    #[test]
    fn test_missing_record() {
        let payload = json!({ "testRecords": [ { "id": 1 } ] });
        let mut response = BatchResponse::from_payload(&resource(), payload).unwrap();

        assert_eq!(
            response.take(&Identifier::from(2)),
            Err(AdapterError::MissingRecord {
                resource: "testRecord".to_string(),
                id: "2".to_string(),
            })
        );
    }

    #[test]
    fn test_singular_key_fallback() {
        let payload = json!({ "testRecord": { "id": 7 } });
        let response = BatchResponse::from_payload(&resource(), payload).unwrap();
        assert!(response.get(&Identifier::from(7)).is_some());
    }

    #[test]
    fn test_malformed_payloads() {
        let cases = [
            json!([ { "id": 1 } ]),
            json!({ "others": [] }),
            json!({ "testRecords": "nope" }),
            json!({ "testRecords": [ { "name": "no id" } ] }),
            json!({ "testRecords": [ { "id": null } ] }),
        ];

        for payload in cases {
            let result = BatchResponse::from_payload(&resource(), payload.clone());
            assert!(
                matches!(result, Err(AdapterError::MalformedResponse(_))),
                "payload {} should be rejected",
                payload
            );
        }
    }
}
