use serde_json::Value;
use tracing::info;

use crate::api::BraintrustApi;
use crate::blob::Blob;
use crate::domain::{DatasetId, DatasetRowEvent};
use crate::error::PackError;
use crate::fetcher::Fetcher;
use crate::identity::derive_row_id;

#[derive(Debug, Clone, Default)]
pub struct UpsertDatasetRow {
    pub input: Blob,
    pub expected: Blob,
    pub metadata: Blob,
    pub id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub enforce_valid_json: bool,
}

impl UpsertDatasetRow {
    pub fn new(input: impl Into<Blob>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Builds the write event, deriving the row id from the canonical input when none is given.
    ///
    /// A blank input is sent as null but hashed as the empty string.
    pub fn to_event(&self, dataset_id: &DatasetId) -> Result<DatasetRowEvent, PackError> {
        let strict = self.enforce_valid_json;
        if strict && self.input.is_empty() {
            return Err(PackError::InvalidInput {
                field: "input".to_string(),
                message: "a value is required".to_string(),
            });
        }
        let input = self.input.canonicalize("input", strict)?;
        let expected = self.expected.canonicalize("expected", strict)?;
        let metadata = self.metadata.canonicalize("metadata", strict)?;
        let id = match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                let hashed = match &self.input {
                    Blob::Text(text) if text.is_empty() => Value::String(String::new()),
                    _ => input.clone(),
                };
                derive_row_id(dataset_id.as_str(), &hashed)?
            }
        };
        Ok(DatasetRowEvent::upsert(
            id,
            input,
            expected,
            metadata,
            self.tags.clone(),
        ))
    }
}

/// Inserts or replaces one dataset row and returns the id the server acknowledged.
pub fn upsert_dataset_row<F: Fetcher>(
    api: &BraintrustApi<F>,
    dataset_id: &DatasetId,
    row: &UpsertDatasetRow,
) -> Result<String, PackError> {
    let event = row.to_event(dataset_id)?;
    let row_ids = api.insert_dataset_events(dataset_id, std::slice::from_ref(&event))?;
    let row_id = row_ids.into_iter().next().ok_or_else(|| {
        PackError::InvalidResponse("insert acknowledged no row ids".to_string())
    })?;
    info!(dataset = %dataset_id, row = %row_id, "upserted dataset row");
    Ok(row_id)
}

pub fn delete_dataset_row<F: Fetcher>(
    api: &BraintrustApi<F>,
    dataset_id: &DatasetId,
    id: &str,
) -> Result<bool, PackError> {
    let event = DatasetRowEvent::delete(id.to_string());
    api.submit_dataset_events(dataset_id, std::slice::from_ref(&event))?;
    info!(dataset = %dataset_id, row = %id, "deleted dataset row");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn ds1() -> DatasetId {
        "ds1".parse().unwrap()
    }

    #[test]
    fn explicit_id_wins() {
        let row = UpsertDatasetRow {
            id: Some("row-7".to_string()),
            ..UpsertDatasetRow::new("{\"x\":1}")
        };
        assert_eq!(row.to_event(&ds1()).unwrap().id, "row-7");
    }

    #[test]
    fn blank_id_is_derived() {
        let row = UpsertDatasetRow {
            id: Some(String::new()),
            ..UpsertDatasetRow::new("{\"x\":1}")
        };
        let event = row.to_event(&ds1()).unwrap();
        assert_eq!(event.id, derive_row_id("ds1", &json!({"x": 1})).unwrap());
    }

    #[test]
    fn caller_id_is_sent_verbatim() {
        let row = UpsertDatasetRow {
            id: Some(" row-7 ".to_string()),
            ..UpsertDatasetRow::new("{\"x\":1}")
        };
        assert_eq!(row.to_event(&ds1()).unwrap().id, " row-7 ");

        let blank = UpsertDatasetRow {
            id: Some("   ".to_string()),
            ..UpsertDatasetRow::new("{\"x\":1}")
        };
        assert_eq!(blank.to_event(&ds1()).unwrap().id, "   ");
    }

    #[test]
    fn empty_input_is_sent_null_and_hashed_as_empty_string() {
        let event = UpsertDatasetRow::new("").to_event(&ds1()).unwrap();
        assert_eq!(event.input, Some(Value::Null));
        assert_eq!(
            event.id,
            derive_row_id("ds1", &Value::String(String::new())).unwrap()
        );
        assert_ne!(event.id, derive_row_id("ds1", &Value::Null).unwrap());
    }

    #[test]
    fn strict_mode_requires_input() {
        let row = UpsertDatasetRow {
            enforce_valid_json: true,
            ..UpsertDatasetRow::new("")
        };
        let err = row.to_event(&ds1()).unwrap_err();
        assert_matches!(err, PackError::InvalidInput { ref field, .. } if field == "input");
    }

    #[test]
    fn float_input_identity_ignores_number_spelling() {
        let spelled = UpsertDatasetRow::new("{\"x\":1.0,\"y\":1e2}")
            .to_event(&ds1())
            .unwrap();
        let plain = UpsertDatasetRow::new("{\"x\":1,\"y\":100}")
            .to_event(&ds1())
            .unwrap();
        assert_eq!(spelled.id, plain.id);
    }

    #[test]
    fn formatting_does_not_change_identity() {
        let compact = UpsertDatasetRow::new("{\"x\":1}").to_event(&ds1()).unwrap();
        let spaced = UpsertDatasetRow::new("{ \"x\" : 1 }\n").to_event(&ds1()).unwrap();
        let structured = UpsertDatasetRow::new(json!({"x": 1}))
            .to_event(&ds1())
            .unwrap();
        assert_eq!(compact.id, spaced.id);
        assert_eq!(compact.id, structured.id);
    }

    #[test]
    fn strict_mode_rejects_malformed_metadata() {
        let row = UpsertDatasetRow {
            metadata: Blob::from("{oops"),
            enforce_valid_json: true,
            ..UpsertDatasetRow::new("{\"x\":1}")
        };
        let err = row.to_event(&ds1()).unwrap_err();
        assert_matches!(err, PackError::InvalidInput { ref field, .. } if field == "metadata");
    }

    #[test]
    fn missing_blobs_are_null() {
        let event = UpsertDatasetRow::new("{\"x\":1}").to_event(&ds1()).unwrap();
        assert_eq!(event.expected, Some(Value::Null));
        assert_eq!(event.metadata, Some(Value::Null));
        assert_eq!(event.tags, None);
    }
}
