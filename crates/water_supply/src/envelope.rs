//! The backend answers either with the bare payload or wrapped as
//! `{"status": ..., "data": ...}`. Everything is unwrapped here, once, so
//! the rest of the crate only sees canonical values.

use model::Resource;
use serde::Deserialize;
use serde_json::Value;

use crate::{RequestError, RequestResult};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    Bare(Vec<Value>),
    Envelope { data: Vec<Value> },
}

impl ListResponse {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Envelope { data } => data,
        }
    }
}

/// Turns an `{"status": "error"}` payload into an error.
pub fn reject_error(value: Value) -> RequestResult<Value> {
    let is_error = value
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("error"));
    if !is_error {
        return Ok(value);
    }
    let message = value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_owned();
    Err(RequestError::Api { message })
}

/// Decodes a collection. Records that do not decode are logged and skipped
/// so one bad row does not empty the whole collection.
pub fn decode_list<T: Resource>(value: Value) -> RequestResult<Vec<T>> {
    let value = reject_error(value)?;
    let response: ListResponse = serde_json::from_value(value).map_err(|_| {
        RequestError::Shape(format!("{} is neither an array nor an envelope", T::NAME))
    })?;
    let items = response
        .into_items()
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(record) => Some(record),
            Err(why) => {
                log::warn!("Skipping undecodable record in {}: {}", T::NAME, why);
                None
            }
        })
        .collect();
    Ok(items)
}

/// The object echoed by a write, unwrapped from its envelope. `Null` when
/// the backend sent nothing useful back.
pub fn unwrap_item(value: Value) -> RequestResult<Value> {
    let mut value = reject_error(value)?;
    if let Some(data) = value.get_mut("data").filter(|data| data.is_object()) {
        return Ok(data.take());
    }
    Ok(value)
}

/// Overlays the fields of `patch` onto `base`. Non-object patches are
/// ignored.
pub fn merge(base: &mut Value, patch: &Value) {
    if let (Some(base), Some(patch)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use model::bowser::Bowser;
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_and_enveloped_lists_decode_alike() {
        let rows = json!([
            {"id": "BWR001", "capacity": 5000, "current_level": 2500},
            {"id": "BWR002", "capacity": 7500, "current_level": 7000}
        ]);
        let bare: Vec<Bowser> = decode_list(rows.clone()).unwrap();
        let wrapped: Vec<Bowser> =
            decode_list(json!({"status": "success", "data": rows})).unwrap();
        assert_eq!(bare.len(), 2);
        assert_eq!(
            bare.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            wrapped.iter().map(|b| b.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn error_envelope_is_an_error() {
        let result = decode_list::<Bowser>(json!({"status": "error", "message": "db down"}));
        match result {
            Err(RequestError::Api { message }) => assert_eq!(message, "db down"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_shapes_are_rejected() {
        assert!(matches!(
            decode_list::<Bowser>(json!({"rows": []})),
            Err(RequestError::Shape(_))
        ));
        assert!(matches!(
            decode_list::<Bowser>(json!("nope")),
            Err(RequestError::Shape(_))
        ));
    }

    #[test]
    fn bad_records_are_skipped() {
        let bowsers: Vec<Bowser> = decode_list(json!([
            {"id": "BWR001", "capacity": "lots"},
            {"id": "BWR002", "capacity": 7500, "current_level": 7000}
        ]))
        .unwrap();
        assert_eq!(bowsers.len(), 1);
        assert_eq!(bowsers[0].id.as_str(), "BWR002");
    }

    #[test]
    fn items_are_unwrapped() {
        assert_eq!(
            unwrap_item(json!({"status": "success", "data": {"id": "X"}})).unwrap(),
            json!({"id": "X"})
        );
        assert_eq!(unwrap_item(json!({"id": "X"})).unwrap(), json!({"id": "X"}));
        assert!(unwrap_item(json!({"status": "error", "error": "nope"})).is_err());
    }
}
