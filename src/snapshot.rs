//! Snapshot values exchanged with the host application
//!
//! A snapshot is whatever JSON document the application hands us. The bridge
//! never looks inside it; it only moves it between the app and the slot.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Opaque application state, stored as compact JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Value);

impl Snapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a snapshot from any serializable state
    pub fn from_state<T: Serialize>(state: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(state)?))
    }

    /// Decode stored text into a snapshot
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self)
    }

    /// Encode as the compact text written to storage
    pub fn to_text(&self) -> String {
        // Serializing a `Value` to a String cannot fail: map keys are always strings.
        self.0.to_string()
    }

    /// Typed view of the snapshot, for apps that know their own shape
    pub fn to_state<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.0)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the application receives at init: the saved snapshot, or `None` on first run.
pub type InitialFlags = Option<Snapshot>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    #[test]
    fn test_text_is_compact() {
        let snapshot = Snapshot::new(json!({ "count": 4 }));
        assert_eq!(snapshot.to_text(), r#"{"count":4}"#);
    }

    #[test]
    fn test_malformed_text_rejected() {
        assert!(Snapshot::from_text("{not json").is_err());
        assert!(Snapshot::from_text("").is_err());
    }

    #[test]
    fn test_null_is_a_valid_snapshot() {
        // An app may legitimately save `null`; that is distinct from an empty slot.
        let snapshot = Snapshot::from_text("null").unwrap();
        assert_eq!(snapshot.as_value(), &Value::Null);
    }

    #[test]
    fn test_typed_view() {
        let snapshot = Snapshot::from_state(&Counter { count: 3 }).unwrap();
        assert_eq!(snapshot.as_value(), &json!({ "count": 3 }));
        assert_eq!(snapshot.to_state::<Counter>().unwrap(), Counter { count: 3 });
        assert!(matches!(
            snapshot.to_state::<Vec<u8>>(),
            Err(BridgeError::Encode(_))
        ));
    }

    #[test]
    fn test_unrepresentable_state_is_encode_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let state: HashMap<Vec<u8>, u32> = HashMap::from([(vec![1], 1)]);
        assert!(matches!(
            Snapshot::from_state(&state),
            Err(BridgeError::Encode(_))
        ));
    }

    #[test]
    fn test_float_text_round_trip_is_exact() {
        let value = 0.092_008_497_187_473_71_f64;
        let snapshot = Snapshot::new(json!({ "x": value }));
        let decoded = Snapshot::from_text(&snapshot.to_text()).unwrap();
        assert_eq!(decoded.as_value()["x"].as_f64(), Some(value));
        assert_eq!(decoded, snapshot);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            any::<f64>()
                .prop_filter("JSON has no NaN or infinity", |f| f.is_finite())
                .prop_map(Value::from),
            "[a-z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_text_round_trip(value in arb_json()) {
            let snapshot = Snapshot::new(value);
            let decoded = Snapshot::from_text(&snapshot.to_text()).unwrap();
            prop_assert_eq!(decoded, snapshot);
        }
    }
}
