//! Bus envelope framing (spec §3 "Envelope", §4.1 bus I/O layer).

use serde::{Deserialize, Serialize};

/// CRUD/notification operation carried on a bus message.
///
/// CREATE/UPDATE/DELETE apply to `*Subscription*` topics; RECEIVE is used on
/// `*Delivery*` topics to carry a plain notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
    Receive,
}

/// The framing wrapped around a payload in `CRUD` mode (spec §4.1).
///
/// In `PAYLOAD` mode the serialised form is the payload alone; callers that
/// need that mode serialise/deserialise `T` directly and never construct an
/// `Envelope`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub op_type: OperationType,
    pub resource_id: String,
    pub resource_data: T,
}

impl<T> Envelope<T> {
    pub fn new(op_type: OperationType, resource_id: impl Into<String>, resource_data: T) -> Self {
        Self {
            op_type,
            resource_id: resource_id.into(),
            resource_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn crud_envelope_round_trips() {
        let envelope = Envelope::new(OperationType::Create, "S1", Payload { value: 42 });
        let serialised = serde_json::to_string(&envelope).expect("serialises");
        let deserialised: Envelope<Payload> =
            serde_json::from_str(&serialised).expect("deserialises");
        assert_eq!(deserialised.op_type, OperationType::Create);
        assert_eq!(deserialised.resource_id, "S1");
        assert_eq!(deserialised.resource_data, Payload { value: 42 });
    }

    #[test]
    fn operation_type_is_uppercase_on_the_wire() {
        let value = json!(OperationType::Delete);
        assert_eq!(value, json!("DELETE"));
    }

    #[test]
    fn payload_only_mode_has_no_wrapper() {
        let payload = Payload { value: 7 };
        let serialised = serde_json::to_string(&payload).expect("serialises");
        assert_eq!(serialised, r#"{"value":7}"#);
    }
}
