use contractor_core::{ContractorChange, EventType};

use crate::CodecError;

/// JSON codec for outbox payloads.
///
/// `decode(encode(x)) == x` holds for every [`ContractorChange`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec;

impl EventCodec {
    pub fn encode(&self, change: &ContractorChange) -> Result<String, CodecError> {
        serde_json::to_string(change).map_err(CodecError::Encode)
    }

    pub fn decode(&self, payload: &str) -> Result<ContractorChange, CodecError> {
        serde_json::from_str(payload).map_err(CodecError::Decode)
    }

    /// Checks that a stored payload still parses as the schema its event
    /// type names.
    pub fn verify(&self, event_type: EventType, payload: &str) -> Result<(), CodecError> {
        match event_type {
            EventType::ContractorUpdated => self.decode(payload).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn change(inn: Option<&str>) -> ContractorChange {
        ContractorChange {
            id: "CTR001".to_string(),
            name: "НКО АО НРД".to_string(),
            inn: inn.map(str::to_string),
            modify_date_time: Utc
                .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
                .unwrap()
                .checked_add_signed(chrono::Duration::nanoseconds(123_456_789))
                .unwrap(),
        }
    }

    #[test]
    fn decode_reverses_encode() {
        let codec = EventCodec;
        for original in [change(Some("7702165310")), change(None)] {
            let payload = codec.encode(&original).unwrap();
            assert_eq!(codec.decode(&payload).unwrap(), original);
        }
    }

    #[test]
    fn decode_accepts_payloads_from_other_producers() {
        let payload =
            r#"{"id":"CTR002","name":"Beta","inn":null,"modifyDateTime":"2024-01-02T03:04:05Z"}"#;

        let decoded = EventCodec.decode(payload).unwrap();
        assert_eq!(decoded.id, "CTR002");
        assert_eq!(decoded.inn, None);
        assert_eq!(
            decoded.modify_date_time,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn verify_rejects_payload_missing_fields() {
        let err = EventCodec
            .verify(EventType::ContractorUpdated, r#"{"id":"CTR003"}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));

        assert!(
            EventCodec
                .verify(EventType::ContractorUpdated, "not json")
                .is_err()
        );
    }
}
