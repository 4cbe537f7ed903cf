use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::meta::{Confidence, ConfidenceLevel, ResponseEnvelope, ResponseMeta, UNKNOWN_METHOD};

/// The response shapes emitted by the different API generations.
///
/// New legacy shapes get a new variant here rather than another branch in
/// the callers.
#[derive(Debug, Clone, PartialEq)]
pub enum WirePayload {
    /// Current generation: an object carrying both `data` and `meta`.
    Enveloped { data: Value, meta: Value },
    /// Legacy generation: a bare object, possibly with top-level hints
    /// (`confidence`, `method`, `calculation_trace_id`, ...).
    Bare(Map<String, Value>),
    /// Legacy generation: a bare array or scalar with nothing to mine.
    Opaque(Value),
}

/// Confidence as legacy servers sent it: either the full object or just
/// the level string.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ConfidenceHint {
    Detailed(Confidence),
    Level(ConfidenceLevel),
}

impl From<ConfidenceHint> for Confidence {
    fn from(hint: ConfidenceHint) -> Self {
        match hint {
            ConfidenceHint::Detailed(confidence) => confidence,
            ConfidenceHint::Level(level) => level.into(),
        }
    }
}

pub fn is_enveloped(payload: &Value) -> bool {
    payload
        .as_object()
        .map(|map| map.contains_key("data") && map.contains_key("meta"))
        .unwrap_or(false)
}

impl WirePayload {
    pub fn parse(payload: Value) -> Self {
        match payload {
            Value::Object(mut map) if map.contains_key("data") && map.contains_key("meta") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                let meta = map.remove("meta").unwrap_or(Value::Null);
                WirePayload::Enveloped { data, meta }
            }
            Value::Object(map) => WirePayload::Bare(map),
            other => WirePayload::Opaque(other),
        }
    }

    pub fn into_envelope(self) -> ResponseEnvelope<Value> {
        match self {
            WirePayload::Enveloped { data, meta } => {
                let meta = match meta {
                    Value::Object(fields) => meta_from_fields(&fields),
                    other => {
                        debug!(meta = %other, "Envelope meta is not an object, using sentinels");
                        ResponseMeta::default()
                    }
                };
                ResponseEnvelope { data, meta }
            }
            WirePayload::Bare(fields) => {
                let meta = meta_from_fields(&fields);
                ResponseEnvelope {
                    data: Value::Object(fields),
                    meta,
                }
            }
            WirePayload::Opaque(data) => ResponseEnvelope {
                data,
                meta: ResponseMeta::default(),
            },
        }
    }
}

/// Decode one optional field, ignoring it when absent or malformed.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(field = key, error = %e, "Ignoring malformed meta field");
            None
        }
    }
}

/// Best-effort meta from a map of fields. Each field is read on its own so
/// one malformed hint does not discard the others.
fn meta_from_fields(fields: &Map<String, Value>) -> ResponseMeta {
    ResponseMeta {
        confidence: field::<ConfidenceHint>(fields, "confidence")
            .map(Confidence::from)
            .unwrap_or_default(),
        method: field::<String>(fields, "method")
            .filter(|method| !method.is_empty())
            .unwrap_or_else(|| UNKNOWN_METHOD.to_string()),
        provenance: field(fields, "provenance").unwrap_or_default(),
        uncertainty: field(fields, "uncertainty").unwrap_or_default(),
        trace_id: field::<String>(fields, "calculation_trace_id")
            .or_else(|| field(fields, "trace_id")),
        policy: field(fields, "policy").unwrap_or_default(),
    }
}

/// Normalize any payload into an envelope over raw JSON data.
pub fn normalize(payload: Value) -> ResponseEnvelope<Value> {
    WirePayload::parse(payload).into_envelope()
}

/// Normalize and decode `data` into `T`.
pub fn normalize_into<T: DeserializeOwned>(
    payload: Value,
) -> Result<ResponseEnvelope<T>, serde_json::Error> {
    let envelope = normalize(payload);
    let data = serde_json::from_value(envelope.data)?;
    Ok(ResponseEnvelope {
        data,
        meta: envelope.meta,
    })
}

/// JSON-level normalization: an already enveloped payload comes back
/// exactly as received, anything else is wrapped with synthesized meta.
pub fn normalize_value(payload: Value) -> Result<Value, serde_json::Error> {
    if is_enveloped(&payload) {
        return Ok(payload);
    }
    serde_json::to_value(normalize(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{BoundaryRisk, Policy};
    use serde_json::json;

    #[test]
    fn test_bare_payload_is_wrapped_with_unknown_meta() {
        let payload = json!({
            "festivals": [{"id": "dashain"}, {"id": "tihar"}, {"id": "holi"}],
            "total": 3
        });

        let envelope = normalize(payload.clone());

        assert_eq!(envelope.data, payload);
        assert_eq!(envelope.meta.confidence.level, ConfidenceLevel::Unknown);
        assert_eq!(envelope.meta.confidence.score, 0.5);
        assert_eq!(envelope.meta.method, "unknown");
        assert_eq!(envelope.meta.trace_id, None);
        assert_eq!(envelope.meta.policy, Policy::default());
        assert_eq!(envelope.meta.uncertainty.boundary_risk, BoundaryRisk::Unknown);
        assert!(envelope.meta.is_unknown());
    }

    #[test]
    fn test_enveloped_payload_passes_through_unchanged() {
        let payload = json!({"data": {"x": 1}, "meta": {"confidence": {"level": "computed"}}});

        assert_eq!(normalize_value(payload.clone()).unwrap(), payload);

        let envelope = normalize(payload);
        assert_eq!(envelope.data, json!({"x": 1}));
        assert_eq!(envelope.meta.confidence.level, ConfidenceLevel::Computed);
    }

    #[test]
    fn test_legacy_hints_feed_meta() {
        let payload = json!({
            "tithi": "Purnima",
            "confidence": {"level": "official", "score": 0.98},
            "method": "ephemeris",
            "calculation_trace_id": "tr_123",
            "trace_id": "ignored"
        });

        let envelope = normalize(payload);

        assert_eq!(envelope.meta.confidence.level, ConfidenceLevel::Official);
        assert_eq!(envelope.meta.confidence.score, 0.98);
        assert_eq!(envelope.meta.method, "ephemeris");
        assert_eq!(envelope.meta.trace_id.as_deref(), Some("tr_123"));
        assert_eq!(envelope.data["tithi"], "Purnima");
    }

    #[test]
    fn test_trace_id_used_when_calculation_trace_absent() {
        let envelope = normalize(json!({"trace_id": "tr_9"}));
        assert_eq!(envelope.meta.trace_id.as_deref(), Some("tr_9"));
    }

    #[test]
    fn test_bare_confidence_string_is_accepted() {
        let envelope = normalize(json!({"confidence": "computed", "method": ""}));
        assert_eq!(envelope.meta.confidence.level, ConfidenceLevel::Computed);
        assert_eq!(envelope.meta.confidence.score, 0.5);
        assert_eq!(envelope.meta.method, "unknown");
    }

    #[test]
    fn test_malformed_hint_does_not_discard_others() {
        let envelope = normalize(json!({"method": 42, "calculation_trace_id": "tr_1"}));
        assert_eq!(envelope.meta.method, "unknown");
        assert_eq!(envelope.meta.trace_id.as_deref(), Some("tr_1"));
    }

    #[test]
    fn test_array_payload_gets_default_meta() {
        let envelope = normalize(json!([1, 2, 3]));
        assert_eq!(envelope.data, json!([1, 2, 3]));
        assert_eq!(envelope.meta, ResponseMeta::default());
    }

    #[test]
    fn test_parse_selects_variant() {
        assert!(matches!(
            WirePayload::parse(json!({"data": 1, "meta": {}})),
            WirePayload::Enveloped { .. }
        ));
        // data alone is still a legacy payload
        assert!(matches!(
            WirePayload::parse(json!({"data": 1})),
            WirePayload::Bare(_)
        ));
        assert!(matches!(WirePayload::parse(json!("text")), WirePayload::Opaque(_)));
    }

    #[test]
    fn test_normalize_into_decodes_typed_data() {
        #[derive(serde::Deserialize)]
        struct Upcoming {
            total: u32,
        }

        let envelope: ResponseEnvelope<Upcoming> =
            normalize_into(json!({"total": 3, "method": "rules"})).unwrap();
        assert_eq!(envelope.data.total, 3);
        assert_eq!(envelope.meta.method, "rules");
    }

    #[test]
    fn test_wrapped_value_round_trips_to_envelope_shape() {
        let wrapped = normalize_value(json!({"total": 3})).unwrap();
        assert!(is_enveloped(&wrapped));
        assert_eq!(wrapped["meta"]["policy"]["profile"], "np-mainstream");
        assert_eq!(wrapped["data"], json!({"total": 3}));
    }
}
