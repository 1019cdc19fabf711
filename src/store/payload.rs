//! Helpers for constructing and decoding chunk payloads.

use crate::store::types::{CHUNK_SCHEMA_VERSION, NewChunk, ScoredChunk, StoredChunk};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_chunk_payload(chunk: &NewChunk, ingested_at: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("doc_id".into(), Value::String(chunk.doc_id.clone()));
    if let Some(topic_id) = chunk
        .topic_id
        .as_ref()
        .filter(|value| !value.trim().is_empty())
    {
        payload.insert("topic_id".into(), Value::String(topic_id.clone()));
    }
    payload.insert("page_no".into(), Value::from(chunk.page_no as u64));
    payload.insert("para_no".into(), Value::from(chunk.para_no as u64));
    payload.insert("text".into(), Value::String(chunk.text.clone()));
    payload.insert("schema_version".into(), Value::from(CHUNK_SCHEMA_VERSION));
    payload.insert(
        "ingested_at".into(),
        Value::String(ingested_at.to_string()),
    );
    Value::Object(payload)
}

/// Decode a scored point payload back into a chunk record.
///
/// Points missing the mandatory `doc_id` or `text` fields are dropped with a warning;
/// a malformed neighbor should not sink the whole result set.
pub(crate) fn parse_scored_chunk(
    id: String,
    score: f32,
    payload: Option<Map<String, Value>>,
) -> Option<ScoredChunk> {
    let mut map = payload?;

    let doc_id = match map.remove("doc_id") {
        Some(Value::String(value)) if !value.trim().is_empty() => value,
        _ => {
            tracing::warn!(point = %id, "Dropping search hit without doc_id");
            return None;
        }
    };
    let text = match map.remove("text") {
        Some(Value::String(value)) => value,
        _ => {
            tracing::warn!(point = %id, "Dropping search hit without text");
            return None;
        }
    };

    let topic_id = match map.remove("topic_id") {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value),
        _ => None,
    };
    let page_no = read_index(&map, "page_no");
    let para_no = read_index(&map, "para_no");

    Some(ScoredChunk {
        chunk: StoredChunk {
            id,
            doc_id,
            topic_id,
            page_no,
            para_no,
            text,
        },
        score,
    })
}

fn read_index(map: &Map<String, Value>, key: &str) -> usize {
    map.get(key)
        .and_then(Value::as_u64)
        .map(|value| value as usize)
        .unwrap_or(0)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier for a newly stored chunk.
pub(crate) fn generate_chunk_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> NewChunk {
        NewChunk {
            doc_id: "paper.pdf".into(),
            topic_id: None,
            page_no: 2,
            para_no: 1,
            text: "sample".into(),
            embedding: vec![0.1, 0.2],
        }
    }

    #[test]
    fn payload_includes_chunk_fields_and_version() {
        let payload = build_chunk_payload(&sample_chunk(), "2025-01-01T00:00:00Z");
        assert_eq!(payload["doc_id"], "paper.pdf");
        assert_eq!(payload["page_no"], 2);
        assert_eq!(payload["para_no"], 1);
        assert_eq!(payload["text"], "sample");
        assert_eq!(payload["schema_version"], CHUNK_SCHEMA_VERSION);
        assert_eq!(payload["ingested_at"], "2025-01-01T00:00:00Z");
        assert!(payload.get("topic_id").is_none());
    }

    #[test]
    fn payload_carries_topic_when_assigned() {
        let mut chunk = sample_chunk();
        chunk.topic_id = Some("topic-7".into());
        let payload = build_chunk_payload(&chunk, "2025-01-01T00:00:00Z");
        assert_eq!(payload["topic_id"], "topic-7");
    }

    #[test]
    fn parse_scored_chunk_round_trips_payload() {
        let mut chunk = sample_chunk();
        chunk.topic_id = Some("topic-7".into());
        let payload = build_chunk_payload(&chunk, "2025-01-01T00:00:00Z");
        let Value::Object(map) = payload else {
            panic!("payload should be an object");
        };

        let scored = parse_scored_chunk("point-1".into(), 0.9, Some(map)).expect("chunk");
        assert_eq!(scored.chunk.id, "point-1");
        assert_eq!(scored.chunk.doc_id, "paper.pdf");
        assert_eq!(scored.chunk.topic_id.as_deref(), Some("topic-7"));
        assert_eq!(scored.chunk.page_no, 2);
        assert_eq!(scored.chunk.para_no, 1);
        assert_eq!(scored.chunk.text, "sample");
        assert!((scored.score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_scored_chunk_drops_points_without_doc_id() {
        let mut map = Map::new();
        map.insert("text".into(), Value::String("orphan".into()));
        assert!(parse_scored_chunk("point-2".into(), 0.5, Some(map)).is_none());
        assert!(parse_scored_chunk("point-3".into(), 0.5, None).is_none());
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }
}
