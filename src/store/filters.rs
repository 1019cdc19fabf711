//! Filter helpers for chunk store queries.

use serde_json::{Value, json};

/// Compose the Qdrant filter restricting a search to one topic.
///
/// Returns `None` for an absent or blank topic so the query body stays minimal.
pub fn build_topic_filter(topic_id: Option<&str>) -> Option<Value> {
    let topic = topic_id.map(str::trim).filter(|value| !value.is_empty())?;
    Some(json!({
        "must": [
            {
                "key": "topic_id",
                "match": { "value": topic }
            }
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_topic_filter_matches_topic() {
        let filter = build_topic_filter(Some("topic-7")).expect("filter");
        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "topic_id",
                        "match": { "value": "topic-7" }
                    }
                ]
            })
        );
    }

    #[test]
    fn build_topic_filter_ignores_absent_or_blank_topics() {
        assert!(build_topic_filter(None).is_none());
        assert!(build_topic_filter(Some("   ")).is_none());
    }
}
