//! Payload construction, date normalization, and stable point identity.

use crate::article::EmbeddedArticle;
use serde_json::{Map, Value};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

/// Namespace used to derive stable point identifiers from article links.
///
/// Re-running ingestion for the same link must always address the same point,
/// so identity is a v5 UUID over the natural key rather than a per-run random
/// identifier.
pub const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6ba7b810_9dad_11d1_80b4_00c04fd430c8);

/// Derive the stable point identity for an article.
///
/// The link is the natural key; when it is blank the fallback (title or
/// filename stem) is hashed through the same namespace, keeping the result
/// deterministic either way.
pub fn point_id(link: &str, fallback: &str) -> Uuid {
    let key = if link.trim().is_empty() {
        fallback.trim()
    } else {
        link.trim()
    };
    Uuid::new_v5(&POINT_NAMESPACE, key.as_bytes())
}

/// Build the payload stored alongside an article point.
///
/// The payload is every record field except the embedding, plus a fixed
/// `content_type` marker. The `published` field is re-emitted in canonical
/// `YYYY-MM-DDTHH:MM:SSZ` form, or dropped entirely when unparseable.
pub fn build_payload(record: &EmbeddedArticle) -> Result<Map<String, Value>, serde_json::Error> {
    let mut payload = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.remove("embedding");
    payload.insert("content_type".into(), Value::String("article".into()));

    let normalized = payload
        .get("published")
        .and_then(Value::as_str)
        .and_then(normalize_published);
    match normalized {
        Some(timestamp) => {
            payload.insert("published".into(), Value::String(timestamp));
        }
        None => {
            payload.remove("published");
        }
    }

    Ok(payload)
}

/// Parse a feed timestamp and normalize it to `YYYY-MM-DDTHH:MM:SSZ` UTC.
///
/// Accepts RFC 3339 and RFC 2822 (including the obsolete `GMT`/`UT` zone
/// names feeds still emit). Returns `None` when the value cannot be parsed.
pub fn normalize_published(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = OffsetDateTime::parse(trimmed, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(trimmed, &Rfc2822))
        .or_else(|_| OffsetDateTime::parse(&rewrite_obsolete_zone(trimmed), &Rfc2822))
        .ok()?;

    parsed
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .ok()
}

fn rewrite_obsolete_zone(value: &str) -> String {
    for zone in ["GMT", "UTC", "UT"] {
        if let Some(stripped) = value.strip_suffix(zone) {
            return format!("{stripped}+0000");
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::EnrichedArticle;
    use serde_json::json;

    fn sample_record(published: Option<&str>) -> EmbeddedArticle {
        let article: EnrichedArticle = serde_json::from_value(json!({
            "title": "GraphCast forecasts",
            "link": "https://example.com/graphcast",
            "published": published,
            "source_persona": "persona_ai_builder",
            "tags": ["ai", "weather"],
            "category": "technology_news",
            "enriched_summary": "A model.",
        }))
        .expect("record");
        EmbeddedArticle {
            article,
            embedding: vec![0.1, 0.2, 0.3],
            embedding_input_sha256: "deadbeef".into(),
        }
    }

    #[test]
    fn point_id_is_stable_for_the_same_link() {
        let a = point_id("https://example.com/a", "ignored");
        let b = point_id("https://example.com/a", "other-fallback");
        assert_eq!(a, b);
        assert_ne!(a, point_id("https://example.com/b", "ignored"));
    }

    #[test]
    fn point_id_falls_back_to_title_when_link_is_blank() {
        let from_title = point_id("", "Some headline");
        assert_eq!(from_title, point_id("  ", "Some headline"));
        assert_ne!(from_title, point_id("", "Another headline"));
    }

    #[test]
    fn rfc2822_gmt_date_normalizes_to_canonical_utc() {
        assert_eq!(
            normalize_published("Tue, 13 May 2025 00:00:00 GMT").as_deref(),
            Some("2025-05-13T00:00:00Z")
        );
    }

    #[test]
    fn rfc3339_date_with_offset_converts_to_utc() {
        assert_eq!(
            normalize_published("2025-05-13T02:00:00+02:00").as_deref(),
            Some("2025-05-13T00:00:00Z")
        );
    }

    #[test]
    fn unparseable_date_yields_none() {
        assert!(normalize_published("not-a-date").is_none());
        assert!(normalize_published("").is_none());
    }

    #[test]
    fn payload_excludes_embedding_and_adds_content_type() {
        let payload =
            build_payload(&sample_record(Some("Tue, 13 May 2025 00:00:00 GMT"))).expect("payload");
        assert!(!payload.contains_key("embedding"));
        assert_eq!(payload["content_type"], "article");
        assert_eq!(payload["published"], "2025-05-13T00:00:00Z");
        assert_eq!(payload["title"], "GraphCast forecasts");
        assert_eq!(payload["tags"], json!(["ai", "weather"]));
        assert_eq!(payload["embedding_input_sha256"], "deadbeef");
    }

    #[test]
    fn payload_drops_unparseable_published_field() {
        let payload = build_payload(&sample_record(Some("not-a-date"))).expect("payload");
        assert!(!payload.contains_key("published"));

        let payload = build_payload(&sample_record(None)).expect("payload");
        assert!(!payload.contains_key("published"));
    }
}
