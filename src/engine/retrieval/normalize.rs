// ── Retrieval: Record Normalization ────────────────────────────────────────
//
// Maps raw collection candidates and remote memories onto `MemoryRecord`.
// Every score comes from an ordered lookup with a fixed winner:
//
//   query similarity (local)   1 - distance, clamped to [0,1]
//   query similarity (remote)  similarity_score → score → 0
//   relevance score            record field → metadata.relevance_score →
//                              metadata.similarity_score →
//                              custom_metadata.relevance_score → 0
//
// Content that is missing, blank, or the literal "none" becomes `None`;
// `metadata.content` is tried before giving up.

use crate::atoms::types::{Metadata, MemoryRecord, RawCandidate, RemoteMemory, Tier};
use serde_json::Value;

/// Similarity for a cosine distance. Non-finite input scores 0.
pub fn similarity_from_distance(distance: f64) -> f64 {
    clamp_unit(1.0 - distance)
}

/// Clamp into [0,1]; absorbs float drift such as `1.0000001`.
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `Some(text)` only when the text carries real content.
pub fn clean_content(raw: Option<&str>) -> Option<String> {
    let text = raw?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(text.to_string())
    }
}

fn resolve_content(primary: Option<&str>, metadata: &Metadata) -> Option<String> {
    clean_content(primary).or_else(|| clean_content(metadata.get("content").and_then(Value::as_str)))
}

/// Strings from a JSON array, or from a comma-separated string (vector
/// store metadata cannot hold lists, so sync jobs join them).
pub fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Numbers, or strings holding numbers.
fn as_score(v: Option<&Value>) -> Option<f64> {
    let score = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

/// Relevance lookup shared by both paths. First present source wins.
pub fn resolve_relevance(primary: Option<f64>, metadata: &Metadata, custom: Option<&Metadata>) -> f64 {
    primary
        .filter(|s| s.is_finite())
        .or_else(|| as_score(metadata.get("relevance_score")))
        .or_else(|| as_score(metadata.get("similarity_score")))
        .or_else(|| custom.and_then(|c| as_score(c.get("relevance_score"))))
        .unwrap_or(0.0)
}

/// Tier tag recorded in metadata at sync time, if any.
pub fn tier_from_metadata(metadata: &Metadata) -> Option<Tier> {
    match metadata.get("tier")? {
        Value::Number(n) => match n.as_u64()? {
            0 => Some(Tier::Tier0),
            1 => Some(Tier::Tier1),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "0" | "tier0" => Some(Tier::Tier0),
            "1" | "tier1" => Some(Tier::Tier1),
            _ => None,
        },
        _ => None,
    }
}

fn nested_object<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a Metadata> {
    metadata.get(key).and_then(Value::as_object)
}

/// Normalize one local candidate produced by `tier`'s collection.
pub fn from_candidate(tier: Tier, candidate: RawCandidate) -> MemoryRecord {
    let RawCandidate { id, document, metadata, distance } = candidate;
    let content = resolve_content(document.as_deref(), &metadata);
    let relevance_score = resolve_relevance(None, &metadata, nested_object(&metadata, "custom_metadata"));
    MemoryRecord {
        id,
        content,
        query_similarity: similarity_from_distance(distance),
        relevance_score,
        tags: string_list(metadata.get("tags")),
        topics: string_list(metadata.get("topics")),
        tier,
        metadata,
    }
}

/// Normalize one remote memory. `position` names records that arrive
/// without an id.
pub fn from_remote(position: usize, memory: RemoteMemory) -> MemoryRecord {
    let metadata = memory.metadata.unwrap_or_default();
    let query_similarity = clamp_unit(memory.similarity_score.or(memory.score).unwrap_or(0.0));
    let relevance_score =
        resolve_relevance(memory.relevance_score, &metadata, memory.custom_metadata.as_ref());
    let tags = match memory.tags {
        Some(tags) => tags,
        None => string_list(metadata.get("tags")),
    };
    let topics = match memory.topics {
        Some(topics) => topics,
        None => string_list(metadata.get("topics")),
    };
    MemoryRecord {
        id: memory.id.unwrap_or_else(|| format!("remote-{}", position)),
        content: resolve_content(memory.content.as_deref(), &metadata),
        query_similarity,
        relevance_score,
        tags,
        topics,
        tier: tier_from_metadata(&metadata).unwrap_or(Tier::Tier1),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap_or_default()
    }

    fn candidate(document: Option<&str>, metadata: Value, distance: f64) -> RawCandidate {
        RawCandidate {
            id: "c1".into(),
            document: document.map(str::to_string),
            metadata: meta(metadata),
            distance,
        }
    }

    #[test]
    fn test_similarity_from_distance_clamps() {
        assert!((similarity_from_distance(0.25) - 0.75).abs() < 1e-12);
        assert_eq!(similarity_from_distance(-1e-7), 1.0);
        assert_eq!(similarity_from_distance(1.6), 0.0);
        assert_eq!(similarity_from_distance(f64::NAN), 0.0);
    }

    #[test]
    fn test_clean_content_sentinels() {
        assert_eq!(clean_content(None), None);
        assert_eq!(clean_content(Some("")), None);
        assert_eq!(clean_content(Some("   ")), None);
        assert_eq!(clean_content(Some("None")), None);
        assert_eq!(clean_content(Some(" none ")), None);
        assert_eq!(clean_content(Some("None of the above")).as_deref(), Some("None of the above"));
    }

    #[test]
    fn test_candidate_without_content_has_none() {
        let rec = from_candidate(Tier::Tier1, candidate(Some("None"), json!({}), 0.1));
        assert_eq!(rec.content, None);
        assert_eq!(rec.tier, Tier::Tier1);
        assert!(rec.tags.is_empty());
        assert!(rec.topics.is_empty());
    }

    #[test]
    fn test_candidate_content_from_metadata() {
        let rec = from_candidate(Tier::Tier0, candidate(None, json!({"content": "Grow ARR 20%"}), 0.2));
        assert_eq!(rec.content.as_deref(), Some("Grow ARR 20%"));
    }

    #[test]
    fn test_candidate_tags_and_topics() {
        let rec = from_candidate(
            Tier::Tier0,
            candidate(Some("goal"), json!({"tags": "okr, q3,", "topics": ["growth", "sales"]}), 0.0),
        );
        assert_eq!(rec.tags, vec!["okr", "q3"]);
        assert_eq!(rec.topics, vec!["growth", "sales"]);
        assert_eq!(rec.query_similarity, 1.0);
    }

    #[test]
    fn test_relevance_lookup_order() {
        let m = meta(json!({"relevance_score": 0.7, "similarity_score": 0.2}));
        assert_eq!(resolve_relevance(Some(0.9), &m, None), 0.9);
        assert_eq!(resolve_relevance(None, &m, None), 0.7);

        let m = meta(json!({"similarity_score": "0.4"}));
        assert_eq!(resolve_relevance(None, &m, None), 0.4);

        let custom = meta(json!({"relevance_score": 0.3}));
        assert_eq!(resolve_relevance(None, &Metadata::new(), Some(&custom)), 0.3);
        assert_eq!(resolve_relevance(None, &Metadata::new(), None), 0.0);
        assert_eq!(resolve_relevance(Some(f64::NAN), &Metadata::new(), None), 0.0);
    }

    #[test]
    fn test_candidate_relevance_from_nested_custom_metadata() {
        let rec = from_candidate(
            Tier::Tier1,
            candidate(Some("x"), json!({"custom_metadata": {"relevance_score": 0.55}}), 0.5),
        );
        assert_eq!(rec.relevance_score, 0.55);
        assert!((rec.query_similarity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tier_from_metadata_variants() {
        assert_eq!(tier_from_metadata(&meta(json!({"tier": 0}))), Some(Tier::Tier0));
        assert_eq!(tier_from_metadata(&meta(json!({"tier": "tier0"}))), Some(Tier::Tier0));
        assert_eq!(tier_from_metadata(&meta(json!({"tier": "1"}))), Some(Tier::Tier1));
        assert_eq!(tier_from_metadata(&meta(json!({"tier": 7}))), None);
        assert_eq!(tier_from_metadata(&Metadata::new()), None);
    }

    #[test]
    fn test_remote_similarity_prefers_similarity_score() {
        let rec = from_remote(
            0,
            RemoteMemory {
                id: Some("r1".into()),
                content: Some("notes".into()),
                similarity_score: Some(0.8),
                score: Some(0.1),
                ..Default::default()
            },
        );
        assert_eq!(rec.query_similarity, 0.8);
        assert_eq!(rec.relevance_score, 0.0);
        assert_eq!(rec.tier, Tier::Tier1);
    }

    #[test]
    fn test_remote_fallbacks() {
        let rec = from_remote(
            4,
            RemoteMemory {
                score: Some(1.2),
                metadata: Some(meta(json!({"tier": 0, "similarity_score": 0.35, "topics": "a,b"}))),
                ..Default::default()
            },
        );
        assert_eq!(rec.id, "remote-4");
        assert_eq!(rec.query_similarity, 1.0);
        assert_eq!(rec.relevance_score, 0.35);
        assert_eq!(rec.tier, Tier::Tier0);
        assert_eq!(rec.topics, vec!["a", "b"]);
        assert_eq!(rec.content, None);
    }
}
