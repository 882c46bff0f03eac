use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three logical collections an article record can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Mutable, single-owner working copies, keyed by bare guid.
    Draft,
    /// Immutable snapshots, keyed by `guid:timestamp`.
    Version,
    /// Published pointers, keyed by bare guid.
    Publish,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Draft => "draft",
            Collection::Version => "version",
            Collection::Publish => "publish",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn i64_is_zero(v: &i64) -> bool {
    *v == 0
}

/// An article record.
///
/// The same shape is stored in all three collections; fields that are
/// empty, zero or absent are left out of the serialized document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    /// Store id of this record: the bare guid for drafts and publish
    /// pointers, `guid:version` for versions.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Stable identity, assigned once at creation, never reused.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guid: String,
    /// 0 on drafts, the submit instant in nanoseconds on versions.
    #[serde(default, skip_serializing_if = "i64_is_zero")]
    pub version: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub headline: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// Set once at the first submit of a brand-new article, then carried
    /// forward by edit into every later draft and version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
    /// Set on every submit after the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revised_by: String,
    /// The version this draft was derived from; 0 for brand-new articles.
    #[serde(default, skip_serializing_if = "i64_is_zero")]
    pub from_version: i64,
    /// Owner of exclusive edit rights while this is a live draft; empty on
    /// versions and publish pointers.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locked_by: String,
}

impl Article {
    /// Overwrite the editorial payload with `patch`.
    pub fn apply(&mut self, patch: &DraftPatch) {
        self.headline = patch.headline.clone();
        self.summary = patch.summary.clone();
        self.content = patch.content.clone();
        self.tags = patch.tags.clone();
        self.note = patch.note.clone();
    }

    /// Whether applying `patch` would change nothing.
    pub fn matches(&self, patch: &DraftPatch) -> bool {
        self.headline == patch.headline
            && self.summary == patch.summary
            && self.content == patch.content
            && self.tags == patch.tags
            && self.note == patch.note
    }

    /// Drop the editorial payload, leaving identity and provenance only.
    /// Submit responses return this shape.
    pub fn strip_body(mut self) -> Self {
        self.headline.clear();
        self.summary.clear();
        self.content.clear();
        self.tags.clear();
        self.note.clear();
        self
    }
}

/// The mutable editorial payload accepted by save and submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPatch {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let article = Article {
            guid: "a1".to_string(),
            locked_by: "alice".to_string(),
            ..Article::default()
        };

        let doc = serde_json::to_value(&article).unwrap();
        assert_eq!(
            doc,
            serde_json::json!({"guid": "a1", "locked_by": "alice"})
        );
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let article: Article = serde_json::from_str(r#"{"guid": "a1"}"#).unwrap();
        assert_eq!(article.guid, "a1");
        assert_eq!(article.version, 0);
        assert!(article.tags.is_empty());
        assert!(article.created_at.is_none());
    }

    #[test]
    fn test_apply_and_matches() {
        let patch = DraftPatch {
            headline: "h".to_string(),
            content: "body".to_string(),
            tags: vec!["news".to_string()],
            ..DraftPatch::default()
        };

        let mut article = Article::default();
        assert!(!article.matches(&patch));

        article.apply(&patch);
        assert!(article.matches(&patch));
        assert_eq!(article.headline, "h");
        assert_eq!(article.tags, vec!["news".to_string()]);
    }

    #[test]
    fn test_strip_body_keeps_identity_and_provenance() {
        let mut article = Article {
            id: "a1:42".to_string(),
            guid: "a1".to_string(),
            version: 42,
            created_by: "alice".to_string(),
            ..Article::default()
        };
        article.apply(&DraftPatch {
            headline: "h".to_string(),
            content: "body".to_string(),
            ..DraftPatch::default()
        });

        let stripped = article.strip_body();
        assert_eq!(stripped.id, "a1:42");
        assert_eq!(stripped.version, 42);
        assert_eq!(stripped.created_by, "alice");
        assert!(stripped.headline.is_empty());
        assert!(stripped.content.is_empty());
    }
}
