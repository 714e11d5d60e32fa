//! Serde-deserializable types matching content-store query responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::keys::PageKey;
use super::types::{
  AboutContent, ContactContent, ContentPayload, EventsContent, ForumContent, HomeContent,
  ResourcesContent, SiteSettings,
};

/// Re-serialize a value through JSON to convert between compatible types.
pub fn reserialize<T: DeserializeOwned>(value: impl Serialize) -> serde_json::Result<T> {
  serde_json::from_value(serde_json::to_value(value)?)
}

/// Envelope around a content-store query response.
///
/// The store answers `GET /query?query=...` with the matched document under
/// `result`, or `null` when nothing matched.
#[derive(Debug, Deserialize)]
pub struct ApiQueryResponse {
  pub result: Option<serde_json::Value>,
  #[serde(default)]
  pub ms: Option<u64>,
}

/// Convert a raw query result into the typed payload for `key`.
///
/// This is the boundary where untyped store documents become typed content:
/// the target shape is chosen by the key, so a document that does not match
/// surfaces as a deserialization error instead of entering the cache.
pub fn payload_from_result(key: PageKey, result: serde_json::Value) -> serde_json::Result<ContentPayload> {
  Ok(match key {
    PageKey::HomePage => ContentPayload::Home(reserialize::<HomeContent>(result)?),
    PageKey::AboutPage => ContentPayload::About(reserialize::<AboutContent>(result)?),
    PageKey::EventsPage => ContentPayload::Events(reserialize::<EventsContent>(result)?),
    PageKey::ForumPage => ContentPayload::Forum(reserialize::<ForumContent>(result)?),
    PageKey::ResourcesPage => ContentPayload::Resources(reserialize::<ResourcesContent>(result)?),
    PageKey::ContactPage => ContentPayload::Contact(reserialize::<ContactContent>(result)?),
    PageKey::SiteSettings => ContentPayload::Settings(reserialize::<SiteSettings>(result)?),
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn converts_documents_by_key() {
    let doc = json!({
      "heading": "About us",
      "body": "We organize things.",
      "team": [{"name": "Ada", "role": "Chair", "photo_url": null}]
    });

    let payload = payload_from_result(PageKey::AboutPage, doc).unwrap();
    assert_eq!(payload.key(), PageKey::AboutPage);
    match payload {
      ContentPayload::About(about) => {
        assert_eq!(about.team.len(), 1);
        assert_eq!(about.team[0].name, "Ada");
      }
      other => panic!("expected about payload, got {:?}", other),
    }
  }

  #[test]
  fn mismatched_document_fails_conversion() {
    // An events document has no `email`, so it cannot become contact content
    let doc = json!({"heading": "Upcoming", "events": []});
    assert!(payload_from_result(PageKey::ContactPage, doc).is_err());
  }
}
