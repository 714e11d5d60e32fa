//! Page key registry: the closed set of queryable content surfaces.
//!
//! Every page type the site renders has exactly one key here. Lookups by
//! string fail loudly on anything else - an unknown key means the caller
//! and the registry disagree, which is a programming error.

use std::fmt;

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// Identifies one queryable content surface (one per rendered page type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageKey {
  HomePage,
  AboutPage,
  EventsPage,
  ForumPage,
  ResourcesPage,
  ContactPage,
  SiteSettings,
}

impl PageKey {
  /// The full registry, in navigation order.
  pub const ALL: [PageKey; 7] = [
    PageKey::HomePage,
    PageKey::AboutPage,
    PageKey::EventsPage,
    PageKey::ForumPage,
    PageKey::ResourcesPage,
    PageKey::ContactPage,
    PageKey::SiteSettings,
  ];

  /// Stable string form, as used in cache listings and config.
  pub fn as_str(&self) -> &'static str {
    match self {
      PageKey::HomePage => "homePage",
      PageKey::AboutPage => "aboutPage",
      PageKey::EventsPage => "eventsPage",
      PageKey::ForumPage => "forumPage",
      PageKey::ResourcesPage => "resourcesPage",
      PageKey::ContactPage => "contactPage",
      PageKey::SiteSettings => "siteSettings",
    }
  }

  /// Parse a key string. Unknown keys are an error, never a silent no-op.
  pub fn parse(s: &str) -> Result<Self> {
    PageKey::ALL
      .into_iter()
      .find(|key| key.as_str() == s)
      .ok_or_else(|| eyre!("Unknown page key '{}': not in the registry", s))
  }

  /// The content-store query for this surface.
  pub fn content_query(&self) -> &'static str {
    match self {
      PageKey::HomePage => r#"*[_type == "homePage"][0]"#,
      PageKey::AboutPage => r#"*[_type == "aboutPage"][0]"#,
      PageKey::EventsPage => r#"*[_type == "eventsPage"][0]"#,
      PageKey::ForumPage => r#"*[_type == "forumPage"][0]"#,
      PageKey::ResourcesPage => r#"*[_type == "resourcesPage"][0]"#,
      PageKey::ContactPage => r#"*[_type == "contactPage"][0]"#,
      PageKey::SiteSettings => r#"*[_type == "siteSettings"][0]"#,
    }
  }

  /// Map a navigation-intent path segment to its page key.
  ///
  /// The root path maps to the home page; any other segment follows the
  /// `<segment>Page` convention. Segments outside the registry are an error.
  pub fn from_intent(segment: &str) -> Result<Self> {
    if segment.is_empty() {
      return Ok(PageKey::HomePage);
    }
    PageKey::parse(&format!("{}Page", segment))
      .map_err(|_| eyre!("Navigation segment '{}' does not map to a page key", segment))
  }
}

impl fmt::Display for PageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_roundtrips_every_registry_key() {
    for key in PageKey::ALL {
      assert_eq!(PageKey::parse(key.as_str()).unwrap(), key);
    }
  }

  #[test]
  fn parse_rejects_unknown_keys() {
    assert!(PageKey::parse("blogPage").is_err());
    assert!(PageKey::parse("").is_err());
  }

  #[test]
  fn intent_maps_root_to_home() {
    assert_eq!(PageKey::from_intent("").unwrap(), PageKey::HomePage);
  }

  #[test]
  fn intent_maps_segments_by_convention() {
    assert_eq!(PageKey::from_intent("about").unwrap(), PageKey::AboutPage);
    assert_eq!(PageKey::from_intent("events").unwrap(), PageKey::EventsPage);
    assert_eq!(PageKey::from_intent("contact").unwrap(), PageKey::ContactPage);
  }

  #[test]
  fn intent_rejects_unknown_segments() {
    assert!(PageKey::from_intent("admin").is_err());
    // siteSettings is not a navigable page
    assert!(PageKey::from_intent("siteSettings").is_err());
  }
}
