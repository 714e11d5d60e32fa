//! Typed content payloads, one shape per page key.

use serde::{Deserialize, Serialize};

use super::keys::PageKey;

/// Hero banner block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
  pub heading: String,
  pub tagline: Option<String>,
  pub image_url: Option<String>,
}

/// Home page highlight card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
  pub title: String,
  pub blurb: String,
  pub link: Option<String>,
}

/// Home page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeContent {
  pub hero: Hero,
  pub intro: Option<String>,
  #[serde(default)]
  pub highlights: Vec<Highlight>,
}

/// Team member entry on the about page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
  pub name: String,
  pub role: String,
  pub photo_url: Option<String>,
}

/// About page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AboutContent {
  pub heading: String,
  pub body: String,
  #[serde(default)]
  pub team: Vec<TeamMember>,
}

/// A single listed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
  pub title: String,
  pub starts_at: String,
  pub location: Option<String>,
  pub description: Option<String>,
}

/// Events page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsContent {
  pub heading: String,
  #[serde(default)]
  pub events: Vec<EventItem>,
}

/// Forum topic teaser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumTopic {
  pub title: String,
  pub url: String,
  #[serde(default)]
  pub replies: u32,
}

/// Forum page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumContent {
  pub heading: String,
  #[serde(default)]
  pub topics: Vec<ForumTopic>,
}

/// External resource link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
  pub title: String,
  pub url: String,
  pub category: Option<String>,
}

/// Resources page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesContent {
  pub heading: String,
  #[serde(default)]
  pub resources: Vec<ResourceLink>,
}

/// Contact page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactContent {
  pub heading: String,
  pub email: String,
  pub phone: Option<String>,
  pub address: Option<String>,
}

/// Navigation entry in the site settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavItem {
  pub label: String,
  pub path: String,
}

/// Site-wide settings (brand, navigation, footer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
  pub title: String,
  #[serde(default)]
  pub nav: Vec<NavItem>,
  pub footer_text: Option<String>,
}

/// One fetched content object, tagged by the surface it belongs to.
///
/// Replaces the source's untyped payloads: each page key maps to exactly one
/// variant, and the mapping is checked where fetch results enter the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContentPayload {
  Home(HomeContent),
  About(AboutContent),
  Events(EventsContent),
  Forum(ForumContent),
  Resources(ResourcesContent),
  Contact(ContactContent),
  Settings(SiteSettings),
}

impl ContentPayload {
  /// The page key this payload belongs to.
  pub fn key(&self) -> PageKey {
    match self {
      ContentPayload::Home(_) => PageKey::HomePage,
      ContentPayload::About(_) => PageKey::AboutPage,
      ContentPayload::Events(_) => PageKey::EventsPage,
      ContentPayload::Forum(_) => PageKey::ForumPage,
      ContentPayload::Resources(_) => PageKey::ResourcesPage,
      ContentPayload::Contact(_) => PageKey::ContactPage,
      ContentPayload::Settings(_) => PageKey::SiteSettings,
    }
  }
}
