//! Content domain: page keys, typed payloads, and the store fetch boundary.

pub mod api_types;
mod fetcher;
mod keys;
mod types;

pub use fetcher::{ContentFetcher, HttpContentFetcher};
pub use keys::PageKey;
pub use types::{
  AboutContent, ContactContent, ContentPayload, EventItem, EventsContent, ForumContent,
  ForumTopic, Hero, Highlight, HomeContent, NavItem, ResourceLink, ResourcesContent,
  SiteSettings, TeamMember,
};
