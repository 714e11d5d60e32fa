//! Request classification for the interception proxy.
//!
//! Classification is by URL shape only, computed per request and never
//! cached.

use url::Url;

/// Path prefixes that hold build output; everything under them is an asset
/// even without a file extension (hashed chunks, fonts).
const BUILD_OUTPUT_PREFIXES: &[&str] = &["/assets/", "/static/", "/_build/"];

/// The three request classes the proxy dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
  /// The site's entry page
  RootDocument,
  /// Fingerprinted build output and other files
  StaticAsset,
  /// Secondary pages and everything else
  OtherDocument,
}

/// Classify a URL into exactly one request class.
pub fn classify(url: &Url) -> RequestClass {
  let path = url.path();

  if path == "/" {
    return RequestClass::RootDocument;
  }

  if BUILD_OUTPUT_PREFIXES.iter().any(|p| path.starts_with(p)) || has_file_extension(path) {
    return RequestClass::StaticAsset;
  }

  RequestClass::OtherDocument
}

/// Whether the proxy intercepts this request at all.
///
/// Only idempotent GETs over http(s) go through the caching strategies;
/// everything else passes through unmodified.
pub fn intercepts(method: &str, url: &Url) -> bool {
  method.eq_ignore_ascii_case("GET") && matches!(url.scheme(), "http" | "https")
}

fn has_file_extension(path: &str) -> bool {
  path
    .rsplit('/')
    .next()
    .is_some_and(|segment| segment.contains('.'))
}
