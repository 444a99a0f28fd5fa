//! URL building utilities for record endpoints

use itertools::Itertools;
use recordstore_types::{Identifier, ResourceName};

/// Query key for batched lookups, `ids[]` percent-encoded
pub const IDS_PARAM: &str = "ids%5B%5D";

/// Builds record URLs from the adapter's host and namespace.
///
/// Without a host the URLs are relative (`/testRecords`).
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    host: Option<String>,
    namespace: Option<String>,
}

impl UrlBuilder {
    pub fn new(host: Option<&str>, namespace: Option<&str>) -> Self {
        Self {
            host: host
                .map(|h| h.trim_end_matches('/').to_string())
                .filter(|h| !h.is_empty()),
            namespace: namespace
                .map(|n| n.trim_matches('/').to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    fn prefix(&self) -> String {
        let mut url = self.host.clone().unwrap_or_default();
        if let Some(namespace) = &self.namespace {
            url.push('/');
            url.push_str(namespace);
        }
        url
    }

    /// Collection URL used for batched lookups, e.g. `/testRecords`
    pub fn url_for_find_many(&self, resource: &ResourceName) -> String {
        format!("{}/{}", self.prefix(), resource.path_for_type())
    }

    /// Single record URL, e.g. `/testRecords/id%3A123`
    pub fn url_for_find_record(&self, resource: &ResourceName, id: &Identifier) -> String {
        format!("{}/{}", self.url_for_find_many(resource), id.encoded())
    }

    /// Remove the trailing id segment from a single record URL, keeping the
    /// slash. The id is matched in its encoded form. URLs that do not end in
    /// the id are returned unchanged.
    pub fn strip_id_from_url(url: &str, id: &Identifier) -> String {
        let encoded = id.encoded();
        match url.strip_suffix(encoded.as_str()) {
            Some(stripped) if stripped.ends_with('/') => stripped.to_string(),
            _ => url.to_string(),
        }
    }

    /// Serialized `ids[]` query for the given ids, without the leading `?`
    pub fn ids_query(ids: &[Identifier]) -> String {
        ids.iter().map(Self::id_param).join("&")
    }

    /// One `ids%5B%5D=<encoded id>` pair
    pub fn id_param(id: &Identifier) -> String {
        format!("{}={}", IDS_PARAM, id.encoded())
    }

    /// Base URL with the ids query appended
    pub fn full_url(base_url: &str, ids: &[Identifier]) -> String {
        if ids.is_empty() {
            return base_url.to_string();
        }
        format!("{}?{}", base_url, Self::ids_query(ids))
    }
}
