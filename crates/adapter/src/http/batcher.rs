//! Splitting identifier lists into URL-length-bounded groups.

use derive_getters::Getters;
use recordstore_types::{Identifier, ResourceName};
use tracing::debug;

use super::url_builder::UrlBuilder;

/// Identifiers of one resource that travel in a single find-many request.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Group {
    resource: ResourceName,
    base_url: String,
    ids: Vec<Identifier>,
}

impl Group {
    pub fn new(resource: ResourceName, base_url: impl Into<String>, ids: Vec<Identifier>) -> Self {
        Self {
            resource,
            base_url: base_url.into(),
            ids,
        }
    }

    /// The exact URL requested for this group
    pub fn full_url(&self) -> String {
        UrlBuilder::full_url(&self.base_url, &self.ids)
    }

    pub fn url_len(&self) -> usize {
        self.full_url().len()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Greedily pack `ids` into groups whose full URL
/// (`base_url?ids%5B%5D=a&ids%5B%5D=b...`) stays within `max_url_length`.
///
/// Order is preserved and every id lands in exactly one group. An id that is
/// too long on its own still gets a group of its own. With no limit all ids
/// share one group.
///
/// # Arguments
/// * `ids` - Deduplicated ids in request order
/// * `base_url` - Collection URL the query string is appended to
/// * `max_url_length` - Bound on the full URL, or `None` for no splitting
///
/// # Example
/// ```rust,ignore
/// let ids: Vec<Identifier> = (1..=3).map(Identifier::from).collect();
/// // "/r?ids%5B%5D=1&ids%5B%5D=2" is 26 characters
/// let groups = group_for_fetch(&ids, "/r", Some(26));
/// assert_eq!(groups, vec![ids[..2].to_vec(), ids[2..].to_vec()]);
/// ```
pub fn group_for_fetch(
    ids: &[Identifier],
    base_url: &str,
    max_url_length: Option<usize>,
) -> Vec<Vec<Identifier>> {
    if ids.is_empty() {
        return Vec::new();
    }

    let max = match max_url_length {
        Some(max) => max,
        None => return vec![ids.to_vec()],
    };

    // "base?" before the first param
    let empty_len = base_url.len() + 1;

    let mut groups = Vec::new();
    let mut current: Vec<Identifier> = Vec::new();
    let mut current_len = empty_len;

    for id in ids {
        let param_len = UrlBuilder::id_param(id).len();
        let separator = if current.is_empty() { 0 } else { 1 };
        let next_len = current_len + separator + param_len;

        if next_len > max && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
            current_len = empty_len + param_len;
        } else {
            current_len = next_len;
        }

        current.push(id.clone());
    }

    groups.push(current);
    groups
}

/// Group the ids of one resource into [`Group`]s targeting `base_url`.
///
/// Same splitting as [`group_for_fetch`], with each chunk tagged by its
/// resource and URL so it can be dispatched on its own.
pub fn partition(
    resource: &ResourceName,
    ids: &[Identifier],
    base_url: &str,
    max_url_length: Option<usize>,
) -> Vec<Group> {
    let groups: Vec<Group> = group_for_fetch(ids, base_url, max_url_length)
        .into_iter()
        .map(|ids| Group::new(resource.clone(), base_url, ids))
        .collect();

    debug!(
        "Partitioned {} {} ids into {} group(s) (max url length {:?})",
        ids.len(),
        resource,
        groups.len(),
        max_url_length
    );

    groups
}
