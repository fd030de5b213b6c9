use reqwest::Url;
use serde::{Deserialize, Serialize};

/// The `type` tag of an item. The upstream set is open-ended, anything
/// unrecognised lands in `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Comment,
    Job,
    Poll,
    PollOpt,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single record from the item endpoint.
///
/// Upstream omits fields freely; a missing field decodes to its zero value.
/// Only one of `text` and `url` is ever set by upstream. `position` and
/// `from_cache` are not part of the wire format and are filled in by the
/// dispatcher. The id is read-only outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub(crate) id: u64,
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub descendants: u32,
    #[serde(default)]
    pub kids: Vec<u64>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_deserializing)]
    pub(crate) position: usize,
    #[serde(skip_deserializing)]
    pub(crate) from_cache: bool,
}

impl Item {
    pub fn new(id: u64, kind: ItemKind) -> Self {
        Self {
            id,
            kind,
            ..Self::default()
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Rank of this item in the candidate list it was fetched for.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the item was served from the item cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// A story that points somewhere else: kind `story` with a non-empty URL.
    pub fn is_story_link(&self) -> bool {
        self.kind == ItemKind::Story && self.url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Host part of the URL without a leading `www.`.
    pub fn host(&self) -> Option<String> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_string())
    }
}
