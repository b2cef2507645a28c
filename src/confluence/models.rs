//! Confluence wire models and records
//!
//! Wire structs mirror the JSON the REST API returns and are only used
//! for extraction. Records are what the collector accumulates.

use crate::collect::Record;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Wire Models
// ============================================================================

/// Content ids are strings on current servers and numbers on some old ones
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireLinks {
    webui: Option<String>,
    download: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireSpaceRef {
    key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireContent {
    id: Option<WireId>,
    title: Option<String>,
    space: Option<WireSpaceRef>,
    #[serde(rename = "_links", default)]
    links: WireLinks,
}

#[derive(Debug, Clone, Deserialize)]
struct WireSearchResult {
    content: Option<WireContent>,
    title: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireSpace {
    key: String,
    name: Option<String>,
    #[serde(rename = "_links", default)]
    links: WireLinks,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMember {
    username: Option<String>,
    account_id: Option<String>,
    display_name: Option<String>,
    public_name: Option<String>,
}

fn parse<T: DeserializeOwned>(item: &Value, what: &str) -> Result<T> {
    T::deserialize(item).map_err(|e| Error::decode(format!("{what}: {e}")))
}

// ============================================================================
// Search Hits
// ============================================================================

/// Dedup key for search hits: one entry per (content, term) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HitKey {
    /// Content id, or the web UI link when the result has no id
    pub identifier: String,
    /// Search term that produced the hit
    pub term: String,
}

/// A keyword search result attributed to the term that found it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Content id, when the result carries one
    pub id: Option<String>,
    /// Content title
    pub title: String,
    /// Web UI path relative to the instance base URL
    pub webui: String,
    /// Search term that produced the hit
    pub term: String,
}

impl SearchHit {
    /// Extract a hit from one `/rest/api/search` result
    ///
    /// Content results carry `content.{id,title,_links.webui}`. Other
    /// result kinds fall back to the top-level `title` and `url`.
    pub fn from_item(item: &Value, term: &str) -> Result<Self> {
        let wire: WireSearchResult = parse(item, "search result")?;

        let (id, title, webui) = match wire.content {
            Some(content) => (
                content.id.map(WireId::into_string),
                content.title.or(wire.title),
                content.links.webui.or(wire.url),
            ),
            None => (None, wire.title, wire.url),
        };

        let webui = webui.ok_or_else(|| Error::decode("search result has no link"))?;

        Ok(Self {
            id,
            title: title.unwrap_or_default(),
            webui,
            term: term.to_string(),
        })
    }
}

impl Record for SearchHit {
    type Key = HitKey;

    fn key(&self) -> HitKey {
        HitKey {
            identifier: self.id.clone().unwrap_or_else(|| self.webui.clone()),
            term: self.term.clone(),
        }
    }
}

// ============================================================================
// Spaces, Pages, Attachments
// ============================================================================

/// A Confluence space
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Space {
    /// Space key (`DEV`)
    pub key: String,
    /// Display name
    pub name: String,
    /// Web UI path
    pub webui: Option<String>,
}

impl Space {
    /// Extract a space from one `/rest/api/space` result
    pub fn from_item(item: &Value) -> Result<Self> {
        let wire: WireSpace = parse(item, "space")?;
        Ok(Self {
            name: wire.name.unwrap_or_else(|| wire.key.clone()),
            key: wire.key,
            webui: wire.links.webui,
        })
    }
}

impl Record for Space {
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }
}

/// A page reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRef {
    /// Content id
    pub id: String,
    /// Page title
    pub title: String,
    /// Owning space key
    pub space_key: Option<String>,
    /// Web UI path
    pub webui: Option<String>,
}

impl PageRef {
    /// Extract a page from a content listing item
    ///
    /// `space_key` fills in the owning space when the item does not
    /// expand it (child page listings never do).
    pub fn from_item(item: &Value, space_key: Option<&str>) -> Result<Self> {
        let wire: WireContent = parse(item, "page")?;
        let id = wire
            .id
            .map(WireId::into_string)
            .ok_or_else(|| Error::decode("page has no id"))?;

        Ok(Self {
            id,
            title: wire.title.unwrap_or_default(),
            space_key: wire
                .space
                .and_then(|s| s.key)
                .or_else(|| space_key.map(str::to_string)),
            webui: wire.links.webui,
        })
    }
}

impl Record for PageRef {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A file attached to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Attachment content id
    pub id: String,
    /// File name
    pub title: String,
    /// Download path relative to the instance base URL
    pub download: String,
    /// Page the attachment hangs off
    pub page_id: String,
}

impl Attachment {
    /// Extract an attachment from one `child/attachment` result
    pub fn from_item(item: &Value, page_id: &str) -> Result<Self> {
        let wire: WireContent = parse(item, "attachment")?;
        let download = wire
            .links
            .download
            .ok_or_else(|| Error::decode("attachment has no download link"))?;

        Ok(Self {
            // Old servers omit the id; the download path is unique per file
            id: wire
                .id
                .map(WireId::into_string)
                .unwrap_or_else(|| download.clone()),
            title: wire.title.unwrap_or_default(),
            download,
            page_id: page_id.to_string(),
        })
    }
}

impl Record for Attachment {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

// ============================================================================
// Members
// ============================================================================

/// A group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Username on Server/Data Center, account id on Cloud
    pub username: String,
    /// Display name, when present
    pub display_name: Option<String>,
}

impl Member {
    /// Extract a member from one group member result
    pub fn from_item(item: &Value) -> Result<Self> {
        let wire: WireMember = parse(item, "member")?;
        let username = wire
            .username
            .or(wire.account_id)
            .ok_or_else(|| Error::decode("member has neither username nor accountId"))?;

        Ok(Self {
            username,
            display_name: wire.display_name.or(wire.public_name),
        })
    }
}

impl Record for Member {
    type Key = String;

    fn key(&self) -> String {
        self.username.clone()
    }
}
