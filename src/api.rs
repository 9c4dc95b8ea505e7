//! HTTP collaborators — roster listing and paged history.
//!
//! DESIGN
//! ======
//! [`MessageSource`] is the seam between the runtime and the network. The
//! runtime only ever holds an `Arc<dyn MessageSource>`, so tests substitute
//! an in-memory source and the binary uses [`HttpMessageSource`].
//!
//! The session cookie is installed as a default header on the `reqwest`
//! client once, at construction.

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, FetchError};
use crate::model::{Message, RosterEntry, UserId};
use crate::pagination::Page;
use crate::session::Session;

// =============================================================================
// TRAIT
// =============================================================================

/// Source of roster snapshots and history pages.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Conversation partners, most recently active first.
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, FetchError>;

    /// One page of history with `peer`. Page 1 is the newest.
    async fn fetch_page(&self, peer: &UserId, page: u32) -> Result<Page, FetchError>;
}

// =============================================================================
// HTTP
// =============================================================================

#[derive(Deserialize)]
struct PageBody {
    #[serde(default)]
    messages: Option<Vec<frames::MessagePayload>>,
    #[serde(default)]
    has_more: bool,
}

impl From<PageBody> for Page {
    fn from(body: PageBody) -> Self {
        Self {
            messages: body.messages.unwrap_or_default().into_iter().map(Message::from).collect(),
            has_more: body.has_more,
        }
    }
}

/// [`MessageSource`] backed by the chat service's JSON endpoints.
#[derive(Clone, Debug)]
pub struct HttpMessageSource {
    client: reqwest::Client,
    base_url: String,
    roster_path: String,
    history_path: String,
}

impl HttpMessageSource {
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s), the session token is
    /// not a valid header value, or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: &Session) -> Result<Self, ClientError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = session.cookie() {
            headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
        }
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            roster_path: config.roster_path.clone(),
            history_path: config.history_path.clone(),
        })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "api: GET");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), path: path.to_owned() });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MessageSource for HttpMessageSource {
    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, FetchError> {
        // The service encodes an empty roster as `null`.
        let entries: Option<Vec<RosterEntry>> = self.get_json(&self.roster_path, &[]).await?;
        Ok(entries.unwrap_or_default())
    }

    async fn fetch_page(&self, peer: &UserId, page: u32) -> Result<Page, FetchError> {
        let path = format!("{}/{}", self.history_path, peer);
        let body: PageBody = self.get_json(&path, &[("page", page.to_string())]).await?;
        Ok(body.into())
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
