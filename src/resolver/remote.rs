//! Passage API client.
//!
//! Fetches `GET <base_url>/<bible_id>/passages/<reference>` with the API key
//! in an `api-key` header and expects
//!
//! ```json
//! { "data": { "content": "<p class=\"p\">…</p>" } }
//! ```
//!
//! Any non-2xx status is a [`ResolveError::Fetch`]; a success without
//! `data.content` is [`ResolveError::ContentMissing`]. There is no retry.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ResolveRequest, Resolved, TextSource};
use crate::config::RemoteConfig;
use crate::error::ResolveError;
use crate::extract;

#[derive(Debug, Deserialize)]
struct PassageResponse {
    #[serde(default)]
    data: Option<PassageData>,
}

#[derive(Debug, Deserialize)]
struct PassageData {
    #[serde(default)]
    content: Option<String>,
}

pub struct RemoteFetch {
    client: reqwest::Client,
    base_url: String,
    bible_id: String,
    api_key: String,
}

impl RemoteFetch {
    pub fn new(config: &RemoteConfig, bible_id: String, api_key: String) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bible_id,
            api_key,
        })
    }

    pub fn passage_url(&self, reference: &str) -> String {
        format!("{}/{}/passages/{}", self.base_url, self.bible_id, reference)
    }

    /// Fetch the passage HTML for an API reference such as `JHN.3.16`.
    pub async fn fetch_html(&self, reference: &str) -> Result<String, ResolveError> {
        let url = self.passage_url(reference);
        tracing::debug!(%url, "fetching passage");

        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Fetch {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }

        let body: PassageResponse = response.json().await?;
        body.data
            .and_then(|d| d.content)
            .ok_or_else(|| ResolveError::ContentMissing {
                reference: reference.to_string(),
            })
    }
}

#[async_trait]
impl TextSource for RemoteFetch {
    fn name(&self) -> &str {
        "remote"
    }

    async fn resolve(&mut self, req: &ResolveRequest<'_>) -> Result<Option<Resolved>, ResolveError> {
        let reference = req.target.api_reference()?;
        let html = self.fetch_html(&reference).await?;
        let text =
            extract::extract_text(&html).map_err(|e| ResolveError::Extract(e.to_string()))?;

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Resolved { text, fohs: None }))
    }
}
