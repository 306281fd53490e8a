// src/services/feed.rs

//! Feed transport: listing pages and fetching individual posts.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::COOKIE;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PostDetail, PostSummary, Session};
use crate::utils::http::get_json;

/// Anything that can fetch feed pages with a bootstrapped session.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Up to `limit` summaries older than `before` (newest first when `before` is `None`).
    async fn fetch_page(
        &self,
        session: &Session,
        forum: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PostSummary>>;

    /// Full post body.
    async fn fetch_post(&self, session: &Session, id: &str) -> Result<PostDetail>;
}

/// JSON-over-HTTP feed client.
pub struct HttpFeedTransport {
    client: Client,
    base_url: Url,
}

impl HttpFeedTransport {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::config(format!("feed base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `{base}/forums/{forum}/posts?limit=N[&before=cursor]`
    pub fn page_url(&self, forum: &str, before: Option<&str>, limit: usize) -> Result<Url> {
        let mut url = self.endpoint(&["forums", forum, "posts"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(before) = before {
                query.append_pair("before", before);
            }
        }
        Ok(url)
    }

    /// `{base}/posts/{id}`
    pub fn post_url(&self, id: &str) -> Result<Url> {
        self.endpoint(&["posts", id])
    }

    fn request(&self, session: &Session, url: Url) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(cookie) = session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        for (name, value) in &session.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn fetch_page(
        &self,
        session: &Session,
        forum: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PostSummary>> {
        let url = self.page_url(forum, before, limit)?;
        let context = url.to_string();
        let summaries: Vec<PostSummary> = get_json(self.request(session, url), &context).await?;
        log::debug!("Fetched {} summaries from {}", summaries.len(), context);
        Ok(summaries)
    }

    async fn fetch_post(&self, session: &Session, id: &str) -> Result<PostDetail> {
        let url = self.post_url(id)?;
        let context = url.to_string();
        let detail: PostDetail = get_json(self.request(session, url), &context).await?;
        log::debug!("Fetched post {}: {}", id, detail.title);
        Ok(detail)
    }
}
