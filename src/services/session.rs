// src/services/session.rs

//! Session bootstrap: turns an initial client interaction into transport
//! credentials for the protected feed.
//!
//! The crawler only sees the [`Session`] value; how it was obtained stays
//! behind [`SessionBootstrapper`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, Session, SessionConfig, SessionMode};
use crate::utils::http::snippet;
use crate::utils::pause;

/// Produces transport credentials and owns whatever resource was used to get them.
#[async_trait]
pub trait SessionBootstrapper: Send + Sync {
    /// Acquire credentials. An error means no credentials at all.
    async fn bootstrap(&self) -> Result<Session>;

    /// Release the resource acquired by `bootstrap`.
    ///
    /// Called exactly once per crawl run, whichever way the run ends.
    async fn release(&self) {}
}

/// Uses configured cookies and headers verbatim.
pub struct StaticBootstrapper {
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
}

impl StaticBootstrapper {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookies: config.cookies.clone(),
            headers: config.headers.clone(),
        }
    }
}

#[async_trait]
impl SessionBootstrapper for StaticBootstrapper {
    async fn bootstrap(&self) -> Result<Session> {
        if self.cookies.is_empty() {
            log::warn!("Static session has no cookies; feed requests may be challenged");
        }
        Ok(Session::new(
            self.cookies.clone().into_iter().collect(),
            self.headers.clone().into_iter().collect(),
        ))
    }
}

/// Visits a landing page first and keeps the cookies it sets.
pub struct WarmupBootstrapper {
    client: Client,
    config: SessionConfig,
}

impl WarmupBootstrapper {
    pub fn new(client: Client, config: SessionConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SessionBootstrapper for WarmupBootstrapper {
    async fn bootstrap(&self) -> Result<Session> {
        log::info!("Warming up session at {}", self.config.warmup_url);

        let response = self
            .client
            .get(&self.config.warmup_url)
            .send()
            .await
            .map_err(|e| AppError::bootstrap(format!("warmup request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::bootstrap(format!(
                "warmup page returned HTTP {}: {}",
                status,
                snippet(&body, 120)
            )));
        }

        let now = Utc::now();
        let mut cookies = BTreeMap::new();
        let mut expires_at: Option<DateTime<Utc>> = None;

        for cookie in response.cookies() {
            let expiry = cookie
                .max_age()
                .and_then(|age| chrono::Duration::from_std(age).ok())
                .map(|age| now + age)
                .or_else(|| cookie.expires().map(DateTime::<Utc>::from));
            if let Some(expiry) = expiry {
                expires_at = Some(expires_at.map_or(expiry, |current| current.min(expiry)));
            }
            cookies.insert(cookie.name().to_string(), cookie.value().to_string());
        }

        // Configured cookies win over whatever the landing page set
        cookies.extend(self.config.cookies.clone());

        log::info!("Session warmed up with {} cookie(s)", cookies.len());
        pause(self.config.settle_ms).await;

        Ok(Session::new(
            cookies.into_iter().collect(),
            self.config.headers.clone().into_iter().collect(),
        )
        .with_expiry(expires_at))
    }

    async fn release(&self) {
        log::debug!("Warmup session released");
    }
}

/// Build the bootstrapper selected by `session.mode`.
pub fn bootstrapper_from_config(config: &Config, client: Client) -> Box<dyn SessionBootstrapper> {
    match config.session.mode {
        SessionMode::Warmup => Box::new(WarmupBootstrapper::new(client, config.session.clone())),
        SessionMode::Static => Box::new(StaticBootstrapper::new(&config.session)),
    }
}
