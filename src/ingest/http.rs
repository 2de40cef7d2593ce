// src/ingest/http.rs
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;

use crate::error::FeedError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) myfeeds/0.1";

/// Response body, decoded as JSON when it looks like JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Result<serde_json::Value, FeedError> {
        match self {
            Payload::Json(v) => Ok(v),
            Payload::Text(t) => Err(FeedError::Parse(format!(
                "expected JSON, got text: {}",
                snippet(&t)
            ))),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Payload::Text(t) => t,
            Payload::Json(v) => v.to_string(),
        }
    }
}

/// Shared request wrapper used by providers and notifiers.
/// Logs every request/response at debug level.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None, DEFAULT_USER_AGENT)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>, user_agent: &str) -> Self {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = ?e, "http client builder failed, using defaults");
                Client::new()
            });
        Self { client, timeout }
    }

    pub async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<Payload, FeedError> {
        self.request(Method::GET, url, params, None).await
    }

    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<Payload, FeedError> {
        self.request(Method::POST, url, &[], Some(form)).await
    }

    /// POST a JSON body (webhooks).
    pub async fn post_json<T>(&self, url: &str, body: &T) -> Result<Payload, FeedError>
    where
        T: Serialize + ?Sized,
    {
        tracing::debug!(method = "POST", url, "http request (json)");
        let req = self.client.post(url).json(body);
        self.send(Method::POST, url, req).await
    }

    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        form: Option<&[(&str, String)]>,
    ) -> Result<Payload, FeedError> {
        tracing::debug!(%method, url, ?params, ?form, "http request");

        let mut req = self.client.request(method.clone(), url).query(params);
        if let Some(form) = form {
            req = req.form(form);
        }
        self.send(method, url, req).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        mut req: RequestBuilder,
    ) -> Result<Payload, FeedError> {
        if let Some(t) = self.timeout {
            req = req.timeout(t);
        }

        let fetch_err = |source: reqwest::Error| FeedError::Fetch {
            url: url.to_string(),
            source,
        };

        let resp = req.send().await.map_err(fetch_err)?;
        let status = resp.status();
        let resp = resp.error_for_status().map_err(fetch_err)?;
        let body = resp.text().await.map_err(fetch_err)?;

        tracing::debug!(%method, url, status = status.as_u16(), body = %snippet(&body), "http response");

        decode_body(body)
    }
}

/// JSON when the body starts like JSON, text otherwise.
pub fn decode_body(body: String) -> Result<Payload, FeedError> {
    let head = body.trim_start();
    if head.starts_with('{') || head.starts_with('[') {
        return Ok(Payload::Json(serde_json::from_str(head)?));
    }
    Ok(Payload::Text(body))
}

fn snippet(s: &str) -> String {
    if s.chars().count() > 512 {
        let mut out: String = s.chars().take(512).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}
