use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let base_url = cfg.remote.base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow!("remote.base_url is not configured"));
        }
        let base_url = Url::parse(base_url)
            .with_context(|| format!("remote.base_url is not a valid URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("remote.base_url cannot carry a path: {base_url}");
        }
        if cfg.remote.api_key.trim().is_empty() {
            warn!("remote.api_key is empty; requests will likely be rejected");
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", cfg.remote.api_key.trim()))
            .with_context(|| "remote.api_key is not a valid header value")?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(cfg.remote.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.remote.timeout_seconds.max(1)))
            .build()
            .with_context(|| "building HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Base URL plus the request's segments, each percent-encoded so a UID
    /// holding `/`, `?` or `#` stays inside its own segment.
    pub fn url(&self, req: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("remote.base_url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(&req.segments);
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn send(&self, req: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url(req)?;
        debug!("{} {}", req.method.as_str(), url);

        let builder = match req.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
            Method::Put => self.client.put(url.clone()),
        };
        let builder = builder.query(&req.query);
        let builder = match &req.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let resp = builder
            .send()
            .with_context(|| format!("{} {}", req.method.as_str(), url))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .with_context(|| format!("reading response body: {url}"))?;

        if status == 200 {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            Ok(ApiResponse::new(status, body))
        } else {
            warn!(
                "[{status}] {} {} failed; server said: {}",
                req.method.as_str(),
                req.path(),
                text.trim()
            );
            Ok(ApiResponse::new(status, Value::String(text)))
        }
    }
}
