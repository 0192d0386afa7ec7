//! HTTP client for the condominium API.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

/// Backend connection options shared by the online subcommands.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Base URL of the backend.
    #[arg(long, env = "CONDO_API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// Bearer token from `condo login`.
    #[arg(long, env = "CONDO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Error envelope returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Thin JSON client over the backend routes.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ApiClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let mut base =
            Url::parse(api_url).with_context(|| format!("invalid API URL: {api_url}"))?;
        if base.cannot_be_a_base() {
            bail!("invalid API URL: {api_url}");
        }
        // Relative joins keep a path prefix only when it ends with '/'.
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.trim().is_empty()).map(Zeroizing::new),
        })
    }

    pub fn from_args(args: &ConnectionArgs) -> Result<Self> {
        Self::new(&args.api_url, args.token.clone())
    }

    /// Fail early when a command needs a token and none was given.
    pub fn require_token(&self) -> Result<()> {
        if self.token.is_none() {
            bail!("no token given; run `condo login` and pass --token or set CONDO_TOKEN");
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid path: {path}"))?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.as_str());
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(Method::GET, path)?
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        decode(path, response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .request(Method::POST, path)?
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        decode(path, response).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("reading response of {path}"))?;
    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .map(|e| format!("{}: {}", e.error.code, e.error.message))
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
        return Err(anyhow!("{path} returned {status} ({detail})"));
    }
    tracing::debug!(path, %status, bytes = bytes.len(), "response received");
    serde_json::from_slice(&bytes).with_context(|| format!("unexpected response body from {path}"))
}
