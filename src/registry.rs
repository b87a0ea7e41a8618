use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::{Gstin, Pan};
use crate::error::LookupError;

pub const API_KEY_ENV: &str = "VLINK_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Success,
    Error,
    Other,
}

/// Response wrapper shared by both registry operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Some("success".to_string()),
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: Some("error".to_string()),
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn status(&self) -> EnvelopeStatus {
        match self
            .status
            .as_deref()
            .map(|value| value.trim().to_lowercase())
            .as_deref()
        {
            Some("success") => EnvelopeStatus::Success,
            Some("error") => EnvelopeStatus::Error,
            _ => EnvelopeStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PanLinkage {
    #[serde(rename = "PanNum", default)]
    pub pan_num: Option<String>,
    #[serde(rename = "GstinResList", default)]
    pub gstin_res_list: Option<Vec<LinkedGstin>>,
}

impl PanLinkage {
    pub fn new(pan_num: &str, gstins: &[&str]) -> Self {
        Self {
            pan_num: Some(pan_num.to_string()),
            gstin_res_list: Some(
                gstins
                    .iter()
                    .map(|gstin| LinkedGstin {
                        gstin: Some(gstin.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    /// Discovered GSTINs in registry order. Entries without a value are kept
    /// as empty strings so they fail validation instead of vanishing.
    pub fn gstins(&self) -> Vec<String> {
        self.gstin_res_list
            .iter()
            .flatten()
            .map(|item| item.gstin.clone().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkedGstin {
    #[serde(rename = "Gstin", default)]
    pub gstin: Option<String>,
}

pub type PanEnvelope = Envelope<PanLinkage>;
pub type GstEnvelope = Envelope<Value>;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn lookup_by_pan(&self, pan: &Pan) -> Result<PanEnvelope, LookupError>;
    async fn lookup_by_gst(&self, gstin: &Gstin) -> Result<GstEnvelope, LookupError>;
}

#[async_trait]
impl<C: RegistryClient + ?Sized> RegistryClient for Arc<C> {
    async fn lookup_by_pan(&self, pan: &Pan) -> Result<PanEnvelope, LookupError> {
        (**self).lookup_by_pan(pan).await
    }

    async fn lookup_by_gst(&self, gstin: &Gstin) -> Result<GstEnvelope, LookupError> {
        (**self).lookup_by_gst(gstin).await
    }
}

#[derive(Serialize)]
struct PanQuery<'a> {
    #[serde(rename = "PanNumber")]
    pan_number: &'a str,
}

#[derive(Serialize)]
struct GstQuery<'a> {
    #[serde(rename = "GstNumber")]
    gst_number: &'a str,
}

#[derive(Clone)]
pub struct VlinkHttpClient {
    client: Client,
    base_url: String,
}

impl VlinkHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, LookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gstlink/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LookupError::InvalidConfig(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            if !api_key.trim().is_empty() {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(api_key.trim())
                        .map_err(|err| LookupError::InvalidConfig(err.to_string()))?,
                );
            }
        }

        // Per-call deadlines are enforced by the resolver; this one only
        // keeps a stray connection from living forever.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout + Duration::from_secs(5))
            .build()
            .map_err(|err| LookupError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, LookupError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = endpoint_url(&self.base_url, endpoint);
        debug!(%url, "registry request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        let response = Self::handle_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))
    }

    async fn handle_status(response: reqwest::Response) -> Result<reqwest::Response, LookupError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "registry request failed".to_string());
        Err(LookupError::HttpStatus { status, message })
    }
}

#[async_trait]
impl RegistryClient for VlinkHttpClient {
    async fn lookup_by_pan(&self, pan: &Pan) -> Result<PanEnvelope, LookupError> {
        let body = PanQuery {
            pan_number: pan.as_str(),
        };
        self.post_json("SearchByPan", &body).await
    }

    async fn lookup_by_gst(&self, gstin: &Gstin) -> Result<GstEnvelope, LookupError> {
        let body = GstQuery {
            gst_number: gstin.as_str(),
        };
        self.post_json("SearchByGst", &body).await
    }
}

pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
