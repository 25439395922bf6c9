use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.artic.edu/api/v1";

pub const ARTWORK_FIELDS: &str =
    "id,title,place_of_origin,artist_display,inscriptions,date_start,date_end";

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Artwork {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub place_of_origin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artist_display: String,
    #[serde(default)]
    pub inscriptions: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_start: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_end: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pagination {
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub current_page: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiResponse {
    pub pagination: Pagination,
    #[serde(default)]
    pub data: Option<Vec<Artwork>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub records: Vec<Artwork>,
    pub total_count: u64,
}

impl From<ApiResponse> for FetchResult {
    fn from(resp: ApiResponse) -> Self {
        Self {
            records: resp.data.unwrap_or_default(),
            total_count: resp.pagination.total,
        }
    }
}

// page is 1-based
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response: {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("invalid header '{header}', expected 'Key: Value'")]
    InvalidHeader { header: String },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

/// Anything that can serve pages of artworks in a stable order.
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn fetch_page(&self, req: PageRequest) -> Result<FetchResult, FetchError>;
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub header: Option<String>,
    pub use_system_proxy: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 10,
            proxy: None,
            header: None,
            use_system_proxy: true,
        }
    }
}

fn parse_header(
    raw: &str,
) -> Result<(reqwest::header::HeaderName, reqwest::header::HeaderValue), ClientError> {
    let invalid = || ClientError::InvalidHeader {
        header: raw.to_string(),
    };
    let (key, value) = raw.split_once(':').ok_or_else(invalid)?;
    let key = reqwest::header::HeaderName::from_str(key.trim()).map_err(|_| invalid())?;
    let value = reqwest::header::HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((key, value))
}

fn build_client(options: &ClientOptions) -> Result<reqwest::Client, ClientError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );
    if let Some(raw) = options.header.as_deref().filter(|h| !h.trim().is_empty()) {
        let (key, value) = parse_header(raw)?;
        headers.append(key, value);
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(Duration::from_secs(options.timeout_seconds));

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    } else if !options.use_system_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| ClientError::HttpClientBuild { source: e })
}

#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpSource {
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        let base = options.base_url.trim().trim_end_matches('/');
        let endpoint = reqwest::Url::parse(&format!("{base}/artworks")).map_err(|_| {
            ClientError::InvalidBaseUrl {
                url: options.base_url.clone(),
            }
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: options.base_url.clone(),
            });
        }
        let client = build_client(options)?;
        Ok(Self { client, endpoint })
    }

    pub fn page_url(&self, req: PageRequest) -> reqwest::Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("page", &req.page.to_string())
            .append_pair("limit", &req.limit.to_string())
            .append_pair("fields", ARTWORK_FIELDS);
        url
    }
}

#[async_trait]
impl ArtworkSource for HttpSource {
    async fn fetch_page(&self, req: PageRequest) -> Result<FetchResult, FetchError> {
        let url = self.page_url(req);
        let url_str = url.to_string();
        debug!(url = %url_str, "fetching artworks");

        let network = |source: reqwest::Error| FetchError::Network {
            url: url_str.clone(),
            source,
        };
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        let body = resp.bytes().await.map_err(network)?;

        let parsed: ApiResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::MalformedResponse {
                url: url_str.clone(),
                source: e,
            })?;
        Ok(parsed.into())
    }
}
