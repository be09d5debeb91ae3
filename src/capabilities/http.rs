use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Backend base URL, validated once when configuration is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaseUrl {
    url: String,
    host: String,
}

impl BaseUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, UrlError> {
        let url = url.into();
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }

        if trimmed.len() > MAX_URL_LENGTH {
            return Err(UrlError::TooLong {
                max: MAX_URL_LENGTH,
            });
        }

        let parsed = Url::parse(trimmed).map_err(|e| UrlError::Parse {
            url: Self::truncate_url(trimmed),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::Scheme(scheme));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| UrlError::MissingHost(Self::truncate_url(trimmed)))?
            .to_lowercase();

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(UrlError::Credentials);
        }

        Ok(Self {
            url: parsed.as_str().trim_end_matches('/').to_string(),
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `path` must start with `/`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let cut = url
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= 100)
                .last()
                .unwrap_or(0);
            format!("{}...", &url[..cut])
        }
    }
}

/// The local development backend.
impl Default for BaseUrl {
    fn default() -> Self {
        Self {
            url: DEFAULT_BASE_URL.into(),
            host: "localhost".into(),
        }
    }
}

impl TryFrom<String> for BaseUrl {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BaseUrl> for String {
    fn from(value: BaseUrl) -> Self {
        value.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum UrlError {
    #[error("URL cannot be empty")]
    Empty,
    #[error("URL exceeds maximum length of {max} bytes")]
    TooLong { max: usize },
    #[error("invalid URL '{url}': {reason}")]
    Parse { url: String, reason: String },
    #[error("invalid scheme '{0}', only 'http' and 'https' are allowed")]
    Scheme(String),
    #[error("URL must have a host: {0}")]
    MissingHost(String),
    #[error("credentials in URL are not allowed")]
    Credentials,
}

/// Every backend endpoint the core talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    FoodSearch { query: String, limit: u32 },
    YehApprovedFoods { limit: u32 },
    Preferences,
    AllowedPreferences,
    RestrictedPreferences,
    DeletePreferences,
    Settings,
    Nutrition,
    SubscriptionStatus,
    SubscriptionProducts,
    SubscriptionCheckout,
    SubscriptionPortal,
    SubscriptionCancel,
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Endpoint::FoodSearch { query, limit } => {
                let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
                format!("/foods/search?query={encoded}&limit={limit}")
            }
            Endpoint::YehApprovedFoods { limit } => {
                format!("/foods/search/all/yehapproved?limit={limit}")
            }
            Endpoint::Preferences => "/user/preferences".into(),
            Endpoint::AllowedPreferences => "/user/preferences/allowed".into(),
            Endpoint::RestrictedPreferences => "/user/preferences/restricted".into(),
            Endpoint::DeletePreferences => "/user/preferences/".into(),
            Endpoint::Settings => "/user/settings".into(),
            Endpoint::Nutrition => "/user/nutrition".into(),
            Endpoint::SubscriptionStatus => "/subscriptions/status".into(),
            Endpoint::SubscriptionProducts => "/subscriptions/products".into(),
            Endpoint::SubscriptionCheckout => "/subscriptions/checkout".into(),
            Endpoint::SubscriptionPortal => "/subscriptions/portal".into(),
            Endpoint::SubscriptionCancel => "/subscriptions/cancel".into(),
        }
    }

    pub fn url(&self, base: &BaseUrl) -> String {
        base.join(&self.path())
    }
}

/// Outcome of a backend call as the rest of the core sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("not authenticated")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("server error {0}")]
    Server(u16),

    #[error("request rejected with status {0}")]
    Client(u16),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("could not encode request: {0}")]
    Encode(String),

    #[error("API endpoint is not configured")]
    NotConfigured,
}

impl ApiError {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => ApiError::Network("no response".into()),
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            500..=599 => ApiError::Server(status),
            _ => ApiError::Client(status),
        }
    }

    /// Only transport failures count as network errors; a body that fails
    /// to parse is a decode error.
    pub fn from_http_error(error: crux_http::HttpError) -> Self {
        use crux_http::HttpError;

        match error {
            HttpError::Http { code, .. } => ApiError::from_status(code.into()),
            HttpError::Json(reason) => ApiError::Decode(reason),
            HttpError::Url(reason) => ApiError::Encode(reason),
            other => ApiError::Network(other.to_string()),
        }
    }

    /// HTTP status class, with 0 standing for "no response at all".
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network(_) => 0,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound => 404,
            ApiError::Server(status) | ApiError::Client(status) => *status,
            ApiError::Decode(_) | ApiError::Encode(_) | ApiError::NotConfigured => 0,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Collapses a crux_http outcome into an [`ApiResult`], so events carry
/// plain serializable data.
pub fn api_result<T>(result: crux_http::Result<crux_http::Response<T>>) -> ApiResult<T> {
    match result {
        Ok(mut response) => {
            let status: u16 = response.status().into();
            if !(200..300).contains(&status) {
                return Err(ApiError::from_status(status));
            }
            response
                .take_body()
                .ok_or_else(|| ApiError::Decode("empty response body".into()))
        }
        Err(e) => Err(ApiError::from_http_error(e)),
    }
}

/// Like [`api_result`] for calls whose response body is ignored.
pub fn api_unit<T>(result: crux_http::Result<crux_http::Response<T>>) -> ApiResult<()> {
    match result {
        Ok(response) => {
            let status: u16 = response.status().into();
            if (200..300).contains(&status) {
                Ok(())
            } else {
                Err(ApiError::from_status(status))
            }
        }
        Err(e) => Err(ApiError::from_http_error(e)),
    }
}
