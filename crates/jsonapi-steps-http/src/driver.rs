// crates/jsonapi-steps-http/src/driver.rs
// ============================================================================
// Module: HTTP Test Driver
// Description: Blocking request driver with last-response recording.
// Purpose: Issue scenario requests and expose the response to assertions.
// Dependencies: jsonapi-steps-core, reqwest, thiserror, url
// ============================================================================

//! ## Overview
//! Requests are resolved against the configured base URL, sent with the
//! persistent header set, and read with a hard size limit. The recorded
//! snapshot replaces the previous one only when a full response body was read;
//! transport failures leave the last response untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use jsonapi_steps_core::ResponseError;
use jsonapi_steps_core::ResponseSnapshot;
use jsonapi_steps_core::ResponseSource;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default maximum response body size in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// User agent sent with every request.
const USER_AGENT: &str = concat!("jsonapi-steps/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Config
// ============================================================================

/// HTTP driver configuration.
///
/// # Invariants
/// - `base_url` uses the `http` or `https` scheme.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDriverConfig {
    /// Base URL that request paths are joined to.
    pub base_url: Url,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
}

impl HttpDriverConfig {
    /// Creates a configuration with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError::InvalidUrl`] when `base_url` does not parse
    /// or is not `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self, HttpDriverError> {
        let base_url =
            Url::parse(base_url).map_err(|err| HttpDriverError::InvalidUrl(err.to_string()))?;
        validate_scheme(&base_url)?;
        Ok(Self {
            base_url,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP driver errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpDriverError {
    /// The base URL or a request path is not a valid URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// A header name or value is invalid.
    #[error("invalid header `{0}`")]
    InvalidHeader(String),
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Client(String),
    /// The request failed in transport.
    #[error("http request failed: {0}")]
    Request(String),
    /// The response body exceeded the configured limit.
    #[error("http response exceeds size limit of {max_bytes} bytes")]
    TooLarge {
        /// Configured limit.
        max_bytes: usize,
    },
    /// The response body could not be read or is not UTF-8.
    #[error("http response body unreadable: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Blocking HTTP test driver.
#[derive(Debug)]
pub struct HttpDriver {
    /// Driver configuration.
    config: HttpDriverConfig,
    /// Shared blocking client.
    client: Client,
    /// Headers sent with every request.
    headers: HeaderMap,
    /// Last fully read response.
    last: Option<ResponseSnapshot>,
}

impl HttpDriver {
    /// Builds a driver for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError`] when the configuration is invalid or the
    /// client cannot be built.
    pub fn new(config: HttpDriverConfig) -> Result<Self, HttpDriverError> {
        validate_scheme(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| HttpDriverError::Client(err.to_string()))?;
        Ok(Self {
            config,
            client,
            headers: HeaderMap::new(),
            last: None,
        })
    }

    /// Returns the driver configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpDriverConfig {
        &self.config
    }

    /// Sets a header sent with every following request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError::InvalidHeader`] for invalid names or values.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HttpDriverError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpDriverError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| HttpDriverError::InvalidHeader(name.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    /// Stops sending a header.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Resolves a request path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError::InvalidUrl`] when the path does not join.
    pub fn url_for(&self, path: &str) -> Result<Url, HttpDriverError> {
        self.config.base_url.join(path).map_err(|err| HttpDriverError::InvalidUrl(err.to_string()))
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError`] when the request or body read fails.
    pub fn get(&mut self, path: &str) -> Result<&ResponseSnapshot, HttpDriverError> {
        self.send(Method::GET, path, None)
    }

    /// Sends a `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError`] when the request or body read fails.
    pub fn post(&mut self, path: &str, body: &str) -> Result<&ResponseSnapshot, HttpDriverError> {
        self.send(Method::POST, path, Some(body))
    }

    /// Sends a `DELETE` request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError`] when the request or body read fails.
    pub fn delete(&mut self, path: &str) -> Result<&ResponseSnapshot, HttpDriverError> {
        self.send(Method::DELETE, path, None)
    }

    /// Sends a request and records the response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpDriverError`] when the request or body read fails; the
    /// previous response is kept in that case.
    pub fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<&ResponseSnapshot, HttpDriverError> {
        let url = self.url_for(path)?;
        let mut request = self.client.request(method, url).headers(self.headers.clone());
        if let Some(body) = body {
            if !self.headers.contains_key(CONTENT_TYPE) {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body.to_string());
        }
        let mut response =
            request.send().map_err(|err| HttpDriverError::Request(err.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;
        let body = String::from_utf8(bytes).map_err(|err| HttpDriverError::Body(err.to_string()))?;
        Ok(&*self.last.insert(ResponseSnapshot {
            status,
            content_type,
            body,
        }))
    }
}

impl ResponseSource for HttpDriver {
    fn last_response(&self) -> Result<&ResponseSnapshot, ResponseError> {
        self.last.as_ref().ok_or(ResponseError::NoResponse)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects base URLs that are not `http` or `https`.
fn validate_scheme(url: &Url) -> Result<(), HttpDriverError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(HttpDriverError::InvalidUrl(format!("unsupported scheme `{other}`"))),
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, HttpDriverError> {
    let too_large = HttpDriverError::TooLarge {
        max_bytes,
    };
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| HttpDriverError::Body("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(too_large);
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| HttpDriverError::Body(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(too_large);
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
