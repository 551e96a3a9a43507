//! Authenticated HTTP transport.
//!
//! [`Transport`] is the seam every queue operation goes through. The
//! production implementation, [`MqsClient`], turns a [`Request`] into one
//! signed HTTP call:
//!
//! 1. the body is serialized to XML when the request is built
//! 2. `Content-MD5`, `Content-Type`, `Date` and `x-mqs-version` are stamped
//! 3. the header set and `"/" + resource` are signed into `Authorization`
//! 4. the request is issued with bounded connect and request timeouts
//! 5. non-success statuses are decoded as an `Error` body and classified
//!
//! Every call is signed independently; nothing is cached between calls and
//! no lock is held across a call, so one client can be shared freely between
//! tasks.
//!
//! ## Content-MD5
//!
//! The header carries base64 of the *hex string* of the body's MD5 digest,
//! not base64 of the raw digest. This is the encoding the targeted service
//! revision verifies.

use crate::config::ClientConfig;
use crate::error::{ConfigurationError, MqsError, ServiceError};
use crate::message::{ErrorMessageResponse, XmlRoot};
use crate::signer::{
    Credential, Headers, Method, AUTHORIZATION, AUTHORIZATION_SCHEME, CONTENT_MD5, CONTENT_TYPE,
    DATE, MQS_VERSION,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

/// Protocol version sent in `x-mqs-version`
pub const API_VERSION: &str = "2014-07-08";

/// Content type of every request body
pub const XML_CONTENT_TYPE: &str = "application/xml";

// ============================================================================
// Request / Response
// ============================================================================

/// A single MQS request, before signing.
///
/// `resource` is the path below the endpoint without a leading `/`,
/// optionally followed by a query string, e.g. `orders/messages?waitseconds=10`.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    headers: Headers,
    resource: String,
    body: Bytes,
}

impl Request {
    /// Create a request with no headers and an empty body
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            headers: Headers::new(),
            resource: resource.into(),
            body: Bytes::new(),
        }
    }

    /// Add a header, replacing any previous value for the same key
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Serialize `message` to XML and use it as the body.
    ///
    /// # Errors
    ///
    /// Returns `MqsError::Marshal` if the message cannot be serialized.
    pub fn with_xml_body<T: Serialize>(mut self, message: &T) -> Result<Self, MqsError> {
        let xml = quick_xml::se::to_string(message).map_err(|e| MqsError::Marshal {
            message: e.to_string(),
        })?;
        self.body = Bytes::from(xml);
        Ok(self)
    }

    /// HTTP method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Headers set by the caller
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Resource path and query, without a leading `/`
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Serialized body
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// A successful (200, 201 or 204) response
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    body: Bytes,
    resource: String,
}

impl Response {
    /// Wrap a successful response
    pub fn new(status: u16, body: impl Into<Bytes>, resource: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            resource: resource.into(),
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw response body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Resource the response belongs to
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Decode the XML body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `MqsError::Decode` if the body is not a valid `T`, including
    /// when the body is empty or its root element is not `T::ROOT`.
    pub fn decode<T: DeserializeOwned + XmlRoot>(&self) -> Result<T, MqsError> {
        let text = std::str::from_utf8(&self.body).map_err(|e| MqsError::Decode {
            resource: self.resource.clone(),
            message: format!("response body is not UTF-8: {}", e),
        })?;

        check_root::<T>(text).map_err(|message| MqsError::Decode {
            resource: self.resource.clone(),
            message,
        })?;

        quick_xml::de::from_str(text).map_err(|e| MqsError::Decode {
            resource: self.resource.clone(),
            message: e.to_string(),
        })
    }
}

/// Issues authenticated requests against the MQS service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sign and issue `request`.
    ///
    /// Returns the response for statuses 200, 201 and 204; every other
    /// status is returned as an error.
    async fn send(&self, request: Request) -> Result<Response, MqsError>;
}

// ============================================================================
// MQS Client
// ============================================================================

/// HTTP implementation of [`Transport`].
///
/// Owns its credential exclusively. Cloning is not supported; share a client
/// between tasks with `Arc`.
pub struct MqsClient {
    http_client: reqwest::Client,
    endpoint: String,
    access_key_id: String,
    credential: Credential,
}

impl MqsClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `MqsError::Configuration` if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, MqsError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout());

        builder = match &config.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                    ConfigurationError::Invalid {
                        message: format!("Invalid proxy '{}': {}", proxy, e),
                    }
                })?;
                builder.proxy(proxy)
            }
            // Ignore HTTP_PROXY and friends; the proxy is configuration only
            None => builder.no_proxy(),
        };

        let http_client = builder.build().map_err(|e| ConfigurationError::Invalid {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_key_id: config.access_key_id.clone(),
            credential: Credential::new(config.access_key_secret.clone()),
        })
    }

    /// Service base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public half of the access key pair
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Replace the secret used to sign subsequent requests
    pub fn set_secret_key(&mut self, access_key_secret: impl Into<String>) {
        self.credential.set_secret_key(access_key_secret);
    }

    /// Build the full header set for `request`, including `Authorization`
    fn signed_headers(&self, request: &Request, now: DateTime<Utc>) -> Result<Headers, MqsError> {
        let mut headers = request.headers().clone();

        headers.insert(CONTENT_MD5.to_string(), content_md5(request.body()));
        headers
            .entry(MQS_VERSION.to_string())
            .or_insert_with(|| API_VERSION.to_string());
        headers
            .entry(CONTENT_TYPE.to_string())
            .or_insert_with(|| XML_CONTENT_TYPE.to_string());
        headers
            .entry(DATE.to_string())
            .or_insert_with(|| http_date(now));

        let signature = self.credential.sign(
            request.method(),
            &headers,
            &format!("/{}", request.resource()),
        )?;
        headers.insert(
            AUTHORIZATION.to_string(),
            format!(
                "{} {}:{}",
                AUTHORIZATION_SCHEME, self.access_key_id, signature
            ),
        );

        Ok(headers)
    }
}

#[async_trait]
impl Transport for MqsClient {
    async fn send(&self, request: Request) -> Result<Response, MqsError> {
        let resource = request.resource().to_string();
        let headers = self.signed_headers(&request, Utc::now())?;
        let url = format!("{}/{}", self.endpoint, resource);

        debug!(
            method = %request.method(),
            resource = %resource,
            body_len = request.body().len(),
            "Sending MQS request"
        );

        let mut builder = self
            .http_client
            .request(request.method().into(), &url)
            .body(request.body().clone());
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let http_request = builder.build().map_err(|e| MqsError::RequestBuild {
            resource: resource.clone(),
            message: e.to_string(),
        })?;

        let response = self.http_client.execute(http_request).await.map_err(|e| {
            warn!(resource = %resource, error = %e, "MQS request failed");
            if e.is_timeout() {
                MqsError::Timeout {
                    resource: resource.clone(),
                    message: e.to_string(),
                }
            } else {
                MqsError::Connection {
                    resource: resource.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| MqsError::ReadBody {
            resource: resource.clone(),
            message: e.to_string(),
        })?;

        debug!(resource = %resource, status = status, "Received MQS response");

        interpret_response(status, body, &resource)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Check if the status is one the service uses for success
pub fn is_success_status(status: u16) -> bool {
    matches!(status, 200 | 201 | 204)
}

/// Split a raw response into success or a classified error
pub(crate) fn interpret_response(
    status: u16,
    body: Bytes,
    resource: &str,
) -> Result<Response, MqsError> {
    if is_success_status(status) {
        return Ok(Response::new(status, body, resource));
    }

    let error_response = std::str::from_utf8(&body)
        .map_err(|e| e.to_string())
        .and_then(|text| {
            check_root::<ErrorMessageResponse>(text)?;
            quick_xml::de::from_str::<ErrorMessageResponse>(text).map_err(|e| e.to_string())
        })
        .map_err(|message| MqsError::ErrorResponseDecode {
            status,
            resource: resource.to_string(),
            message,
        })?;

    let service_error = ServiceError::from_response(error_response, status, resource);
    warn!(
        resource = %resource,
        status = status,
        code = %service_error.code,
        request_id = %service_error.request_id,
        "MQS service returned an error"
    );

    Err(MqsError::Service(service_error))
}

/// Local name of the document element, skipping declarations and comments
fn root_element(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return Some(String::from_utf8_lossy(element.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

fn check_root<T: XmlRoot>(text: &str) -> Result<(), String> {
    match root_element(text) {
        Some(root) if root == T::ROOT => Ok(()),
        Some(root) => Err(format!(
            "expected <{}> root element, found <{}>",
            T::ROOT,
            root
        )),
        None => Err(format!("expected <{}> root element, found none", T::ROOT)),
    }
}

/// `Content-MD5` value: base64 of the lowercase hex MD5 digest
pub(crate) fn content_md5(body: &[u8]) -> String {
    let digest = hex::encode(Md5::digest(body));
    STANDARD.encode(digest.as_bytes())
}

/// RFC 1123 date in GMT, as used by the `Date` header
pub(crate) fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
