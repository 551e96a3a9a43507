//! Request signing for the MQS REST protocol.
//!
//! Every request is signed with HMAC-SHA1 over a canonical string built from
//! the request method, a handful of standard headers, the `x-mqs-*` headers
//! and the resource path:
//!
//! ```text
//! METHOD
//! Content-MD5
//! Content-Type
//! Date
//! x-mqs-a:1
//! x-mqs-b:2
//! /queue/messages?waitseconds=10
//! ```
//!
//! Missing standard headers contribute an empty line. The `x-mqs-*` lines are
//! sorted so that the signature does not depend on header insertion order.
//! The digest is base64-encoded and sent as
//! `Authorization: MQS <access key id>:<signature>`.

use crate::error::SigningError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(test)]
#[path = "signer_tests.rs"]
mod tests;

/// `Authorization` header name
pub const AUTHORIZATION: &str = "Authorization";
/// `Content-Type` header name
pub const CONTENT_TYPE: &str = "Content-Type";
/// `Content-MD5` header name
pub const CONTENT_MD5: &str = "Content-MD5";
/// `Date` header name
pub const DATE: &str = "Date";
/// Protocol version header name
pub const MQS_VERSION: &str = "x-mqs-version";
/// Prefix of headers that take part in the signature
pub const MQS_HEADER_PREFIX: &str = "x-mqs-";
/// Scheme used in the `Authorization` header
pub const AUTHORIZATION_SCHEME: &str = "MQS";

/// Request headers, keyed case-sensitively
pub type Headers = BTreeMap<String, String>;

type HmacSha1 = Hmac<Sha1>;

/// HTTP methods used by the MQS protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Get the method as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Build the exact string that is signed for a request
pub fn canonical_string(method: Method, headers: &Headers, resource: &str) -> String {
    let header = |name: &str| headers.get(name).map(String::as_str).unwrap_or("");

    let mut mqs_headers = headers
        .iter()
        .filter(|(key, _)| key.starts_with(MQS_HEADER_PREFIX))
        .map(|(key, value)| format!("{}:{}", key, value.trim()))
        .collect::<Vec<_>>();
    mqs_headers.sort();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.as_str(),
        header(CONTENT_MD5),
        header(CONTENT_TYPE),
        header(DATE),
        mqs_headers.join("\n"),
        resource
    )
}

/// Secret half of an access key pair.
///
/// Owned by exactly one client; the secret is wiped from memory on drop and
/// never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    access_key_secret: String,
}

impl Credential {
    /// Create a credential from an access key secret
    pub fn new(access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_secret: access_key_secret.into(),
        }
    }

    /// Replace the secret key
    pub fn set_secret_key(&mut self, access_key_secret: impl Into<String>) {
        self.access_key_secret.zeroize();
        self.access_key_secret = access_key_secret.into();
    }

    /// Sign a request.
    ///
    /// `resource` is the path as signed by the server, including the leading
    /// `/` and any query string.
    ///
    /// # Errors
    ///
    /// Returns `SigningError` if the HMAC cannot be initialised with the key.
    pub fn sign(
        &self,
        method: Method,
        headers: &Headers,
        resource: &str,
    ) -> Result<String, SigningError> {
        let string_to_sign = canonical_string(method, headers, resource);

        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes()).map_err(|e| {
            SigningError::InvalidKey {
                message: e.to_string(),
            }
        })?;
        mac.update(string_to_sign.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_secret", &"<REDACTED>")
            .finish()
    }
}
