//! Common test utilities for MQS integration tests
//!
//! This module provides:
//! - A wiremock matcher that verifies request signatures
//! - Client and queue constructors pointed at a mock server
//! - XML response fixtures

use mqs_client::signer::{self, Credential, Headers, Method};
use mqs_client::{ClientConfig, MqsClient, MqsQueue, QueueName};
use std::sync::Arc;
use wiremock::{Match, MockServer, Request};

pub const ACCESS_KEY_ID: &str = "integration-id";
pub const ACCESS_KEY_SECRET: &str = "integration-secret";

// ============================================================================
// Signature Verification
// ============================================================================

/// Matches only requests whose `Authorization` header verifies against
/// `secret`, recomputed from the request as received.
pub struct SignedBy {
    access_key_id: String,
    credential: Credential,
}

#[allow(dead_code)]
pub fn signed_by(access_key_id: &str, secret: &str) -> SignedBy {
    SignedBy {
        access_key_id: access_key_id.to_string(),
        credential: Credential::new(secret),
    }
}

#[allow(dead_code)]
pub fn signed() -> SignedBy {
    signed_by(ACCESS_KEY_ID, ACCESS_KEY_SECRET)
}

impl Match for SignedBy {
    fn matches(&self, request: &Request) -> bool {
        let Some(method) = wire_method(request.method.as_str()) else {
            return false;
        };

        let mut headers = Headers::new();
        for (name, value) in request.headers.iter() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let key = match name.as_str() {
                "content-md5" => signer::CONTENT_MD5.to_string(),
                "content-type" => signer::CONTENT_TYPE.to_string(),
                "date" => signer::DATE.to_string(),
                other if other.starts_with(signer::MQS_HEADER_PREFIX) => other.to_string(),
                _ => continue,
            };
            headers.insert(key, value.to_string());
        }

        let mut resource = request.url.path().to_string();
        if let Some(query) = request.url.query() {
            resource = format!("{}?{}", resource, query);
        }

        let Ok(signature) = self.credential.sign(method, &headers, &resource) else {
            return false;
        };
        let expected = format!(
            "{} {}:{}",
            signer::AUTHORIZATION_SCHEME,
            self.access_key_id,
            signature
        );

        request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|actual| actual == expected)
    }
}

fn wire_method(method: &str) -> Option<Method> {
    match method {
        "GET" => Some(Method::Get),
        "PUT" => Some(Method::Put),
        "POST" => Some(Method::Post),
        "DELETE" => Some(Method::Delete),
        _ => None,
    }
}

/// Matches the query string exactly as it appeared on the request line
#[allow(dead_code)]
pub struct RawQuery(pub &'static str);

impl Match for RawQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0)
    }
}

// ============================================================================
// Client Helpers
// ============================================================================

#[allow(dead_code)]
pub fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .endpoint(server.uri())
        .access_key_id(ACCESS_KEY_ID)
        .access_key_secret(ACCESS_KEY_SECRET)
        .timeout_seconds(5)
        .build()
}

#[allow(dead_code)]
pub fn queue(server: &MockServer, name: &str) -> MqsQueue {
    let client = MqsClient::new(&client_config(server)).unwrap();
    MqsQueue::new(QueueName::new(name).unwrap(), Arc::new(client))
}

// ============================================================================
// Fixtures
// ============================================================================

#[allow(dead_code)]
pub fn error_body(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Error xmlns="http://mqs.aliyuncs.com/doc/v1">
  <Code>{}</Code>
  <Message>{}</Message>
  <RequestId>5F2A2A4B7C00AA</RequestId>
  <HostId>http://1234.mqs-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#,
        code, message
    )
}

#[allow(dead_code)]
pub fn message_body(message_id: &str, receipt_handle: &str, encoded_body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Message xmlns="http://mqs.aliyuncs.com/doc/v1">
  <MessageId>{}</MessageId>
  <ReceiptHandle>{}</ReceiptHandle>
  <MessageBodyMD5>5EB63BBBE01EEED093CB22BB8F5ACDC3</MessageBodyMD5>
  <MessageBody>{}</MessageBody>
  <EnqueueTime>1250700979248</EnqueueTime>
  <NextVisibleTime>1250700799348</NextVisibleTime>
  <FirstDequeueTime>1250700779318</FirstDequeueTime>
  <DequeueCount>1</DequeueCount>
  <Priority>8</Priority>
</Message>"#,
        message_id, receipt_handle, encoded_body
    )
}

#[allow(dead_code)]
pub fn xml_response(status: u16, body: impl Into<String>) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(status)
        .insert_header("Content-Type", "text/xml;charset=utf-8")
        .set_body_string(body.into())
}
