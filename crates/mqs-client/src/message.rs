//! Wire types for the MQS XML protocol and core domain identifiers.
//!
//! Message bodies are always carried base64-encoded (standard alphabet,
//! padded) inside the `MessageBody` element, in both directions.

use crate::error::ValidationError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Maximum queue name length accepted by the service, in bytes
pub const MAX_QUEUE_NAME_LENGTH: usize = 256;

/// Validated queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation.
    ///
    /// Surrounding whitespace is trimmed before the length check.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();

        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "queue_name".to_string(),
            });
        }

        if name.len() > MAX_QUEUE_NAME_LENGTH {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                value: name.len() as i64,
                min: 1,
                max: MAX_QUEUE_NAME_LENGTH as i64,
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque token identifying one in-flight delivery of a message.
///
/// Issued by the server on receive and required to delete a message or
/// change its visibility. The client never inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Wrap a receipt handle returned by the server
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get receipt handle as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReceiptHandle {
    fn from(handle: String) -> Self {
        Self(handle)
    }
}

impl From<&str> for ReceiptHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

// ============================================================================
// Message Wire Types
// ============================================================================

/// Wire type decoded from a response body.
///
/// `ROOT` is the local name of the document element; a body with any other
/// root is rejected before field decoding.
pub trait XmlRoot {
    const ROOT: &'static str;
}

macro_rules! xml_root {
    ($($ty:ty => $root:literal),+ $(,)?) => {
        $(impl XmlRoot for $ty {
            const ROOT: &'static str = $root;
        })+
    };
}

xml_root! {
    ErrorMessageResponse => "Error",
    MessageSendResponse => "Message",
    MessageReceiveResponse => "Message",
    MessageVisibilityChangeResponse => "ChangeVisibility",
    BatchMessageSendResponse => "Messages",
    BatchMessageReceiveResponse => "Messages",
    QueueAttributeResponse => "Queue",
    Queues => "Queues",
}

/// Error body returned with any non-success status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Error", rename_all = "PascalCase")]
pub struct ErrorMessageResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub host_id: String,
}

/// Message to enqueue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "Message", rename_all = "PascalCase")]
pub struct MessageSendRequest {
    #[serde(with = "base64_body")]
    pub message_body: Bytes,
    pub delay_seconds: u32,
    pub priority: u32,
}

impl MessageSendRequest {
    /// Default priority assigned by the service
    pub const DEFAULT_PRIORITY: u32 = 8;

    /// Create a message with no delay and the default priority
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            message_body: body.into(),
            delay_seconds: 0,
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    /// Delay delivery of the message
    pub fn with_delay_seconds(mut self, delay_seconds: u32) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    /// Set the message priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Result of sending a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Message")]
pub struct MessageSendResponse {
    #[serde(rename = "MessageId", default)]
    pub message_id: String,
    #[serde(rename = "MessageBodyMD5", default)]
    pub message_body_md5: String,
}

/// Message delivered by a receive or peek
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Message")]
pub struct MessageReceiveResponse {
    #[serde(rename = "MessageId", default)]
    pub message_id: String,
    #[serde(rename = "ReceiptHandle", default)]
    pub receipt_handle: ReceiptHandle,
    #[serde(rename = "MessageBodyMD5", default)]
    pub message_body_md5: String,
    #[serde(rename = "MessageBody", with = "base64_body", default)]
    pub message_body: Bytes,
    #[serde(rename = "EnqueueTime", default)]
    pub enqueue_time: i64,
    #[serde(rename = "NextVisibleTime", default)]
    pub next_visible_time: i64,
    #[serde(rename = "FirstDequeueTime", default)]
    pub first_dequeue_time: i64,
    #[serde(rename = "DequeueCount", default)]
    pub dequeue_count: i64,
    #[serde(rename = "Priority", default)]
    pub priority: i64,
}

impl MessageReceiveResponse {
    /// Message body as UTF-8 text, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.message_body).into_owned()
    }
}

/// Result of changing a message's visibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ChangeVisibility")]
pub struct MessageVisibilityChangeResponse {
    #[serde(rename = "ReceiptHandle", default)]
    pub receipt_handle: ReceiptHandle,
    #[serde(rename = "NextVisibleTime", default)]
    pub next_visible_time: i64,
}

// ============================================================================
// Batch Wire Types
// ============================================================================

/// Several messages enqueued with one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename = "Messages")]
pub struct BatchMessageSendRequest {
    #[serde(rename = "Message")]
    pub messages: Vec<MessageSendRequest>,
}

/// Result of a batch send, one entry per enqueued message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Messages")]
pub struct BatchMessageSendResponse {
    #[serde(rename = "Message", default)]
    pub messages: Vec<MessageSendResponse>,
}

/// Messages delivered by a batch receive or batch peek
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Messages")]
pub struct BatchMessageReceiveResponse {
    #[serde(rename = "Message", default)]
    pub messages: Vec<MessageReceiveResponse>,
}

/// Receipt handles deleted with one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename = "ReceiptHandles")]
pub struct ReceiptHandles {
    #[serde(rename = "ReceiptHandle")]
    pub receipt_handles: Vec<ReceiptHandle>,
}

// ============================================================================
// Queue Management Wire Types
// ============================================================================

/// Attributes sent when creating a queue or overriding its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Queue", rename_all = "PascalCase")]
pub struct QueueAttributes {
    pub delay_seconds: u32,
    pub max_message_size: u32,
    pub message_retention_period: u32,
    pub visibility_timeout: u32,
    pub polling_wait_seconds: u32,
}

impl Default for QueueAttributes {
    fn default() -> Self {
        Self {
            delay_seconds: 0,
            max_message_size: 65536,
            message_retention_period: 129600,
            visibility_timeout: 30,
            polling_wait_seconds: 0,
        }
    }
}

/// Queue attributes as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Queue", rename_all = "PascalCase", default)]
pub struct QueueAttributeResponse {
    pub queue_name: String,
    pub create_time: i64,
    pub last_modify_time: i64,
    pub delay_seconds: i64,
    pub max_message_size: i64,
    pub message_retention_period: i64,
    pub visibility_timeout: i64,
    pub polling_wait_seconds: i64,
    pub active_messages: i64,
    pub inactive_messages: i64,
    pub delay_messages: i64,
}

/// One entry of a queue listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Queue")]
pub struct QueueUrl {
    #[serde(rename = "QueueURL", default)]
    pub queue_url: String,
}

/// One page of a queue listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Queues")]
pub struct Queues {
    #[serde(rename = "Queue", default)]
    pub queues: Vec<QueueUrl>,
    #[serde(rename = "NextMarker", default)]
    pub next_marker: Option<String>,
}

/// Base64 representation of `MessageBody`
mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map(Bytes::from)
            .map_err(|e| D::Error::custom(format!("MessageBody is not valid base64: {}", e)))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
