//! # MQS Client
//!
//! Client for the MQS hosted message queue service, which is reachable only
//! over signed HTTP requests carrying XML bodies.
//!
//! This library provides:
//! - Request signing and a pluggable HTTP transport
//! - Classification of server error codes into a structured taxonomy
//! - Single-shot queue message operations, including batch variants
//! - A pool of concurrent long-polling receivers with bounded shutdown
//! - Queue administration with attribute range validation
//!
//! ## Module Organization
//!
//! - [`error`] - Error types and the server error code table
//! - [`message`] - XML wire types, queue names and receipt handles
//! - [`signer`] - Canonical string construction and HMAC-SHA1 signing
//! - [`transport`] - The `Transport` trait and its HTTP implementation
//! - [`queue`] - Message operations on one queue
//! - [`worker_pool`] - Concurrent long-poll receive pool
//! - [`queue_manager`] - Queue create, update, inspect, delete and list
//! - [`config`] - Client configuration
//! - [`validation`] - Range checks applied before requests are issued
//!
//! ## Example
//!
//! ```no_run
//! use mqs_client::{ClientConfig, MessageSendRequest, MqsClient, MqsQueue, QueueName};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mqs_client::MqsError> {
//! let config = ClientConfig::default()
//!     .with_endpoint("http://1234.mqs-cn-hangzhou.aliyuncs.com")
//!     .with_credentials("access-key-id", "access-key-secret");
//!
//! let client = Arc::new(MqsClient::new(&config)?);
//! let queue = MqsQueue::new(QueueName::new("orders")?, client);
//!
//! let sent = queue.send_message(&MessageSendRequest::new("hello")).await?;
//! println!("sent {}", sent.message_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod queue;
pub mod queue_manager;
pub mod signer;
pub mod transport;
pub mod validation;
pub mod worker_pool;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{
    ConfigurationError, ErrorKind, MqsError, ServiceError, SigningError, ValidationError,
};
pub use message::{
    BatchMessageReceiveResponse, BatchMessageSendResponse, MessageReceiveResponse,
    MessageSendRequest, MessageSendResponse, MessageVisibilityChangeResponse, QueueAttributeResponse,
    QueueAttributes, QueueName, QueueUrl, Queues, ReceiptHandle, XmlRoot,
};
pub use queue::{MqsQueue, ReceiveOptions};
pub use queue_manager::{ListQueuesOptions, Location, QueueCreation, QueueManager};
pub use signer::{Credential, Method};
pub use transport::{MqsClient, Request, Response, Transport};
pub use worker_pool::{ReceiveOutputs, ReceiveWorkerPool, StopReport, WorkerPoolConfig};
