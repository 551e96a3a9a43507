//! Message operations on a single queue.
//!
//! Every operation is one signed request through a [`Transport`]. Nothing is
//! retried and nothing loops; continuous consumption lives in
//! [`ReceiveWorkerPool`](crate::worker_pool::ReceiveWorkerPool).

use crate::error::MqsError;
use crate::message::{
    BatchMessageReceiveResponse, BatchMessageSendRequest, BatchMessageSendResponse,
    MessageReceiveResponse, MessageSendRequest, MessageSendResponse,
    MessageVisibilityChangeResponse, QueueName, ReceiptHandle, ReceiptHandles,
};
use crate::signer::Method;
use crate::transport::{Request, Transport};
use crate::validation::{
    check_batch_receive_size, check_visibility_timeout, check_wait_seconds,
    DEFAULT_BATCH_RECEIVE_SIZE,
};
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// Options for a receive call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Long-poll wait in seconds; `None` uses the queue's `PollingWaitSeconds`
    pub wait_seconds: Option<u32>,
}

impl ReceiveOptions {
    /// Long-poll for up to `seconds`
    pub fn with_wait_seconds(seconds: u32) -> Self {
        Self {
            wait_seconds: Some(seconds),
        }
    }
}

/// Handle on one queue.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct MqsQueue {
    name: QueueName,
    transport: Arc<dyn Transport>,
}

impl MqsQueue {
    pub fn new(name: QueueName, transport: Arc<dyn Transport>) -> Self {
        Self { name, transport }
    }

    pub fn name(&self) -> &QueueName {
        &self.name
    }

    fn messages_resource(&self) -> String {
        format!("{}/messages", self.name)
    }

    /// Enqueue one message
    pub async fn send_message(
        &self,
        message: &MessageSendRequest,
    ) -> Result<MessageSendResponse, MqsError> {
        let request =
            Request::new(Method::Post, self.messages_resource()).with_xml_body(message)?;

        let response: MessageSendResponse = self.transport.send(request).await?.decode()?;
        debug!(queue = %self.name, message_id = %response.message_id, "Message sent");
        Ok(response)
    }

    /// Enqueue several messages with one request.
    ///
    /// An empty batch returns an empty response without contacting the
    /// service.
    pub async fn batch_send_message(
        &self,
        messages: Vec<MessageSendRequest>,
    ) -> Result<BatchMessageSendResponse, MqsError> {
        if messages.is_empty() {
            return Ok(BatchMessageSendResponse::default());
        }

        let count = messages.len();
        let request = Request::new(Method::Post, self.messages_resource())
            .with_xml_body(&BatchMessageSendRequest { messages })?;

        let response: BatchMessageSendResponse = self.transport.send(request).await?.decode()?;
        debug!(queue = %self.name, count = count, "Message batch sent");
        Ok(response)
    }

    /// Receive one message, long-polling when `wait_seconds` is set
    pub async fn receive_message(
        &self,
        options: &ReceiveOptions,
    ) -> Result<MessageReceiveResponse, MqsError> {
        let mut resource = self.messages_resource();
        if let Some(wait_seconds) = options.wait_seconds {
            check_wait_seconds(wait_seconds)?;
            resource = format!("{}?waitseconds={}", resource, wait_seconds);
        }

        self.transport
            .send(Request::new(Method::Get, resource))
            .await?
            .decode()
    }

    /// Receive up to `num_of_messages` messages (16 when `None`)
    pub async fn batch_receive_message(
        &self,
        num_of_messages: Option<u32>,
        options: &ReceiveOptions,
    ) -> Result<BatchMessageReceiveResponse, MqsError> {
        let num_of_messages = num_of_messages.unwrap_or(DEFAULT_BATCH_RECEIVE_SIZE);
        check_batch_receive_size(num_of_messages)?;

        let mut resource = format!(
            "{}?numOfMessages={}",
            self.messages_resource(),
            num_of_messages
        );
        if let Some(wait_seconds) = options.wait_seconds {
            check_wait_seconds(wait_seconds)?;
            resource = format!("{}&waitseconds={}", resource, wait_seconds);
        }

        self.transport
            .send(Request::new(Method::Get, resource))
            .await?
            .decode()
    }

    /// Look at the next message without changing its visibility
    pub async fn peek_message(&self) -> Result<MessageReceiveResponse, MqsError> {
        let resource = format!("{}?peekonly=true", self.messages_resource());

        self.transport
            .send(Request::new(Method::Get, resource))
            .await?
            .decode()
    }

    pub async fn batch_peek_message(
        &self,
        num_of_messages: Option<u32>,
    ) -> Result<BatchMessageReceiveResponse, MqsError> {
        let num_of_messages = num_of_messages.unwrap_or(DEFAULT_BATCH_RECEIVE_SIZE);
        check_batch_receive_size(num_of_messages)?;

        let resource = format!(
            "{}?numOfMessages={}&peekonly=true",
            self.messages_resource(),
            num_of_messages
        );

        self.transport
            .send(Request::new(Method::Get, resource))
            .await?
            .decode()
    }

    /// Delete a received message.
    ///
    /// The receipt handle is placed in the query string verbatim, so the
    /// signed resource carries the handle exactly as the server issued it.
    pub async fn delete_message(&self, receipt_handle: &ReceiptHandle) -> Result<(), MqsError> {
        let resource = format!(
            "{}?ReceiptHandle={}",
            self.messages_resource(),
            receipt_handle
        );

        self.transport
            .send(Request::new(Method::Delete, resource))
            .await?;
        debug!(queue = %self.name, "Message deleted");
        Ok(())
    }

    /// Delete several received messages with one request.
    ///
    /// An empty list succeeds without contacting the service.
    pub async fn batch_delete_message(
        &self,
        receipt_handles: Vec<ReceiptHandle>,
    ) -> Result<(), MqsError> {
        if receipt_handles.is_empty() {
            return Ok(());
        }

        let count = receipt_handles.len();
        let request = Request::new(Method::Delete, self.messages_resource())
            .with_xml_body(&ReceiptHandles { receipt_handles })?;

        self.transport.send(request).await?;
        debug!(queue = %self.name, count = count, "Message batch deleted");
        Ok(())
    }

    /// Hide a received message for another `visibility_timeout` seconds.
    ///
    /// The returned response carries the new receipt handle; the old one is
    /// no longer valid.
    pub async fn change_message_visibility(
        &self,
        receipt_handle: &ReceiptHandle,
        visibility_timeout: u32,
    ) -> Result<MessageVisibilityChangeResponse, MqsError> {
        check_visibility_timeout(visibility_timeout)?;

        let resource = format!(
            "{}?ReceiptHandle={}&VisibilityTimeout={}",
            self.messages_resource(),
            receipt_handle,
            visibility_timeout
        );

        self.transport
            .send(Request::new(Method::Put, resource))
            .await?
            .decode()
    }
}

impl std::fmt::Debug for MqsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqsQueue").field("name", &self.name).finish()
    }
}
