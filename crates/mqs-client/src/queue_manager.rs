//! Queue administration: create, update, inspect, delete and list queues.
//!
//! Attribute values are range checked before any request is issued. Queue
//! management calls go to the owner's regional endpoint, see
//! [`location_endpoint`].

use crate::config::ClientConfig;
use crate::error::{MqsError, ValidationError};
use crate::message::{QueueAttributeResponse, QueueAttributes, QueueName, Queues};
use crate::signer::Method;
use crate::transport::{MqsClient, Request, Transport};
use crate::validation::{check_queue_attributes, check_ret_number};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[cfg(test)]
#[path = "queue_manager_tests.rs"]
mod tests;

/// Header carrying the listing continuation marker
pub const MARKER_HEADER: &str = "x-mqs-marker";
/// Header carrying the listing page size
pub const RET_NUMBER_HEADER: &str = "x-mqs-ret-number";
/// Header carrying the listing name prefix
pub const PREFIX_HEADER: &str = "x-mqs-prefix";

/// Region hosting a queue owner's endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Beijing,
    Hangzhou,
    Qingdao,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beijing => "beijing",
            Self::Hangzhou => "hangzhou",
            Self::Qingdao => "qingdao",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beijing" => Ok(Self::Beijing),
            "hangzhou" => Ok(Self::Hangzhou),
            "qingdao" => Ok(Self::Qingdao),
            other => Err(ValidationError::InvalidFormat {
                field: "location".to_string(),
                message: format!(
                    "unknown location '{}', expected beijing, hangzhou or qingdao",
                    other
                ),
            }),
        }
    }
}

/// Endpoint serving queue management for `owner_id` in `location`
pub fn location_endpoint(owner_id: &str, location: Location) -> String {
    format!("http://{}.mqs-cn-{}.aliyuncs.com", owner_id.trim(), location)
}

/// Result of [`QueueManager::create_queue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCreation {
    /// A new queue was created
    Created,
    /// A queue with this name and identical attributes already exists
    AlreadyExists,
}

/// Paging and filtering for [`QueueManager::list_queues`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQueuesOptions {
    /// Continue after this marker (the `next_marker` of a previous page)
    pub marker: Option<String>,
    /// Page size, 1..=1000
    pub ret_number: Option<u32>,
    /// Only list queues whose name starts with this prefix
    pub prefix: Option<String>,
}

impl ListQueuesOptions {
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_ret_number(mut self, ret_number: u32) -> Self {
        self.ret_number = Some(ret_number);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Administrative client for the queues of one owner
#[derive(Clone)]
pub struct QueueManager {
    transport: Arc<dyn Transport>,
}

impl QueueManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build a manager talking to the owner's regional endpoint.
    ///
    /// The endpoint in `config` is replaced; credentials, timeouts and proxy
    /// are kept.
    pub fn for_location(
        owner_id: &str,
        location: Location,
        config: ClientConfig,
    ) -> Result<Self, MqsError> {
        if owner_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "owner_id".to_string(),
            }
            .into());
        }

        let config = config.with_endpoint(location_endpoint(owner_id, location));
        let client = MqsClient::new(&config)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Create a queue.
    ///
    /// Returns [`QueueCreation::AlreadyExists`] when the service reports the
    /// queue already exists with the same attributes. A queue that exists
    /// with different attributes is a `QueueAlreadyExist` service error.
    pub async fn create_queue(
        &self,
        name: &QueueName,
        attributes: &QueueAttributes,
    ) -> Result<QueueCreation, MqsError> {
        check_queue_attributes(attributes)?;

        let request = Request::new(Method::Put, name.as_str()).with_xml_body(attributes)?;
        let response = self.transport.send(request).await?;

        let creation = if response.status() == 204 {
            QueueCreation::AlreadyExists
        } else {
            QueueCreation::Created
        };

        info!(queue = %name, result = ?creation, "Queue create request completed");
        Ok(creation)
    }

    /// Overwrite the attributes of an existing queue
    pub async fn set_queue_attributes(
        &self,
        name: &QueueName,
        attributes: &QueueAttributes,
    ) -> Result<(), MqsError> {
        check_queue_attributes(attributes)?;

        let request = Request::new(Method::Put, format!("{}?metaoverride=true", name))
            .with_xml_body(attributes)?;
        self.transport.send(request).await?;

        info!(queue = %name, "Queue attributes updated");
        Ok(())
    }

    pub async fn get_queue_attributes(
        &self,
        name: &QueueName,
    ) -> Result<QueueAttributeResponse, MqsError> {
        self.transport
            .send(Request::new(Method::Get, name.as_str()))
            .await?
            .decode()
    }

    pub async fn delete_queue(&self, name: &QueueName) -> Result<(), MqsError> {
        self.transport
            .send(Request::new(Method::Delete, name.as_str()))
            .await?;

        info!(queue = %name, "Queue deleted");
        Ok(())
    }

    /// List one page of queues.
    ///
    /// Blank markers and prefixes are not sent.
    pub async fn list_queues(&self, options: &ListQueuesOptions) -> Result<Queues, MqsError> {
        let mut request = Request::new(Method::Get, "");

        if let Some(marker) = non_blank(&options.marker) {
            request = request.with_header(MARKER_HEADER, marker);
        }

        if let Some(ret_number) = options.ret_number {
            check_ret_number(ret_number)?;
            request = request.with_header(RET_NUMBER_HEADER, ret_number.to_string());
        }

        if let Some(prefix) = non_blank(&options.prefix) {
            request = request.with_header(PREFIX_HEADER, prefix);
        }

        let response = self.transport.send(request).await?;
        if response.body().is_empty() {
            return Ok(Queues::default());
        }
        response.decode()
    }
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager").finish_non_exhaustive()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
