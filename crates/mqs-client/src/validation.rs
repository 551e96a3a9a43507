//! Range checks applied before any request is issued.
//!
//! Every check runs locally; a value outside its range never reaches the
//! network.

use crate::error::ValidationError;
use crate::message::QueueAttributes;
use std::ops::RangeInclusive;

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;

/// Allowed `DelaySeconds` for queues
pub const DELAY_SECONDS: RangeInclusive<u32> = 0..=60480;
/// Allowed `MaxMessageSize`, in bytes
pub const MAX_MESSAGE_SIZE: RangeInclusive<u32> = 1024..=65536;
/// Allowed `MessageRetentionPeriod`, in seconds
pub const MESSAGE_RETENTION_PERIOD: RangeInclusive<u32> = 60..=129600;
/// Allowed `VisibilityTimeout`, in seconds
pub const VISIBILITY_TIMEOUT: RangeInclusive<u32> = 1..=43200;
/// Allowed `PollingWaitSeconds` and receive `waitseconds`
pub const POLLING_WAIT_SECONDS: RangeInclusive<u32> = 0..=30;
/// Allowed page size of a queue listing
pub const LIST_RET_NUMBER: RangeInclusive<u32> = 1..=1000;
/// Allowed number of messages in one batch receive
pub const BATCH_RECEIVE_SIZE: RangeInclusive<u32> = 1..=16;

/// Batch receive size used when none is given
pub const DEFAULT_BATCH_RECEIVE_SIZE: u32 = 16;

/// Check that `value` lies in `range`
pub fn check_range(
    field: &str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        return Ok(());
    }

    Err(ValidationError::OutOfRange {
        field: field.to_string(),
        value: i64::from(value),
        min: i64::from(*range.start()),
        max: i64::from(*range.end()),
    })
}

pub fn check_visibility_timeout(seconds: u32) -> Result<(), ValidationError> {
    check_range("VisibilityTimeout", seconds, &VISIBILITY_TIMEOUT)
}

pub fn check_wait_seconds(seconds: u32) -> Result<(), ValidationError> {
    check_range("waitseconds", seconds, &POLLING_WAIT_SECONDS)
}

pub fn check_batch_receive_size(count: u32) -> Result<(), ValidationError> {
    check_range("numOfMessages", count, &BATCH_RECEIVE_SIZE)
}

pub fn check_ret_number(count: u32) -> Result<(), ValidationError> {
    check_range("RetNumber", count, &LIST_RET_NUMBER)
}

/// Check every attribute of a queue definition
pub fn check_queue_attributes(attributes: &QueueAttributes) -> Result<(), ValidationError> {
    check_range("DelaySeconds", attributes.delay_seconds, &DELAY_SECONDS)?;
    check_range(
        "MaxMessageSize",
        attributes.max_message_size,
        &MAX_MESSAGE_SIZE,
    )?;
    check_range(
        "MessageRetentionPeriod",
        attributes.message_retention_period,
        &MESSAGE_RETENTION_PERIOD,
    )?;
    check_visibility_timeout(attributes.visibility_timeout)?;
    check_range(
        "PollingWaitSeconds",
        attributes.polling_wait_seconds,
        &POLLING_WAIT_SECONDS,
    )
}
