//! Integration tests for the receive worker pool
//!
//! These tests verify:
//! - Workers long-poll concurrently and publish every delivery
//! - Receive errors are published, not swallowed
//! - Stop returns once every worker has exited

mod common;

use common::{error_body, message_body, queue, signed, xml_response};
use mqs_client::{ErrorKind, ReceiveOutputs, ReceiveWorkerPool, WorkerPoolConfig};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer};

/// Verify several workers deliver messages and all stop cleanly.
#[tokio::test]
async fn test_pool_delivers_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/messages"))
        .and(query_param("waitseconds", "1"))
        .and(signed())
        .respond_with(xml_response(
            200,
            message_body("msg-1", "handle-1", "aGVsbG8gd29ybGQ="),
        ))
        .mount(&server)
        .await;

    let config = WorkerPoolConfig::default()
        .with_workers(2)
        .with_wait_seconds(1)
        .with_stop_timeout(Duration::from_secs(5));
    let pool = ReceiveWorkerPool::new(queue(&server, "orders"), config).unwrap();
    let (outputs, mut messages, errors) = ReceiveOutputs::bounded(4);

    pool.start(outputs).unwrap();
    assert!(pool.is_running());

    for _ in 0..3 {
        let message = tokio::time::timeout(Duration::from_secs(5), messages.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.body_text(), "hello world");
    }

    // Release workers blocked on a full channel
    drop(messages);
    drop(errors);
    let report = pool.stop().await;
    assert_eq!(report.stopped, 2);
    assert_eq!(report.abandoned, 0);
}

/// Verify an empty queue produces MessageNotExist errors on the error channel.
#[tokio::test]
async fn test_pool_publishes_receive_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/messages"))
        .and(signed())
        .respond_with(
            xml_response(404, error_body("MessageNotExist", "Message not exist."))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;

    let config = WorkerPoolConfig::default()
        .with_workers(1)
        .with_stop_timeout(Duration::from_secs(5));
    let pool = ReceiveWorkerPool::new(queue(&server, "orders"), config).unwrap();
    let (outputs, messages, mut errors) = ReceiveOutputs::bounded(4);

    pool.start(outputs).unwrap();

    let error = tokio::time::timeout(Duration::from_secs(5), errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(error.kind(), Some(ErrorKind::MessageNotExist));

    drop(messages);
    drop(errors);
    let report = pool.stop().await;
    assert_eq!(report.stopped, 1);
}

/// Verify batch mode publishes each message of a batch.
#[tokio::test]
async fn test_pool_batch_mode() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/messages"))
        .and(query_param("numOfMessages", "2"))
        .and(signed())
        .respond_with(xml_response(
            200,
            r#"<Messages>
  <Message><MessageId>a</MessageId><ReceiptHandle>ha</ReceiptHandle><MessageBody>b25l</MessageBody></Message>
  <Message><MessageId>b</MessageId><ReceiptHandle>hb</ReceiptHandle><MessageBody>dHdv</MessageBody></Message>
</Messages>"#,
        ))
        .mount(&server)
        .await;

    let config = WorkerPoolConfig::default()
        .with_workers(1)
        .with_batch_size(2)
        .with_stop_timeout(Duration::from_secs(5));
    let pool = ReceiveWorkerPool::new(queue(&server, "orders"), config).unwrap();
    let (outputs, mut messages, errors) = ReceiveOutputs::bounded(8);

    pool.start(outputs).unwrap();

    let first = messages.recv().await.unwrap();
    let second = messages.recv().await.unwrap();
    assert_eq!(first.message_id, "a");
    assert_eq!(second.message_id, "b");

    drop(messages);
    drop(errors);
    let report = pool.stop().await;
    assert_eq!(report.abandoned, 0);
}

/// Verify receive returns once the consumer closes its channels.
#[tokio::test]
async fn test_receive_returns_when_outputs_close() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/messages"))
        .respond_with(xml_response(
            200,
            message_body("msg-1", "handle-1", "aGVsbG8gd29ybGQ="),
        ))
        .mount(&server)
        .await;

    let config = WorkerPoolConfig::default().with_workers(2);
    let pool = ReceiveWorkerPool::new(queue(&server, "orders"), config).unwrap();
    let (outputs, messages, errors) = ReceiveOutputs::bounded(1);
    drop(messages);
    drop(errors);

    tokio::time::timeout(Duration::from_secs(5), pool.receive(outputs))
        .await
        .unwrap()
        .unwrap();
}
