//! Tests for queue message operations.

use super::*;
use crate::error::{ErrorKind, ValidationError};
use crate::testing::{MockTransport, MESSAGE_NOT_EXIST_BODY, RECEIVED_MESSAGE_BODY};

fn queue_with(transport: Arc<MockTransport>) -> MqsQueue {
    MqsQueue::new(QueueName::new("orders").unwrap(), transport)
}

fn body_text(request: &Request) -> String {
    String::from_utf8(request.body().to_vec()).unwrap()
}

// ============================================================================
// Send Tests
// ============================================================================

mod send_tests {
    use super::*;

    #[tokio::test]
    async fn test_send_message_posts_encoded_body() {
        let transport = MockTransport::respond(
            201,
            "<Message><MessageId>m-1</MessageId><MessageBodyMD5>ABC</MessageBodyMD5></Message>",
        );
        let queue = queue_with(transport.clone());

        let response = queue
            .send_message(&MessageSendRequest::new("hello world").with_delay_seconds(5))
            .await
            .unwrap();

        assert_eq!(response.message_id, "m-1");
        assert_eq!(response.message_body_md5, "ABC");

        let request = transport.last_request();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.resource(), "orders/messages");
        let body = body_text(&request);
        assert!(body.contains("<MessageBody>aGVsbG8gd29ybGQ=</MessageBody>"));
        assert!(body.contains("<DelaySeconds>5</DelaySeconds>"));
    }

    #[tokio::test]
    async fn test_batch_send_wraps_messages() {
        let transport = MockTransport::respond(
            201,
            "<Messages>\
               <Message><MessageId>a</MessageId><MessageBodyMD5>1</MessageBodyMD5></Message>\
               <Message><MessageId>b</MessageId><MessageBodyMD5>2</MessageBodyMD5></Message>\
             </Messages>",
        );
        let queue = queue_with(transport.clone());

        let response = queue
            .batch_send_message(vec![
                MessageSendRequest::new("one"),
                MessageSendRequest::new("two"),
            ])
            .await
            .unwrap();

        let ids: Vec<_> = response.messages.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let body = body_text(&transport.last_request());
        assert!(body.starts_with("<Messages><Message>"));
        assert_eq!(body.matches("<Message>").count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_send_makes_no_request() {
        let transport = MockTransport::respond(500, "");
        let queue = queue_with(transport.clone());

        let response = queue.batch_send_message(Vec::new()).await.unwrap();

        assert!(response.messages.is_empty());
        assert_eq!(transport.request_count(), 0);
    }
}

// ============================================================================
// Receive And Peek Tests
// ============================================================================

mod receive_tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_without_wait() {
        let transport = MockTransport::respond(200, RECEIVED_MESSAGE_BODY);
        let queue = queue_with(transport.clone());

        let message = queue
            .receive_message(&ReceiveOptions::default())
            .await
            .unwrap();

        assert_eq!(message.body_text(), "hello world");
        assert_eq!(
            message.receipt_handle.as_str(),
            "1-ODU4OTkzNDU5My0xNDMyNzI3ODI3LTItOA=="
        );
        assert_eq!(message.dequeue_count, 1);
        assert_eq!(transport.last_request().resource(), "orders/messages");
        assert_eq!(transport.last_request().method(), Method::Get);
    }

    #[tokio::test]
    async fn test_receive_with_wait_seconds() {
        let transport = MockTransport::respond(200, RECEIVED_MESSAGE_BODY);
        let queue = queue_with(transport.clone());

        queue
            .receive_message(&ReceiveOptions::with_wait_seconds(10))
            .await
            .unwrap();

        assert_eq!(
            transport.last_request().resource(),
            "orders/messages?waitseconds=10"
        );
    }

    #[tokio::test]
    async fn test_receive_rejects_long_wait_before_sending() {
        let transport = MockTransport::respond(200, RECEIVED_MESSAGE_BODY);
        let queue = queue_with(transport.clone());

        let error = queue
            .receive_message(&ReceiveOptions::with_wait_seconds(31))
            .await
            .unwrap_err();

        assert!(matches!(error, MqsError::Validation(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_receive_on_empty_queue_is_service_error() {
        let transport = MockTransport::respond(404, MESSAGE_NOT_EXIST_BODY);
        let queue = queue_with(transport);

        let error = queue
            .receive_message(&ReceiveOptions::with_wait_seconds(1))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), Some(ErrorKind::MessageNotExist));
    }

    #[tokio::test]
    async fn test_batch_receive_defaults_to_sixteen() {
        let transport = MockTransport::respond(200, "<Messages></Messages>");
        let queue = queue_with(transport.clone());

        let response = queue
            .batch_receive_message(None, &ReceiveOptions::default())
            .await
            .unwrap();

        assert!(response.messages.is_empty());
        assert_eq!(
            transport.last_request().resource(),
            "orders/messages?numOfMessages=16"
        );
    }

    #[tokio::test]
    async fn test_batch_receive_with_count_and_wait() {
        let transport = MockTransport::respond(200, "<Messages></Messages>");
        let queue = queue_with(transport.clone());

        queue
            .batch_receive_message(Some(4), &ReceiveOptions::with_wait_seconds(30))
            .await
            .unwrap();

        assert_eq!(
            transport.last_request().resource(),
            "orders/messages?numOfMessages=4&waitseconds=30"
        );
    }

    #[tokio::test]
    async fn test_batch_receive_rejects_oversized_batch() {
        let transport = MockTransport::respond(200, "<Messages></Messages>");
        let queue = queue_with(transport.clone());

        let error = queue
            .batch_receive_message(Some(17), &ReceiveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            MqsError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_peek_is_single_request() {
        let transport = MockTransport::respond(200, RECEIVED_MESSAGE_BODY);
        let queue = queue_with(transport.clone());

        let message = queue.peek_message().await.unwrap();

        assert_eq!(message.body_text(), "hello world");
        assert_eq!(transport.request_count(), 1);
        assert_eq!(
            transport.last_request().resource(),
            "orders/messages?peekonly=true"
        );
    }

    #[tokio::test]
    async fn test_batch_peek_resource() {
        let transport = MockTransport::respond(200, "<Messages></Messages>");
        let queue = queue_with(transport.clone());

        queue.batch_peek_message(Some(2)).await.unwrap();

        assert_eq!(
            transport.last_request().resource(),
            "orders/messages?numOfMessages=2&peekonly=true"
        );
    }

    #[tokio::test]
    async fn test_malformed_receive_body_is_decode_error() {
        let transport = MockTransport::respond(200, "<Message><ReceiptHandle>");
        let queue = queue_with(transport);

        let error = queue
            .receive_message(&ReceiveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, MqsError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_html_receive_body_is_decode_error() {
        let transport = MockTransport::respond(200, "<html><body>captive portal</body></html>");
        let queue = queue_with(transport);

        let error = queue
            .receive_message(&ReceiveOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, MqsError::Decode { .. }));
    }
}

// ============================================================================
// Delete And Visibility Tests
// ============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_sends_receipt_handle_verbatim() {
        let transport = MockTransport::respond(204, "");
        let queue = queue_with(transport.clone());

        queue
            .delete_message(&ReceiptHandle::new("1-abc+/="))
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.method(), Method::Delete);
        assert_eq!(
            request.resource(),
            "orders/messages?ReceiptHandle=1-abc+/="
        );
        assert!(request.body().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_sends_handles() {
        let transport = MockTransport::respond(204, "");
        let queue = queue_with(transport.clone());

        queue
            .batch_delete_message(vec![ReceiptHandle::new("h1"), ReceiptHandle::new("h2")])
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.resource(), "orders/messages");
        assert_eq!(
            body_text(&request),
            "<ReceiptHandles><ReceiptHandle>h1</ReceiptHandle><ReceiptHandle>h2</ReceiptHandle></ReceiptHandles>"
        );
    }

    #[tokio::test]
    async fn test_empty_batch_delete_makes_no_request() {
        let transport = MockTransport::respond(204, "");
        let queue = queue_with(transport.clone());

        queue.batch_delete_message(Vec::new()).await.unwrap();

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_change_visibility() {
        let transport = MockTransport::respond(
            200,
            "<ChangeVisibility><ReceiptHandle>new-handle</ReceiptHandle><NextVisibleTime>1250700979298</NextVisibleTime></ChangeVisibility>",
        );
        let queue = queue_with(transport.clone());

        let response = queue
            .change_message_visibility(&ReceiptHandle::new("old-handle"), 60)
            .await
            .unwrap();

        assert_eq!(response.receipt_handle.as_str(), "new-handle");
        assert_eq!(response.next_visible_time, 1250700979298);

        let request = transport.last_request();
        assert_eq!(request.method(), Method::Put);
        assert_eq!(
            request.resource(),
            "orders/messages?ReceiptHandle=old-handle&VisibilityTimeout=60"
        );
    }

    #[tokio::test]
    async fn test_change_visibility_range_is_inclusive() {
        let transport = MockTransport::respond(
            200,
            "<ChangeVisibility><ReceiptHandle>h</ReceiptHandle><NextVisibleTime>1</NextVisibleTime></ChangeVisibility>",
        );
        let queue = queue_with(transport.clone());
        let handle = ReceiptHandle::new("h");

        for rejected in [0, 43201] {
            let error = queue
                .change_message_visibility(&handle, rejected)
                .await
                .unwrap_err();
            assert!(matches!(error, MqsError::Validation(_)));
        }
        assert_eq!(transport.request_count(), 0);

        for accepted in [1, 43200] {
            assert!(queue
                .change_message_visibility(&handle, accepted)
                .await
                .is_ok());
        }
        assert_eq!(transport.request_count(), 2);
    }
}
