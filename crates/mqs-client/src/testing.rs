//! In-process transport for unit tests.

use crate::error::MqsError;
use crate::transport::{interpret_response, Request, Response, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};

type Handler = Box<dyn Fn(&Request) -> Result<Response, MqsError> + Send + Sync>;

/// Transport that records every request and answers through a handler
pub(crate) struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Request) -> Result<Response, MqsError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request with the same status and body
    pub fn respond(status: u16, body: &'static str) -> Arc<Self> {
        Self::new(move |request| {
            interpret_response(status, Bytes::from_static(body.as_bytes()), request.resource())
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Request {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, MqsError> {
        let result = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        result
    }
}

pub(crate) const QUEUE_NOT_EXIST_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error xmlns="http://mqs.aliyuncs.com/doc/v1">
  <Code>QueueNotExist</Code>
  <Message>The queue name you provided is not exist.</Message>
  <RequestId>5F2A2A4B7C0000</RequestId>
  <HostId>http://1234.mqs-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#;

pub(crate) const MESSAGE_NOT_EXIST_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error xmlns="http://mqs.aliyuncs.com/doc/v1">
  <Code>MessageNotExist</Code>
  <Message>Message not exist.</Message>
  <RequestId>5F2A2A4B7C0001</RequestId>
  <HostId>http://1234.mqs-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#;

/// Received message whose body is `hello world`
pub(crate) const RECEIVED_MESSAGE_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Message xmlns="http://mqs.aliyuncs.com/doc/v1">
  <MessageId>5fea7756-0ea4-451a-a703-a558b933e274</MessageId>
  <ReceiptHandle>1-ODU4OTkzNDU5My0xNDMyNzI3ODI3LTItOA==</ReceiptHandle>
  <MessageBodyMD5>5EB63BBBE01EEED093CB22BB8F5ACDC3</MessageBodyMD5>
  <MessageBody>aGVsbG8gd29ybGQ=</MessageBody>
  <EnqueueTime>1250700979248</EnqueueTime>
  <NextVisibleTime>1250700799348</NextVisibleTime>
  <FirstDequeueTime>1250700779318</FirstDequeueTime>
  <DequeueCount>1</DequeueCount>
  <Priority>8</Priority>
</Message>"#;
