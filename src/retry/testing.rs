//! Scripted transport for exercising the retry loop without a network

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Request, Response};
use tokio::time::Instant;

use super::Transport;
use crate::error::BoxError;

/// One scripted reply
pub(crate) enum Reply {
    Status(u16, Vec<(&'static str, String)>, String),
    Fail(&'static str),
}

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        Reply::Status(status, Vec::new(), String::new())
    }

    pub(crate) fn json(status: u16, body: &str) -> Self {
        Reply::Status(status, Vec::new(), body.to_string())
    }

    pub(crate) fn with_header(self, name: &'static str, value: impl Into<String>) -> Self {
        match self {
            Reply::Status(status, mut headers, body) => {
                headers.push((name, value.into()));
                Reply::Status(status, headers, body)
            }
            fail => fail,
        }
    }
}

/// What the transport saw for one call
pub(crate) struct SeenRequest {
    pub(crate) at: Instant,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
}

/// Transport that replays a fixed list of replies and records every call
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    /// Offsets of every call from the first one
    pub(crate) fn call_offsets(&self) -> Vec<std::time::Duration> {
        let seen = self.seen.lock();
        let Some(first) = seen.first().map(|s| s.at) else {
            return Vec::new();
        };
        seen.iter().map(|s| s.at - first).collect()
    }

    pub(crate) fn request_headers(&self, index: usize) -> HeaderMap {
        self.seen.lock()[index].headers.clone()
    }

    pub(crate) fn request_url(&self, index: usize) -> String {
        self.seen.lock()[index].url.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, BoxError> {
        self.seen.lock().push(SeenRequest {
            at: Instant::now(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
        });

        let reply = self
            .replies
            .lock()
            .pop_front()
            .ok_or("scripted transport ran out of replies")?;

        match reply {
            Reply::Fail(message) => Err(message.into()),
            Reply::Status(status, headers, body) => {
                let mut builder = http::Response::builder().status(status);
                for (name, value) in headers {
                    builder = builder.header(name, value);
                }
                Ok(Response::from(builder.body(body)?))
            }
        }
    }
}
