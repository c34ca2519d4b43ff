//! Scripted fetcher for strategy and controller tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};

use super::{FetchResponse, Fetcher};
use crate::request::Request;
use swcache_core::Error;

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Respond(u16, &'static str),
    Fail,
    Hang,
}

/// Replies per URL; unscripted URLs fail like an unreachable network.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
    last_body: Mutex<Option<Bytes>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, url: &str, reply: Scripted) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    /// Make every subsequent fetch fail.
    pub(crate) fn go_offline(&self) {
        let mut replies = self.replies.lock().unwrap();
        for reply in replies.values_mut() {
            *reply = Scripted::Fail;
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Body of the most recent request.
    pub(crate) fn last_body(&self) -> Option<Bytes> {
        self.last_body.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = request.body.clone();
        let reply = self.replies.lock().unwrap().get(request.url.as_str()).cloned();

        match reply {
            Some(Scripted::Respond(status, body)) => {
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
                Ok(FetchResponse {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    headers,
                    bytes: Bytes::from_static(body.as_bytes()),
                    fetch_ms: 1,
                })
            }
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Fail) | None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}
