//! Scripted in-memory transport used by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetlaunch_types::{Method, TransportError};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;

use crate::transport::{LaunchTransport, ReplyStream};

struct ScriptedStream {
    items: Vec<Result<Value, TransportError>>,
    stall: bool,
}

/// Replays queued replies in order and records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    unary: Mutex<VecDeque<Result<Value, TransportError>>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<(Method, Value)>>,
    released: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

/// Counts streams that have been dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every unary reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_unary(&self, reply: Value) {
        self.unary.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_unary_error(&self, error: TransportError) {
        self.unary.lock().unwrap().push_back(Err(error));
    }

    pub fn push_stream(&self, items: Vec<Result<Value, TransportError>>) {
        self.streams
            .lock()
            .unwrap()
            .push_back(ScriptedStream { items, stall: false });
    }

    /// Queue a stream that never ends after yielding `items`.
    pub fn push_stalled_stream(&self, items: Vec<Result<Value, TransportError>>) {
        self.streams
            .lock()
            .unwrap()
            .push_back(ScriptedStream { items, stall: true });
    }

    pub fn last_request(&self) -> Option<(Method, Value)> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn released_streams(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LaunchTransport for ScriptedTransport {
    async fn unary(&self, method: Method, request: Value) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push((method, request));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.unary.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportError::Connection("no scripted reply".into())))
    }

    async fn server_stream(
        &self,
        method: Method,
        request: Value,
    ) -> Result<ReplyStream, TransportError> {
        self.requests.lock().unwrap().push((method, request));
        let scripted = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connection("no scripted stream".into()))?;
        let guard = ReleaseGuard(Arc::clone(&self.released));
        let items = stream::iter(scripted.items);
        let items = if scripted.stall {
            items.chain(stream::pending()).boxed()
        } else {
            items.boxed()
        };
        Ok(items
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }
}
