//! Unary and server-streaming call wrappers.
//!
//! Both wrappers encode the typed request, enforce the shared client-side
//! timeout and decode the replies.  Neither applies status mapping; that is
//! the caller's job (see [`crate::status_map`]).

use std::time::Duration;

use fleetlaunch_types::{Method, TransportError};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::transport::{LaunchTransport, ReplyStream};

/// Lazy, single-pass stream of decoded replies.
pub type TypedStream<T> = BoxStream<'static, Result<T, TransportError>>;

/// Issue a unary call and decode its reply.
///
/// # Errors
///
/// [`TransportError::Timeout`] when no reply arrives within `timeout`, any
/// error the transport reports, or [`TransportError::Codec`] when the reply
/// does not decode as `Resp`.
pub async fn unary<Req, Resp>(
    transport: &dyn LaunchTransport,
    method: Method,
    request: &Req,
    timeout: Duration,
) -> Result<Resp, TransportError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let request = encode(method, request)?;
    debug!(method = %method, "unary call");
    let reply = tokio::time::timeout(timeout, transport.unary(method, request))
        .await
        .map_err(|_| {
            warn!(method = %method, timeout_ms = timeout.as_millis() as u64, "call timed out");
            TransportError::Timeout {
                method,
                after: timeout,
            }
        })??;
    decode(method, reply)
}

/// Issue a server-streaming call and return its replies as a lazy stream.
///
/// One deadline covers the whole call: opening the stream and every
/// subsequent advance.  The first error ends the stream and drops the
/// underlying transport stream immediately.
pub async fn server_stream<Req, Item>(
    transport: &dyn LaunchTransport,
    method: Method,
    request: &Req,
    timeout: Duration,
) -> Result<TypedStream<Item>, TransportError>
where
    Req: Serialize,
    Item: DeserializeOwned + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    let request = encode(method, request)?;
    debug!(method = %method, "streaming call");
    let replies = tokio::time::timeout_at(deadline, transport.server_stream(method, request))
        .await
        .map_err(|_| TransportError::Timeout {
            method,
            after: timeout,
        })??;

    let state = StreamState {
        replies: Some(replies),
        method,
        deadline,
        timeout,
        received: 0,
    };
    Ok(stream::unfold(state, next_item::<Item>).boxed())
}

struct StreamState {
    replies: Option<ReplyStream>,
    method: Method,
    deadline: Instant,
    timeout: Duration,
    received: usize,
}

async fn next_item<Item: DeserializeOwned>(
    mut state: StreamState,
) -> Option<(Result<Item, TransportError>, StreamState)> {
    let replies = state.replies.as_mut()?;
    let method = state.method;
    let next = match tokio::time::timeout_at(state.deadline, replies.next()).await {
        Ok(next) => next,
        Err(_) => Some(Err(TransportError::Timeout {
            method,
            after: state.timeout,
        })),
    };
    match next {
        None => {
            debug!(method = %method, records = state.received, "stream finished");
            state.replies = None;
            None
        }
        Some(Ok(value)) => match decode(method, value) {
            Ok(item) => {
                state.received += 1;
                Some((Ok(item), state))
            }
            Err(e) => {
                state.replies = None;
                Some((Err(e), state))
            }
        },
        Some(Err(e)) => {
            warn!(method = %method, error = %e, records = state.received, "stream aborted");
            state.replies = None;
            Some((Err(e), state))
        }
    }
}

fn encode<Req: Serialize>(method: Method, request: &Req) -> Result<Value, TransportError> {
    serde_json::to_value(request)
        .map_err(|e| TransportError::Codec(format!("{method} request: {e}")))
}

fn decode<T: DeserializeOwned>(method: Method, value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::Codec(format!("{method} reply: {e}")))
}
