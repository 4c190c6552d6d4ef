//! WebSocket JSON transport for the launch service.
//!
//! Each call is one text frame carrying a fresh call id:
//!
//! ```text
//! → {"op":"call","id":"<uuid>","method":"GetNodes","request":{…}}
//! ← {"id":"<uuid>","reply":{…}}        one per reply
//! ← {"id":"<uuid>","end":true}         end of a streaming call
//! ← {"id":"<uuid>","error":"…"}        call aborted by the service
//! ```
//!
//! One call owns the socket at a time.  A streaming call keeps the socket
//! until its stream finishes or is dropped; frames still in flight for a
//! dropped call are discarded by id when the next call reads.

use std::sync::Arc;

use async_trait::async_trait;
use fleetlaunch_types::{Method, TransportError};
use futures_util::stream::{self, StreamExt};
use futures_util::SinkExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::transport::{LaunchTransport, ReplyStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct CallFrame<'a> {
    op: &'static str,
    id: Uuid,
    method: Method,
    request: &'a Value,
}

#[derive(Deserialize)]
struct ReplyFrame {
    id: Uuid,
    #[serde(default)]
    reply: Option<Value>,
    #[serde(default)]
    end: bool,
    #[serde(default)]
    error: Option<String>,
}

enum Incoming {
    Reply(Value),
    End,
}

/// [`LaunchTransport`] over a single WebSocket connection.
#[derive(Clone)]
pub struct WsTransport {
    socket: Arc<Mutex<Socket>>,
    endpoint: String,
}

impl WsTransport {
    /// Connect to `endpoint` (`ws://host:port[/path]`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] if the TCP connection or the
    /// WebSocket handshake fails.
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let (socket, _response) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connection(format!("{endpoint}: {e}")))?;
        info!(endpoint = %endpoint, "connected to launch service");
        Ok(Self {
            socket: Arc::new(Mutex::new(socket)),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LaunchTransport for WsTransport {
    async fn unary(&self, method: Method, request: Value) -> Result<Value, TransportError> {
        if method.is_streaming() {
            return Err(TransportError::Codec(format!("{method} is a streaming call")));
        }
        let mut socket = self.socket.lock().await;
        let id = send_call(&mut socket, method, &request).await?;
        match next_frame(&mut socket, id, method).await? {
            Incoming::Reply(reply) => Ok(reply),
            Incoming::End => Err(TransportError::Codec(format!(
                "{method}: stream end on a unary call"
            ))),
        }
    }

    async fn server_stream(
        &self,
        method: Method,
        request: Value,
    ) -> Result<ReplyStream, TransportError> {
        if !method.is_streaming() {
            return Err(TransportError::Codec(format!("{method} is a unary call")));
        }
        let mut socket = Arc::clone(&self.socket).lock_owned().await;
        let id = send_call(&mut socket, method, &request).await?;
        let call = StreamCall { socket, id, method };
        Ok(stream::unfold(Some(call), next_reply).boxed())
    }
}

struct StreamCall {
    socket: OwnedMutexGuard<Socket>,
    id: Uuid,
    method: Method,
}

async fn next_reply(
    call: Option<StreamCall>,
) -> Option<(Result<Value, TransportError>, Option<StreamCall>)> {
    let mut call = call?;
    match next_frame(&mut call.socket, call.id, call.method).await {
        Ok(Incoming::Reply(reply)) => Some((Ok(reply), Some(call))),
        Ok(Incoming::End) => None,
        Err(e) => Some((Err(e), None)),
    }
}

async fn send_call(
    socket: &mut Socket,
    method: Method,
    request: &Value,
) -> Result<Uuid, TransportError> {
    let id = Uuid::new_v4();
    let frame = CallFrame {
        op: "call",
        id,
        method,
        request,
    };
    let text = serde_json::to_string(&frame).map_err(|e| TransportError::Codec(e.to_string()))?;
    socket
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| TransportError::Connection(format!("send {method}: {e}")))?;
    debug!(method = %method, call_id = %id, "call sent");
    Ok(id)
}

/// Read frames until one belonging to call `id` arrives.
async fn next_frame(
    socket: &mut Socket,
    id: Uuid,
    method: Method,
) -> Result<Incoming, TransportError> {
    loop {
        let text = match socket.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                warn!(method = %method, "connection closed by service");
                return Err(TransportError::Connection(
                    "connection closed by service".to_string(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::Connection(e.to_string())),
        };
        let frame: ReplyFrame = serde_json::from_str(text.as_str())
            .map_err(|e| TransportError::Codec(format!("{method}: bad frame: {e}")))?;
        if frame.id != id {
            debug!(method = %method, stale_id = %frame.id, "discarding frame of an abandoned call");
            continue;
        }
        if let Some(message) = frame.error {
            return Err(TransportError::Aborted { method, message });
        }
        if let Some(reply) = frame.reply {
            return Ok(Incoming::Reply(reply));
        }
        if frame.end {
            return Ok(Incoming::End);
        }
        return Err(TransportError::Codec(format!(
            "{method}: frame without reply, end or error"
        )));
    }
}
