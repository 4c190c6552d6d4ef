//! The transport seam.
//!
//! [`LaunchClient`][crate::client::LaunchClient] never speaks a wire protocol
//! directly.  It hands JSON-encoded requests to a [`LaunchTransport`] and
//! receives JSON-encoded replies back, either as one value (unary calls) or
//! as a stream of values (server-streaming calls).
//!
//! # Implementations
//!
//! - [`WsTransport`][crate::ws_transport::WsTransport] – JSON frames over a
//!   WebSocket connection to the launch service.

use async_trait::async_trait;
use fleetlaunch_types::{Method, TransportError};
use futures_util::stream::BoxStream;
use serde_json::Value;

/// Stream of raw replies produced by a server-streaming call.
pub type ReplyStream = BoxStream<'static, Result<Value, TransportError>>;

/// Every launch-service transport must implement this trait.
///
/// # Contract
///
/// * `unary` – sends one request and resolves to the single reply.
///
/// * `server_stream` – sends one request and returns the replies as a lazy
///   stream that ends when the service signals end-of-stream.  Dropping the
///   stream, drained or not, must release every resource the call holds.
///
/// Timeouts are applied by the caller, not by the transport.
#[async_trait]
pub trait LaunchTransport: Send + Sync {
    async fn unary(&self, method: Method, request: Value) -> Result<Value, TransportError>;

    async fn server_stream(
        &self,
        method: Method,
        request: Value,
    ) -> Result<ReplyStream, TransportError>;
}
