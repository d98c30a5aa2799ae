//! Routing of incoming messages and JSON-RPC error mapping.
//!
//! For every input line the dispatcher decides one of:
//!
//! 1. **Parse error**: the line is not UTF-8 JSON. Answered with `-32700` and
//!    `id: null`.
//! 2. **Invalid message**: JSON but not a JSON-RPC 2.0 message with a method.
//!    Answered with `-32603` before any network call.
//! 3. **Notification**: forwarded upstream for its side effect. Never
//!    answered, even when the upstream fails.
//! 4. **Local method**: answered by [`LocalMethod`].
//! 5. **Anything else**: forwarded upstream; the upstream's response is
//!    relayed, and failures become `-32603`.
//!
//! Error `data` is attached only when the dispatcher was built with `debug`
//! enabled.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::MessageError;
use crate::mcp::handlers::LocalMethod;
use crate::mcp::protocol::{
    parse_bytes, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    OutgoingMessage, RequestId,
};
use crate::upstream::UpstreamForwarder;

/// Routes messages to local handlers or the upstream.
#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<dyn UpstreamForwarder>,
    debug: bool,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// `debug` controls whether error responses carry diagnostic `data`.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamForwarder>, debug: bool) -> Self {
        Self { upstream, debug }
    }

    /// Handles one raw input line.
    ///
    /// Returns the message to write, or `None` for notifications.
    pub async fn dispatch_line(&self, line: impl AsRef<[u8]> + Send) -> Option<OutgoingMessage> {
        match parse_bytes(line.as_ref()) {
            Ok(message) => self.dispatch(message).await,
            Err(error) => Some(self.message_error(&error).into()),
        }
    }

    /// Handles a parsed message.
    pub async fn dispatch(&self, message: IncomingMessage) -> Option<OutgoingMessage> {
        debug!(method = message.method(), "Dispatching message");

        match message {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
        }
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> OutgoingMessage {
        if let Some(local) = LocalMethod::from_method(&req.method) {
            return local.respond(req.params.as_ref(), req.id).into();
        }

        match self.upstream.send(&req.message).await {
            Ok(response) => OutgoingMessage::Relayed(response),
            Err(e) => {
                warn!(id = %req.id, method = %req.method, error = %e, "Upstream request failed");
                self.internal_error(req.id, Some(&req.method), &e.to_string())
                    .into()
            }
        }
    }

    async fn handle_notification(&self, notif: JsonRpcNotification) {
        if let Err(e) = self.upstream.send(&notif.message).await {
            warn!(method = %notif.method, error = %e, "Upstream notification failed");
        }
    }

    /// Maps a line that failed to parse or validate.
    fn message_error(&self, error: &MessageError) -> JsonRpcError {
        warn!(error = %error, "Rejected input line");

        match error {
            MessageError::Parse { detail, preview } => {
                let response = JsonRpcError::parse_error();
                if self.debug {
                    response.with_data(json!({ "error": detail, "preview": preview }))
                } else {
                    response
                }
            }
            MessageError::Invalid { id, method, .. } => {
                self.internal_error(id.clone(), method.as_deref(), &error.to_string())
            }
        }
    }

    /// Builds a `-32603` response, with diagnostic data in debug mode.
    fn internal_error(&self, id: RequestId, method: Option<&str>, cause: &str) -> JsonRpcError {
        let response = JsonRpcError::internal_error(id);
        if !self.debug {
            return response;
        }

        response.with_data(json!({
            "error": cause,
            "method": method.map_or(Value::Null, |m| Value::String(m.to_string())),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }
}
