// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
use crate::util::{ActorKey, MessageId};

/// Unified request/response message.
///
/// One envelope shape travels the wire and the in-process fast path, for both
/// directions of a call. Which role an envelope plays is decided by a single
/// predicate (see [`Envelope::is_response`]); that predicate is the only
/// criterion the runtime uses to separate request and response flows, so the
/// constructors here are the sole places allowed to set `response_payload`
/// and `is_error`.
///
/// # Example
/// ```rust
/// use strand_rt::message::Envelope;
///
/// let request = Envelope::request("Counter", "c1", "Increment", vec![]);
/// assert!(request.is_request());
///
/// let reply = request.response(vec![1, 0, 0, 0]);
/// assert!(reply.is_response());
/// assert_eq!(reply.message_id, request.message_id);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique per request; responses echo it.
    pub message_id: MessageId,

    /// Optional end-to-end tracing id, carried verbatim into the reply.
    pub correlation_id: Option<Uuid>,

    /// Routing key: application type tag.
    pub actor_type: String,

    /// Routing key: per-type actor id.
    pub actor_id: String,

    /// Dispatch entry name; opaque to the runtime.
    pub method_name: String,

    /// Length-delimited concatenation of parameter segments.
    pub payload: Vec<u8>,

    /// Present iff this envelope is a successful reply.
    pub response_payload: Option<Vec<u8>>,

    /// Marks an error reply; `error_message` carries the reason.
    pub is_error: bool,

    /// Short human-readable failure reason, set iff `is_error`.
    pub error_message: Option<String>,

    /// Sender clock at emission (advisory only).
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Build a request envelope with a fresh message id.
    pub fn request(
        actor_type: impl Into<String>,
        actor_id: impl Into<String>,
        method_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            correlation_id: None,
            actor_type: actor_type.into(),
            actor_id: actor_id.into(),
            method_name: method_name.into(),
            payload,
            response_payload: None,
            is_error: false,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a request envelope for an [`ActorKey`].
    pub fn request_for(key: &ActorKey, method_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::request(key.actor_type(), key.actor_id(), method_name, payload)
    }

    /// Build the successful reply to this request.
    ///
    /// Echoes `message_id` and `correlation_id`; the routing key and method
    /// name are carried along for observability.
    pub fn response(&self, response_payload: Vec<u8>) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id,
            actor_type: self.actor_type.clone(),
            actor_id: self.actor_id.clone(),
            method_name: self.method_name.clone(),
            payload: Vec::new(),
            response_payload: Some(response_payload),
            is_error: false,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Build the error reply to this request.
    pub fn error_response(&self, reason: impl Into<String>) -> Self {
        Self {
            message_id: self.message_id,
            correlation_id: self.correlation_id,
            actor_type: self.actor_type.clone(),
            actor_id: self.actor_id.clone(),
            method_name: self.method_name.clone(),
            payload: Vec::new(),
            response_payload: None,
            is_error: true,
            error_message: Some(reason.into()),
            timestamp: Utc::now(),
        }
    }

    /// Builder method: set the correlation id.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Classification predicate: this envelope is a reply.
    ///
    /// Exactly one of [`is_response`](Self::is_response) and
    /// [`is_request`](Self::is_request) holds for every envelope.
    pub fn is_response(&self) -> bool {
        self.response_payload.is_some() || self.is_error
    }

    /// Classification predicate: this envelope is a request.
    pub fn is_request(&self) -> bool {
        !self.is_response()
    }

    /// The routing key of this envelope.
    pub fn actor_key(&self) -> ActorKey {
        ActorKey::new(self.actor_type.as_str(), self.actor_id.as_str())
    }
}
