//! The transport contract.

// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use super::error::TransportError;
use crate::membership::SiloInfo;
use crate::message::Envelope;
use crate::util::{MessageId, SiloId};

/// Bi-directional envelope transport between silos.
///
/// # The shared inbound event
///
/// Every envelope that arrives from any stream, and every locally produced
/// response handed to [`send_response`](Transport::send_response), is
/// published on one multicast event, observable via
/// [`subscribe`](Transport::subscribe). Two kinds of subscriber consume it,
/// each applying the envelope classification predicate:
///
/// - the silo loop processes **requests only** and drops responses;
/// - each connection's outbound forwarder writes **responses only**, and only
///   those whose `message_id` it delivered as a request.
///
/// Those two filters together are what prevent request echo loops, responses
/// that never reach remote callers, and responses re-enqueued as fresh
/// requests on the originating silo.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Bind the listener and start serving streams.
    async fn start(&self) -> Result<(), TransportError>;

    /// Drop all streams; pending calls complete with shutdown errors.
    async fn stop(&self) -> Result<(), TransportError>;

    /// Establish a stream to `peer` if absent. Idempotent.
    async fn connect(&self, peer: &SiloInfo) -> Result<(), TransportError>;

    /// Send a request and await its response.
    ///
    /// Registers the envelope's `message_id` in the pending map, delivers the
    /// envelope (over the peer's stream, or straight onto the inbound event
    /// when `target` is the local silo), and resolves when the matching
    /// response arrives. The pending entry enforces `timeout` and
    /// `cancellation`; an entry removed by either drops any late reply
    /// silently.
    async fn send(
        &self,
        target: &SiloId,
        envelope: Envelope,
        timeout: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Envelope, TransportError>;

    /// Return a reply produced on this silo.
    ///
    /// Completes any local pending call keyed by the envelope's `message_id`
    /// and publishes the envelope on the shared inbound event so connection
    /// forwarders can route it to the remote caller.
    async fn send_response(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Subscribe to the shared inbound event.
    fn subscribe(&self) -> broadcast::Receiver<Envelope>;

    /// This transport's silo identity.
    fn local_silo_id(&self) -> &SiloId;

    /// The bound listener address once started.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// The caller-side cancellation token of a pending call, if the call
    /// originated on this silo. Lets the silo loop link a co-located callee's
    /// turn to its caller's token.
    fn pending_cancellation(&self, message_id: &MessageId) -> Option<CancellationToken>;
}
