// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::backoff::ReconnectBackoff;
use super::codec::{self, Frame};
use super::error::TransportError;
use super::traits::Transport;
use crate::membership::SiloInfo;
use crate::message::Envelope;
use crate::util::{MessageId, SiloId};

type FrameSink = SplitSink<Framed<TcpStream, LengthDelimitedCodec>, bytes::Bytes>;

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Dial + handshake deadline.
    pub connect_timeout: Duration,

    /// First reconnect delay after a stream loss.
    pub reconnect_base_delay: Duration,

    /// Reconnect delay cap.
    pub reconnect_max_delay: Duration,

    /// Reconnect attempts before the peer is given up.
    pub reconnect_max_attempts: u32,

    /// Capacity of the shared inbound event channel.
    pub inbound_event_capacity: usize,

    /// Capacity of each peer's outbound request queue.
    pub outbound_queue_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            reconnect_base_delay: Duration::from_millis(100),
            reconnect_max_delay: Duration::from_secs(5),
            reconnect_max_attempts: 5,
            inbound_event_capacity: 1024,
            outbound_queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportState {
    Created,
    Running,
    Stopped,
}

/// One caller-side in-flight request.
struct PendingCall {
    reply: oneshot::Sender<Result<Envelope, TransportError>>,
    target: SiloId,
    cancellation: CancellationToken,
}

/// The producer-facing half of one peer connection.
struct PeerHandle {
    outbound: mpsc::Sender<Envelope>,
    delivered: Arc<DashSet<MessageId>>,
}

struct Inner {
    local_silo_id: SiloId,
    bind_addr: SocketAddr,
    config: TransportConfig,
    peers: DashMap<SiloId, PeerHandle>,
    peer_endpoints: DashMap<SiloId, String>,
    pending: DashMap<MessageId, PendingCall>,
    inbound: broadcast::Sender<Envelope>,
    state: RwLock<TransportState>,
    bound_addr: RwLock<Option<SocketAddr>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// TCP implementation of [`Transport`].
///
/// One framed bi-directional stream per remote silo; the dialer opens with a
/// `Hello` frame so the acceptor can key the stream. Request/response
/// demultiplexing is strictly by `message_id` through the pending map, and
/// the dual request/response filters described on [`Transport`] are
/// implemented by the silo loop (requests) and each connection's forwarder
/// (responses it delivered).
///
/// # Example
/// ```rust,no_run
/// use strand_rt::transport::{TcpTransport, Transport, TransportConfig};
/// use strand_rt::util::SiloId;
///
/// # async fn example() -> Result<(), strand_rt::transport::TransportError> {
/// let transport = TcpTransport::new(
///     SiloId::new("silo-a"),
///     "127.0.0.1:0".parse().unwrap(),
///     TransportConfig::default(),
/// );
/// transport.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport {
    inner: Arc<Inner>,
}

impl TcpTransport {
    /// Create a transport bound to `bind_addr` once started.
    pub fn new(local_silo_id: SiloId, bind_addr: SocketAddr, config: TransportConfig) -> Self {
        let (inbound, _) = broadcast::channel(config.inbound_event_capacity);
        Self {
            inner: Arc::new(Inner {
                local_silo_id,
                bind_addr,
                config,
                peers: DashMap::new(),
                peer_endpoints: DashMap::new(),
                pending: DashMap::new(),
                inbound,
                state: RwLock::new(TransportState::Created),
                bound_addr: RwLock::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Connected peer streams.
    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// In-flight caller-side requests.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}

impl Inner {
    /// Single funnel for every envelope entering this silo's view: frames
    /// read off any stream, local fast-path requests, and locally produced
    /// responses. Completes the matching pending call for responses (a
    /// response with no entry is either bound for a remote caller or a late
    /// reply, which dies here by design), then multicasts the envelope.
    fn publish_inbound(&self, envelope: Envelope) {
        if envelope.is_response() {
            if let Some((_, call)) = self.pending.remove(&envelope.message_id) {
                let _ = call.reply.send(Ok(envelope.clone()));
            }
        }
        let _ = self.inbound.send(envelope);
    }

    /// Install a connection for `peer_id` unless one already exists (the
    /// established stream wins when both sides dialed simultaneously).
    fn register_connection(
        inner: &Arc<Inner>,
        peer_id: SiloId,
        framed: Framed<TcpStream, LengthDelimitedCodec>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::channel(inner.config.outbound_queue_capacity);
        let delivered = Arc::new(DashSet::new());

        match inner.peers.entry(peer_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                debug!(peer = %peer_id, "duplicate stream dropped");
                return;
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(PeerHandle {
                    outbound: outbound_tx,
                    delivered: Arc::clone(&delivered),
                });
            }
        }
        debug!(peer = %peer_id, "stream established");

        let task = tokio::spawn(Self::run_connection(
            Arc::clone(inner),
            peer_id,
            framed,
            outbound_rx,
            delivered,
        ));
        inner.tasks.lock().push(task);
    }

    /// Per-connection loop: reads frames off the stream, writes outbound
    /// requests from the peer queue, and forwards responses taken from the
    /// shared inbound event, but only responses whose request arrived on
    /// this connection (the delivered-id set). Requests are never written
    /// back, which is what stops echo loops.
    async fn run_connection(
        inner: Arc<Inner>,
        peer_id: SiloId,
        framed: Framed<TcpStream, LengthDelimitedCodec>,
        mut outbound_rx: mpsc::Receiver<Envelope>,
        delivered: Arc<DashSet<MessageId>>,
    ) {
        let (mut sink, mut stream) = framed.split();
        let mut events = inner.inbound.subscribe();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(bytes)) => match codec::decode_frame(&bytes) {
                        Ok(Frame::Envelope(envelope)) => {
                            if envelope.is_request() {
                                delivered.insert(envelope.message_id);
                            }
                            inner.publish_inbound(envelope);
                        }
                        Ok(Frame::Hello { .. }) => {}
                        Err(error) => {
                            warn!(peer = %peer_id, %error, "dropping undecodable frame");
                        }
                    },
                    Some(Err(error)) => {
                        warn!(peer = %peer_id, %error, "stream read failed");
                        break;
                    }
                    None => {
                        debug!(peer = %peer_id, "peer closed stream");
                        break;
                    }
                },
                outbound = outbound_rx.recv() => match outbound {
                    Some(envelope) => {
                        if !Self::write_envelope(&mut sink, &peer_id, &envelope).await {
                            break;
                        }
                    }
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(envelope) => {
                        let owned_response = envelope.is_response()
                            && delivered.remove(&envelope.message_id).is_some();
                        if owned_response
                            && !Self::write_envelope(&mut sink, &peer_id, &envelope).await
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(peer = %peer_id, skipped, "response forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        Self::handle_peer_loss(&inner, &peer_id);
    }

    async fn write_envelope(sink: &mut FrameSink, peer_id: &SiloId, envelope: &Envelope) -> bool {
        match codec::encode_frame(&Frame::Envelope(envelope.clone())) {
            Ok(bytes) => match sink.send(bytes).await {
                Ok(()) => true,
                Err(error) => {
                    warn!(peer = %peer_id, %error, "stream write failed");
                    false
                }
            },
            Err(error) => {
                warn!(peer = %peer_id, %error, "dropping unencodable envelope");
                true
            }
        }
    }

    /// Stream loss: fail every pending call headed for the peer, then retry
    /// the connection with backoff while the transport keeps running.
    fn handle_peer_loss(inner: &Arc<Inner>, peer_id: &SiloId) {
        if inner.peers.remove(peer_id).is_none() {
            return;
        }

        let stale: Vec<MessageId> = inner
            .pending
            .iter()
            .filter(|entry| entry.value().target == *peer_id)
            .map(|entry| *entry.key())
            .collect();
        for message_id in stale {
            if let Some((_, call)) = inner.pending.remove(&message_id) {
                let _ = call
                    .reply
                    .send(Err(TransportError::ConnectionLost(peer_id.clone())));
            }
        }

        if *inner.state.read() != TransportState::Running {
            return;
        }
        let Some(endpoint) = inner
            .peer_endpoints
            .get(peer_id)
            .map(|entry| entry.value().clone())
        else {
            return;
        };

        warn!(peer = %peer_id, "stream lost; reconnecting with backoff");
        let inner_clone = Arc::clone(inner);
        let peer = peer_id.clone();
        let task = tokio::spawn(async move {
            let mut backoff = ReconnectBackoff::new(
                inner_clone.config.reconnect_base_delay,
                inner_clone.config.reconnect_max_delay,
            );
            while backoff.attempts() < inner_clone.config.reconnect_max_attempts {
                tokio::time::sleep(backoff.next_delay()).await;
                if *inner_clone.state.read() != TransportState::Running
                    || inner_clone.peers.contains_key(&peer)
                {
                    return;
                }
                match Self::dial(&inner_clone, &peer, &endpoint).await {
                    Ok(()) => {
                        debug!(peer = %peer, "reconnected");
                        return;
                    }
                    Err(error) => debug!(peer = %peer, %error, "reconnect attempt failed"),
                }
            }
            warn!(peer = %peer, "reconnect attempts exhausted");
        });
        inner.tasks.lock().push(task);
    }

    async fn dial(
        inner: &Arc<Inner>,
        peer_id: &SiloId,
        endpoint: &str,
    ) -> Result<(), TransportError> {
        let stream = tokio::time::timeout(inner.config.connect_timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|_| TransportError::ConnectFailed {
                peer: peer_id.clone(),
                reason: "connect timed out".to_string(),
            })?
            .map_err(|e| TransportError::ConnectFailed {
                peer: peer_id.clone(),
                reason: e.to_string(),
            })?;

        let mut framed = codec::framed(stream);
        let hello = codec::encode_frame(&Frame::Hello {
            silo_id: inner.local_silo_id.clone(),
        })?;
        framed
            .send(hello)
            .await
            .map_err(|e| TransportError::ConnectFailed {
                peer: peer_id.clone(),
                reason: e.to_string(),
            })?;

        Self::register_connection(inner, peer_id.clone(), framed);
        Ok(())
    }

    async fn accept_handshake(inner: &Arc<Inner>, stream: TcpStream) -> Result<(), TransportError> {
        let mut framed = codec::framed(stream);
        let first = tokio::time::timeout(inner.config.connect_timeout, framed.next())
            .await
            .map_err(|_| TransportError::Codec("handshake timed out".to_string()))?
            .ok_or_else(|| TransportError::Codec("stream closed before handshake".to_string()))?
            .map_err(TransportError::Io)?;

        match codec::decode_frame(&first)? {
            Frame::Hello { silo_id } => {
                Self::register_connection(inner, silo_id, framed);
                Ok(())
            }
            Frame::Envelope(_) => Err(TransportError::Codec(
                "expected hello as first frame".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        {
            let mut state = self.inner.state.write();
            match *state {
                TransportState::Running => return Ok(()),
                TransportState::Stopped => return Err(TransportError::ShuttingDown),
                TransportState::Created => *state = TransportState::Running,
            }
        }

        let listener = TcpListener::bind(self.inner.bind_addr).await?;
        let bound = listener.local_addr()?;
        *self.inner.bound_addr.write() = Some(bound);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        debug!(%remote, "inbound stream");
                        let handshake_inner = Arc::clone(&inner);
                        let task = tokio::spawn(async move {
                            if let Err(error) =
                                Inner::accept_handshake(&handshake_inner, stream).await
                            {
                                warn!(%error, "handshake failed");
                            }
                        });
                        inner.tasks.lock().push(task);
                    }
                    Err(error) => {
                        warn!(%error, "accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        });
        self.inner.tasks.lock().push(task);

        info!(silo = %self.inner.local_silo_id, addr = %bound, "transport started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        {
            let mut state = self.inner.state.write();
            if *state == TransportState::Stopped {
                return Ok(());
            }
            *state = TransportState::Stopped;
        }

        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.inner.peers.clear();

        let in_flight: Vec<MessageId> = self.inner.pending.iter().map(|e| *e.key()).collect();
        for message_id in in_flight {
            if let Some((_, call)) = self.inner.pending.remove(&message_id) {
                let _ = call.reply.send(Err(TransportError::ShuttingDown));
            }
        }

        info!(silo = %self.inner.local_silo_id, "transport stopped");
        Ok(())
    }

    async fn connect(&self, peer: &SiloInfo) -> Result<(), TransportError> {
        if peer.silo_id == self.inner.local_silo_id {
            return Ok(());
        }
        self.inner
            .peer_endpoints
            .insert(peer.silo_id.clone(), peer.endpoint());
        if self.inner.peers.contains_key(&peer.silo_id) {
            return Ok(());
        }
        Inner::dial(&self.inner, &peer.silo_id, &peer.endpoint()).await
    }

    async fn send(
        &self,
        target: &SiloId,
        envelope: Envelope,
        timeout: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Envelope, TransportError> {
        if *self.inner.state.read() == TransportState::Stopped {
            return Err(TransportError::ShuttingDown);
        }

        let message_id = envelope.message_id;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner.pending.insert(
            message_id,
            PendingCall {
                reply: reply_tx,
                target: target.clone(),
                cancellation: cancellation.clone(),
            },
        );

        let delivery = if *target == self.inner.local_silo_id {
            // Local fast path: skip the sockets, keep every other semantic.
            self.inner.publish_inbound(envelope);
            Ok(())
        } else {
            let outbound = self
                .inner
                .peers
                .get(target)
                .map(|peer| peer.outbound.clone());
            match outbound {
                Some(sender) => sender
                    .send(envelope)
                    .await
                    .map_err(|_| TransportError::ConnectionLost(target.clone())),
                None => Err(TransportError::UnknownPeer(target.clone())),
            }
        };
        if let Err(error) = delivery {
            self.inner.pending.remove(&message_id);
            return Err(error);
        }

        tokio::select! {
            reply = reply_rx => match reply {
                Ok(result) => result,
                Err(_) => Err(TransportError::ShuttingDown),
            },
            _ = tokio::time::sleep(timeout) => {
                self.inner.pending.remove(&message_id);
                Err(TransportError::Timeout { timeout })
            }
            _ = cancellation.cancelled() => {
                self.inner.pending.remove(&message_id);
                Err(TransportError::Cancelled)
            }
        }
    }

    async fn send_response(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.inner.publish_inbound(envelope);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.inner.inbound.subscribe()
    }

    fn local_silo_id(&self) -> &SiloId {
        &self.inner.local_silo_id
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.inner.bound_addr.read()
    }

    fn pending_cancellation(&self, message_id: &MessageId) -> Option<CancellationToken> {
        self.inner
            .pending
            .get(message_id)
            .map(|entry| entry.value().cancellation.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    fn transport(id: &str) -> TcpTransport {
        TcpTransport::new(
            SiloId::new(id),
            "127.0.0.1:0".parse().unwrap(),
            TransportConfig::default(),
        )
    }

    /// Echo responder: answers every request seen on the transport event.
    fn spawn_responder(transport: &TcpTransport) {
        let mut requests = transport.subscribe();
        let inner = Arc::clone(&transport.inner);
        tokio::spawn(async move {
            while let Ok(envelope) = requests.recv().await {
                if envelope.is_request() {
                    inner.publish_inbound(envelope.response(envelope.payload.clone()));
                }
            }
        });
    }

    #[tokio::test]
    async fn test_local_fast_path_roundtrip() {
        let transport = transport("silo-a");
        spawn_responder(&transport);

        let request = Envelope::request("Counter", "c1", "Echo", vec![1, 2, 3]);
        let message_id = request.message_id;
        let token = CancellationToken::new();
        let response = transport
            .send(
                &SiloId::new("silo-a"),
                request,
                Duration::from_secs(1),
                &token,
            )
            .await
            .unwrap();

        assert_eq!(response.message_id, message_id);
        assert_eq!(response.response_payload, Some(vec![1, 2, 3]));
        assert_eq!(transport.pending_count(), 0);
        // No sockets were involved.
        assert_eq!(transport.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_evicts_pending_and_drops_late_reply() {
        let transport = transport("silo-a");
        let request = Envelope::request("Counter", "c1", "Slow", vec![]);
        let late_reply = request.response(vec![7]);
        let token = CancellationToken::new();

        let result = transport
            .send(
                &SiloId::new("silo-a"),
                request,
                Duration::from_millis(30),
                &token,
            )
            .await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert_eq!(transport.pending_count(), 0);

        // The late reply finds no pending entry and dies silently.
        transport.send_response(late_reply).await.unwrap();
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_resolves_caller() {
        let transport = transport("silo-a");
        let token = CancellationToken::new();
        let request = Envelope::request("Counter", "c1", "Slow", vec![]);

        let silo_a = SiloId::new("silo-a");
        let send = transport.send(
            &silo_a,
            request,
            Duration::from_secs(5),
            &token,
        );
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(send, cancel);

        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer_fails_fast() {
        let transport = transport("silo-a");
        let token = CancellationToken::new();
        let request = Envelope::request("Counter", "c1", "Get", vec![]);

        let result = transport
            .send(
                &SiloId::new("silo-zzz"),
                request,
                Duration::from_secs(1),
                &token,
            )
            .await;
        assert!(matches!(result, Err(TransportError::UnknownPeer(_))));
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_roundtrip_over_sockets() {
        let a = transport("silo-a");
        let b = transport("silo-b");
        a.start().await.unwrap();
        b.start().await.unwrap();
        spawn_responder(&b);

        let b_addr = b.local_addr().unwrap();
        let b_info = SiloInfo::new(SiloId::new("silo-b"), "127.0.0.1", b_addr.port());
        a.connect(&b_info).await.unwrap();
        // Idempotent.
        a.connect(&b_info).await.unwrap();
        assert_eq!(a.peer_count(), 1);

        let request = Envelope::request("Counter", "c1", "Echo", vec![42]);
        let message_id = request.message_id;
        let token = CancellationToken::new();
        let response = a
            .send(
                &SiloId::new("silo-b"),
                request,
                Duration::from_secs(2),
                &token,
            )
            .await
            .unwrap();

        assert_eq!(response.message_id, message_id);
        assert_eq!(response.response_payload, Some(vec![42]));
        assert_eq!(a.pending_count(), 0);

        a.stop().await.unwrap();
        b.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_fails_in_flight_calls() {
        let transport = transport("silo-a");
        let token = CancellationToken::new();
        let request = Envelope::request("Counter", "c1", "Slow", vec![]);

        let send = {
            let target = SiloId::new("silo-a");
            let t = TcpTransport {
                inner: Arc::clone(&transport.inner),
            };
            tokio::spawn(async move {
                t.send(&target, request, Duration::from_secs(5), &token).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.stop().await.unwrap();

        let result = send.await.unwrap();
        assert!(matches!(result, Err(TransportError::ShuttingDown)));
    }
}
