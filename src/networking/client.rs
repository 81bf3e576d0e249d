use crate::networking::api_message::{
    IntersectionResult, MethodName, Mirror, NextResult, RequestMessage, ResponseMessage,
};
use crate::networking::transport::{Inbound, Transport, WebSocketTransport};
use crate::settings::ClientConfig;
use crate::types::{Block, ChainPoint, Point, StartPoint};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, event, info, warn, Level};

/// Number of RequestNext messages `start` puts in flight.
pub const PIPELINE_DEPTH: usize = 100;

/// Receives the chain as the peer walks it. Each call is awaited before the
/// session looks at the next reply.
#[async_trait]
pub trait RollCallbacks: Send {
    async fn roll_forward(&mut self, block: Block);

    async fn roll_backward(&mut self, point: ChainPoint);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Resolving,
    Negotiating,
    Streaming,
    Closing,
    Closed,
}

/// Asks a running session to stop. Cheap to clone; safe to call from a
/// callback, another task or a signal handler, any number of times.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        // the session may already be gone
        let _ = self.sender.send(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

/// One chain-sync conversation with one peer.
pub struct ChainSyncClient<T: Transport, C: RollCallbacks> {
    transport: T,
    inbound: Inbound,
    callbacks: C,
    requests: BTreeMap<u64, MethodName>,
    request_count: u64,
    pipeline_depth: usize,
    state: SessionState,
    stop_sender: Arc<watch::Sender<bool>>,
    stop_receiver: watch::Receiver<bool>,
}

impl<C: RollCallbacks> ChainSyncClient<WebSocketTransport, C> {
    /// Opens a WebSocket to `config.url` and negotiates the starting point.
    pub async fn connect(config: &ClientConfig, callbacks: C) -> crate::Result<Self> {
        let (transport, inbound) = WebSocketTransport::connect(&config.url).await?;
        ChainSyncClient::handshake(transport, inbound, config, callbacks).await
    }
}

impl<T: Transport, C: RollCallbacks> ChainSyncClient<T, C> {
    /// Resolves `tip` if asked to, then finds the intersection. On success
    /// the session is streaming with exactly one RequestNext in flight; on
    /// failure the transport has been closed.
    pub async fn handshake(
        transport: T,
        inbound: Inbound,
        config: &ClientConfig,
        callbacks: C,
    ) -> crate::Result<Self> {
        let (stop_sender, stop_receiver) = watch::channel(false);
        let mut client = ChainSyncClient {
            transport,
            inbound,
            callbacks,
            requests: BTreeMap::new(),
            request_count: 0,
            pipeline_depth: config.pipeline_depth,
            state: SessionState::Connecting,
            stop_sender: Arc::new(stop_sender),
            stop_receiver,
        };
        match client.negotiate(config.start_point.clone()).await {
            Ok(()) => Ok(client),
            Err(err) => {
                error!("chain sync handshake failed: {}", err);
                client.close_transport().await;
                Err(err)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            sender: self.stop_sender.clone(),
        }
    }

    /// RequestNext messages sent and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.requests
            .values()
            .filter(|methodname| **methodname == MethodName::RequestNext)
            .count()
    }

    /// Fills the pipeline with `pipeline_depth` RequestNext messages without
    /// waiting for replies. Does nothing once the session is closing or a
    /// stop has been requested.
    pub async fn start(&mut self) -> crate::Result<()> {
        if self.is_stopping() {
            return Ok(());
        }
        match self.state {
            SessionState::Streaming => {}
            SessionState::Closing | SessionState::Closed => return Ok(()),
            state => {
                return Err(crate::Error::protocol_violation(format!(
                    "cannot start streaming while {:?}",
                    state
                )))
            }
        }
        for _ in 0..self.pipeline_depth {
            if self.is_stopping() {
                debug!("stop requested while filling the pipeline");
                return Ok(());
            }
            self.request_next().await?;
        }
        debug!("pipeline filled, {} requests in flight", self.in_flight());
        Ok(())
    }

    /// Dispatches replies to the callbacks until stopped or until a fatal
    /// error. The transport is closed on the way out either way.
    pub async fn run(&mut self) -> crate::Result<()> {
        let result = self.stream().await;
        if let Err(err) = &result {
            error!("chain sync session failed: {}", err);
        }
        self.close_transport().await;
        result
    }

    /// Stops dispatching and closes the transport. Idempotent.
    pub async fn stop(&mut self) {
        self.stop_handle().stop();
        self.close_transport().await;
    }

    fn is_stopping(&self) -> bool {
        *self.stop_receiver.borrow()
    }

    async fn stream(&mut self) -> crate::Result<()> {
        loop {
            if self.is_stopping() || self.state != SessionState::Streaming {
                return Ok(());
            }
            let message = tokio::select! {
                biased;
                changed = self.stop_receiver.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    continue;
                }
                message = self.inbound.recv() => message,
            };
            let response = match message {
                Some(response) => response?,
                None => return Err(crate::Error::transport("connection closed by peer")),
            };
            if self.is_stopping() {
                return Ok(());
            }
            self.correlate(&response)?;
            match response.next()? {
                NextResult::RollForward { block, tip } => {
                    debug!("roll forward to {} block, tip {:?}", block.era(), tip);
                    self.callbacks.roll_forward(block).await;
                }
                NextResult::RollBackward { point, tip } => {
                    event!(Level::INFO, "roll backward to {}, tip {:?}", point, tip);
                    self.callbacks.roll_backward(point).await;
                }
            }
            if self.is_stopping() {
                return Ok(());
            }
            self.request_next().await?;
        }
    }

    async fn negotiate(&mut self, start_point: Option<StartPoint>) -> crate::Result<()> {
        let point = match start_point {
            None => {
                self.state = SessionState::Streaming;
                return Ok(());
            }
            Some(StartPoint::Origin) => ChainPoint::Origin,
            Some(StartPoint::At(point)) => ChainPoint::At(point),
            Some(StartPoint::Tip) => {
                self.state = SessionState::Resolving;
                ChainPoint::At(self.resolve_tip().await?)
            }
        };

        self.state = SessionState::Negotiating;
        let mirror = self.next_mirror(MethodName::FindIntersect);
        self.send(RequestMessage::find_intersect(&[point.clone()], Some(mirror)))
            .await?;
        match self.next_response().await?.intersection()? {
            IntersectionResult::IntersectionFound { point, tip } => {
                info!("intersection found at {}, tip {:?}", point, tip);
            }
            IntersectionResult::IntersectionNotFound { tip } => {
                warn!("no intersection with {}, tip {:?}", point, tip);
                return Err(crate::Error::IntersectionNotFound);
            }
        }

        self.state = SessionState::Streaming;
        self.request_next().await
    }

    async fn resolve_tip(&mut self) -> crate::Result<Point> {
        let mirror = self.next_mirror(MethodName::Query);
        self.send(RequestMessage::query_chain_tip(Some(mirror)))
            .await?;
        let tip = self.next_response().await?.chain_tip()?;
        info!("resolved tip to slot {}", tip.slot);
        Ok(Point::from(tip))
    }

    async fn next_response(&mut self) -> crate::Result<ResponseMessage> {
        let response = self
            .inbound
            .recv()
            .await
            .ok_or_else(|| crate::Error::transport("connection closed by peer"))??;
        self.correlate(&response)?;
        Ok(response)
    }

    /// Ties a response to the request it answers. With a reflection the ids
    /// must match; without one, the oldest outstanding request of the same
    /// method is taken.
    fn correlate(&mut self, response: &ResponseMessage) -> crate::Result<()> {
        let id = match response.reflection {
            Some(Mirror { id }) => id,
            None => *self
                .requests
                .iter()
                .find(|(_, methodname)| **methodname == response.methodname)
                .map(|(id, _)| id)
                .ok_or_else(|| {
                    crate::Error::protocol_violation(format!(
                        "unsolicited {} response",
                        response.methodname
                    ))
                })?,
        };
        match self.requests.remove(&id) {
            Some(methodname) if methodname == response.methodname => Ok(()),
            Some(methodname) => Err(crate::Error::protocol_violation(format!(
                "request {} was {}, response is {}",
                id, methodname, response.methodname
            ))),
            None => Err(crate::Error::protocol_violation(format!(
                "peer answered request {} which is not outstanding",
                id
            ))),
        }
    }

    fn next_mirror(&mut self, methodname: MethodName) -> Mirror {
        let id = self.request_count;
        self.request_count += 1;
        self.requests.insert(id, methodname);
        Mirror { id }
    }

    async fn request_next(&mut self) -> crate::Result<()> {
        let mirror = self.next_mirror(MethodName::RequestNext);
        self.send(RequestMessage::request_next(Some(mirror))).await
    }

    async fn send(&mut self, request: RequestMessage) -> crate::Result<()> {
        self.transport.send_text(request.serialize()?).await
    }

    async fn close_transport(&mut self) {
        if matches!(self.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        self.state = SessionState::Closing;
        self.inbound.close();
        if let Err(err) = self.transport.close().await {
            warn!("error closing transport: {}", err);
        }
        self.requests.clear();
        self.state = SessionState::Closed;
        info!("chain sync session closed");
    }
}
