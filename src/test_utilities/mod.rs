pub mod mocks;

use crate::networking::api_message::{MethodName, RequestMessage, ResponseMessage};
use crate::networking::client::{RollCallbacks, StopHandle};
use crate::networking::transport::{Inbound, InboundSender, Transport};
use crate::types::{Block, ChainPoint, Era, Tip};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the session sent and what the callbacks saw, interleaved in the
/// order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEntry {
    Sent(MethodName),
    Forward(Era),
    Backward(ChainPoint),
}

pub type Trace = Arc<Mutex<Vec<TraceEntry>>>;

/// One reply to a RequestNext, in script order.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    Forward(Block),
    Backward(ChainPoint),
    /// An arbitrary `result` object.
    Result(Value),
    /// A raw frame, sent as is.
    Raw(String),
}

/// How the scripted peer answers. RequestNext messages beyond the scripted
/// events are held without a reply, like a peer sitting at the tip.
#[derive(Debug, Clone)]
pub struct PeerScript {
    tip: Value,
    intersection: bool,
    reflect: bool,
    events: VecDeque<PeerEvent>,
}

impl PeerScript {
    pub fn new() -> Self {
        PeerScript {
            tip: json!({ "slot": 86400, "hash": mocks::mock_hash(86400), "blockNo": 4320 }),
            intersection: true,
            reflect: true,
            events: VecDeque::new(),
        }
    }

    pub fn with_tip(mut self, tip: Tip) -> Self {
        self.tip = serde_json::to_value(tip).unwrap();
        self
    }

    pub fn with_raw_tip(mut self, tip: Value) -> Self {
        self.tip = tip;
        self
    }

    pub fn without_intersection(mut self) -> Self {
        self.intersection = false;
        self
    }

    pub fn without_reflection(mut self) -> Self {
        self.reflect = false;
        self
    }

    pub fn with_events(mut self, events: Vec<PeerEvent>) -> Self {
        self.events.extend(events);
        self
    }

    fn reply_to(&mut self, request: &RequestMessage) -> Option<String> {
        let result = match request.methodname {
            MethodName::Query => self.tip.clone(),
            MethodName::FindIntersect if self.intersection => json!({
                "IntersectionFound": { "point": request.args["points"][0], "tip": self.tip }
            }),
            MethodName::FindIntersect => json!({ "IntersectionNotFound": { "tip": self.tip } }),
            MethodName::RequestNext => match self.events.pop_front()? {
                PeerEvent::Forward(block) => {
                    json!({ "RollForward": { "block": block, "tip": self.tip } })
                }
                PeerEvent::Backward(point) => {
                    json!({ "RollBackward": { "point": point, "tip": self.tip } })
                }
                PeerEvent::Result(result) => result,
                PeerEvent::Raw(text) => return Some(text),
            },
        };
        let mut envelope = json!({
            "type": "jsonwsp/response",
            "version": "1.0",
            "servicename": "ogmios",
            "methodname": request.methodname,
            "result": result,
        });
        if self.reflect {
            if let Some(mirror) = request.mirror {
                envelope["reflection"] = json!(mirror);
            }
        }
        Some(envelope.to_string())
    }
}

struct PeerState {
    script: PeerScript,
    inbound: Option<InboundSender>,
}

/// In-memory stand-in for a socket, answering from a [`PeerScript`].
pub struct MockTransport {
    state: Arc<Mutex<PeerState>>,
    sent: Arc<Mutex<Vec<RequestMessage>>>,
    trace: Trace,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> crate::Result<()> {
        let request = RequestMessage::deserialize(&text)?;
        self.trace
            .lock()
            .unwrap()
            .push(TraceEntry::Sent(request.methodname));
        self.sent.lock().unwrap().push(request.clone());

        let mut state = self.state.lock().unwrap();
        let sender = state
            .inbound
            .clone()
            .ok_or_else(|| crate::Error::transport("peer disconnected"))?;
        if let Some(reply) = state.script.reply_to(&request) {
            let _ = sender.send(ResponseMessage::deserialize(&reply));
        }
        Ok(())
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().inbound = None;
        Ok(())
    }
}

/// The test's view of the scripted peer.
#[derive(Clone)]
pub struct PeerHandle {
    state: Arc<Mutex<PeerState>>,
    sent: Arc<Mutex<Vec<RequestMessage>>>,
    closes: Arc<AtomicUsize>,
    pub trace: Trace,
}

impl PeerHandle {
    pub fn sent(&self) -> Vec<RequestMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn methods_sent(&self) -> Vec<MethodName> {
        self.sent()
            .iter()
            .map(|request| request.methodname)
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Pushes an unsolicited frame to the session.
    pub fn inject(&self, text: String) {
        if let Some(sender) = &self.state.lock().unwrap().inbound {
            let _ = sender.send(ResponseMessage::deserialize(&text));
        }
    }

    /// Drops the peer's end of the connection.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().inbound = None;
    }

    pub async fn wait_for_sent(&self, count: usize, limit: Duration) {
        let waited = tokio::time::timeout(limit, async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {} requests, saw {}",
            count,
            self.sent.lock().unwrap().len()
        );
    }
}

pub fn scripted_peer(script: PeerScript) -> (MockTransport, Inbound, PeerHandle) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let state = Arc::new(Mutex::new(PeerState {
        script,
        inbound: Some(sender),
    }));
    let sent = Arc::new(Mutex::new(vec![]));
    let trace: Trace = Arc::new(Mutex::new(vec![]));
    let closes = Arc::new(AtomicUsize::new(0));

    let transport = MockTransport {
        state: state.clone(),
        sent: sent.clone(),
        trace: trace.clone(),
        closes: closes.clone(),
    };
    let handle = PeerHandle {
        state,
        sent,
        closes,
        trace,
    };
    (transport, receiver, handle)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Roll {
    Forward(Era, u64),
    Backward(ChainPoint),
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Roll::Forward(era, height) => write!(f, "forward {} {}", era, height),
            Roll::Backward(point) => write!(f, "backward {}", point),
        }
    }
}

/// Callbacks that write every roll into a shared list and trace.
pub struct RecordingCallbacks {
    pub trace: Trace,
    pub rolls: Arc<Mutex<Vec<Roll>>>,
    /// Filled in by the test once the session exists.
    pub stop_slot: Arc<Mutex<Option<StopHandle>>>,
    stop_after: Option<usize>,
    delay: Option<Duration>,
}

impl RecordingCallbacks {
    pub fn new(trace: Trace) -> Self {
        RecordingCallbacks {
            trace,
            rolls: Arc::new(Mutex::new(vec![])),
            stop_slot: Arc::new(Mutex::new(None)),
            stop_after: None,
            delay: None,
        }
    }

    /// Suspends inside every callback, after recording.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stops the session from inside the `count`-th callback.
    pub fn stop_after(mut self, count: usize) -> Self {
        self.stop_after = Some(count);
        self
    }

    async fn record(&mut self, entry: TraceEntry, roll: Roll) {
        self.trace.lock().unwrap().push(entry);
        let count = {
            let mut rolls = self.rolls.lock().unwrap();
            rolls.push(roll);
            rolls.len()
        };
        if Some(count) == self.stop_after {
            let stop_handle = self.stop_slot.lock().unwrap().clone();
            if let Some(stop_handle) = stop_handle {
                stop_handle.stop();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RollCallbacks for RecordingCallbacks {
    async fn roll_forward(&mut self, block: Block) {
        let height = block.payload()["header"]["blockHeight"]
            .as_u64()
            .unwrap_or_default();
        let era = block.era();
        self.record(TraceEntry::Forward(era), Roll::Forward(era, height))
            .await;
    }

    async fn roll_backward(&mut self, point: ChainPoint) {
        self.record(TraceEntry::Backward(point.clone()), Roll::Backward(point))
            .await;
    }
}
