use crate::types::{Block, ChainPoint, Tip};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

pub const REQUEST_TYPE: &str = "jsonwsp/request";
pub const RESPONSE_TYPE: &str = "jsonwsp/response";
pub const FAULT_TYPE: &str = "jsonwsp/fault";
pub const PROTOCOL_VERSION: &str = "1.0";
pub const SERVICE_NAME: &str = "ogmios";

/// The methods this client invokes on the peer.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum MethodName {
    FindIntersect,
    RequestNext,
    Query,
}

impl MethodName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodName::FindIntersect => "FindIntersect",
            MethodName::RequestNext => "RequestNext",
            MethodName::Query => "Query",
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation token echoed back by the peer as `reflection`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Mirror {
    pub id: u64,
}

/// An outbound JSON-WSP request.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RequestMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub version: String,
    pub servicename: String,
    pub methodname: MethodName,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<Mirror>,
}

impl RequestMessage {
    pub fn new(methodname: MethodName, args: Value, mirror: Option<Mirror>) -> RequestMessage {
        RequestMessage {
            message_type: String::from(REQUEST_TYPE),
            version: String::from(PROTOCOL_VERSION),
            servicename: String::from(SERVICE_NAME),
            methodname,
            args,
            mirror,
        }
    }

    pub fn find_intersect(points: &[ChainPoint], mirror: Option<Mirror>) -> RequestMessage {
        RequestMessage::new(
            MethodName::FindIntersect,
            json!({ "points": points }),
            mirror,
        )
    }

    pub fn request_next(mirror: Option<Mirror>) -> RequestMessage {
        RequestMessage::new(MethodName::RequestNext, json!({}), mirror)
    }

    pub fn query_chain_tip(mirror: Option<Mirror>) -> RequestMessage {
        RequestMessage::new(MethodName::Query, json!({ "query": "chainTip" }), mirror)
    }

    pub fn serialize(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(text: &str) -> crate::Result<RequestMessage> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Deserialize, Debug)]
struct RawFault {
    code: String,
    string: String,
}

// Every inbound frame, before it is known to be a response or a fault.
#[derive(Deserialize, Debug)]
struct RawEnvelope {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    methodname: Option<String>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    fault: Option<RawFault>,
    #[serde(default)]
    reflection: Option<Value>,
}

/// Result of a FindIntersect request.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub enum IntersectionResult {
    IntersectionFound {
        point: ChainPoint,
        #[serde(default)]
        tip: Option<ChainPoint>,
    },
    IntersectionNotFound {
        #[serde(default)]
        tip: Option<ChainPoint>,
    },
}

/// Result of a RequestNext request.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub enum NextResult {
    RollForward {
        block: Block,
        #[serde(default)]
        tip: Option<ChainPoint>,
    },
    RollBackward {
        point: ChainPoint,
        #[serde(default)]
        tip: Option<ChainPoint>,
    },
}

/// An inbound JSON-WSP response. The `result` stays raw until the session
/// knows which request it answers.
#[derive(Debug, PartialEq, Clone)]
pub struct ResponseMessage {
    pub methodname: MethodName,
    pub result: Value,
    pub reflection: Option<Mirror>,
}

impl ResponseMessage {
    /// Parses one text frame. A `jsonwsp/fault` envelope becomes
    /// `Error::Fault`; anything that is not JSON, or not an envelope, is
    /// `Error::MalformedMessage`.
    pub fn deserialize(text: &str) -> crate::Result<ResponseMessage> {
        let envelope: RawEnvelope = serde_json::from_str(text)?;
        match envelope.message_type.as_str() {
            RESPONSE_TYPE => {}
            FAULT_TYPE => {
                let fault = envelope
                    .fault
                    .ok_or_else(|| crate::Error::malformed_message("fault without details"))?;
                return Err(crate::Error::Fault {
                    code: fault.code,
                    message: fault.string,
                });
            }
            other => {
                return Err(crate::Error::malformed_message(format!(
                    "unexpected envelope type {}",
                    other
                )))
            }
        }

        let methodname = envelope
            .methodname
            .ok_or_else(|| crate::Error::malformed_message("response without methodname"))?;
        let methodname: MethodName = serde_json::from_value(Value::String(methodname.clone()))
            .map_err(|_| {
                crate::Error::protocol_violation(format!("response for unknown method {}", methodname))
            })?;
        // mirrors this client did not write are not ours to correlate
        let reflection = envelope
            .reflection
            .and_then(|reflection| serde_json::from_value::<Mirror>(reflection).ok());

        Ok(ResponseMessage {
            methodname,
            result: envelope.result,
            reflection,
        })
    }

    pub fn intersection(self) -> crate::Result<IntersectionResult> {
        self.expect_method(MethodName::FindIntersect)?;
        serde_json::from_value(self.result).map_err(|err| {
            crate::Error::protocol_violation(format!("FindIntersect result: {}", err))
        })
    }

    /// Roll forward or roll backward. A result carrying neither is a
    /// protocol violation.
    pub fn next(self) -> crate::Result<NextResult> {
        self.expect_method(MethodName::RequestNext)?;
        serde_json::from_value(self.result).map_err(|err| {
            crate::Error::protocol_violation(format!(
                "RequestNext could not move forward or backward: {}",
                err
            ))
        })
    }

    pub fn chain_tip(self) -> crate::Result<Tip> {
        self.expect_method(MethodName::Query)?;
        serde_json::from_value(self.result)
            .map_err(|err| crate::Error::malformed_message(format!("chain tip: {}", err)))
    }

    fn expect_method(&self, methodname: MethodName) -> crate::Result<()> {
        if self.methodname != methodname {
            return Err(crate::Error::protocol_violation(format!(
                "expected a {} response, got {}",
                methodname, self.methodname
            )));
        }
        Ok(())
    }
}
