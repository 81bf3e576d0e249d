use crate::normalizer::detect_era;
use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a block header hash.
pub const HASH_SIZE: usize = 32;

lazy_static! {
    /// The last block of the byron era. Starting from here skips the byron
    /// replay entirely.
    pub static ref POINT_SHELLEY_START: Point = Point {
        slot: 4492799,
        hash: String::from("f8084c61b6a238acec985b59310b6ecec49c0ab8352249afd7268da5cff2a457"),
    };
}

/// A position on the chain.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Hash)]
pub struct Point {
    pub slot: u64,
    pub hash: String,
}

impl Point {
    pub fn new(slot: u64, hash: impl Into<String>) -> Point {
        Point {
            slot,
            hash: hash.into(),
        }
    }

    /// Build a point from user input, checking that `hash` is a hex encoded
    /// header hash.
    pub fn parse(slot: u64, hash: &str) -> crate::Result<Point> {
        let bytes = hex::decode(hash)
            .map_err(|err| crate::Error::config(format!("point hash {}: {}", hash, err)))?;
        if bytes.len() != HASH_SIZE {
            return Err(crate::Error::config(format!(
                "point hash must be {} bytes, got {}",
                HASH_SIZE,
                bytes.len()
            )));
        }
        Ok(Point::new(slot, hash.to_lowercase()))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.slot, self.hash)
    }
}

/// `<slot>.<hash>`, the same form `Display` writes.
impl FromStr for Point {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Point> {
        let (slot, hash) = s
            .split_once('.')
            .ok_or_else(|| crate::Error::config(format!("expected <slot>.<hash>, got {}", s)))?;
        let slot = slot
            .parse::<u64>()
            .map_err(|err| crate::Error::config(format!("point slot {}: {}", slot, err)))?;
        Point::parse(slot, hash)
    }
}

// Points travel either as `{ slot, hash }` or as the bare string "origin".
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Literal(String),
    Point(Point),
}

/// A point as the peer reports it: genesis, or a concrete block.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum ChainPoint {
    Origin,
    At(Point),
}

impl From<Point> for ChainPoint {
    fn from(point: Point) -> Self {
        ChainPoint::At(point)
    }
}

impl fmt::Display for ChainPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainPoint::Origin => write!(f, "origin"),
            ChainPoint::At(point) => point.fmt(f),
        }
    }
}

impl Serialize for ChainPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChainPoint::Origin => serializer.serialize_str("origin"),
            ChainPoint::At(point) => point.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ChainPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawPoint::deserialize(deserializer)? {
            RawPoint::Literal(literal) if literal == "origin" => Ok(ChainPoint::Origin),
            RawPoint::Literal(literal) => Err(de::Error::custom(format!(
                "unknown point literal: {}",
                literal
            ))),
            RawPoint::Point(point) => Ok(ChainPoint::At(point)),
        }
    }
}

/// Where a session should begin following the chain.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StartPoint {
    Origin,
    /// Resolved to a concrete point with a chain tip query after connecting.
    Tip,
    At(Point),
}

/// Accepts `origin`, `tip`, `shelley` (for [`POINT_SHELLEY_START`]) or
/// `<slot>.<hash>`.
impl FromStr for StartPoint {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<StartPoint> {
        match s {
            "origin" => Ok(StartPoint::Origin),
            "tip" => Ok(StartPoint::Tip),
            "shelley" => Ok(StartPoint::At(POINT_SHELLEY_START.clone())),
            _ => Ok(StartPoint::At(s.parse()?)),
        }
    }
}

impl<'de> Deserialize<'de> for StartPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawPoint::deserialize(deserializer)? {
            RawPoint::Literal(literal) => literal.parse().map_err(de::Error::custom),
            RawPoint::Point(point) => Point::parse(point.slot, &point.hash)
                .map(StartPoint::At)
                .map_err(de::Error::custom),
        }
    }
}

/// Result of a `chainTip` query.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Tip {
    pub slot: u64,
    pub hash: String,
    #[serde(rename = "blockNo", default, skip_serializing_if = "Option::is_none")]
    pub block_no: Option<u64>,
}

impl From<Tip> for Point {
    fn from(tip: Tip) -> Self {
        Point {
            slot: tip.slot,
            hash: tip.hash,
        }
    }
}

/// Protocol eras, earliest first.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Byron,
    Shelley,
    Allegra,
    Mary,
    Alonzo,
    Babbage,
}

impl Era {
    pub const ALL: [Era; 6] = [
        Era::Byron,
        Era::Shelley,
        Era::Allegra,
        Era::Mary,
        Era::Alonzo,
        Era::Babbage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Byron => "byron",
            Era::Shelley => "shelley",
            Era::Allegra => "allegra",
            Era::Mary => "mary",
            Era::Alonzo => "alonzo",
            Era::Babbage => "babbage",
        }
    }

    pub fn from_key(key: &str) -> Option<Era> {
        Era::ALL.iter().copied().find(|era| era.as_str() == key)
    }

    pub fn is_earliest(&self) -> bool {
        *self == Era::Byron
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block as delivered by RollForward, keyed by exactly one era.
///
/// The era payload is kept as raw JSON; only the normalizer looks inside it.
#[derive(Debug, PartialEq, Clone)]
pub enum Block {
    Byron(Value),
    Shelley(Value),
    Allegra(Value),
    Mary(Value),
    Alonzo(Value),
    Babbage(Value),
}

impl Block {
    pub fn new(era: Era, payload: Value) -> Block {
        match era {
            Era::Byron => Block::Byron(payload),
            Era::Shelley => Block::Shelley(payload),
            Era::Allegra => Block::Allegra(payload),
            Era::Mary => Block::Mary(payload),
            Era::Alonzo => Block::Alonzo(payload),
            Era::Babbage => Block::Babbage(payload),
        }
    }

    pub fn era(&self) -> Era {
        match self {
            Block::Byron(_) => Era::Byron,
            Block::Shelley(_) => Era::Shelley,
            Block::Allegra(_) => Era::Allegra,
            Block::Mary(_) => Era::Mary,
            Block::Alonzo(_) => Era::Alonzo,
            Block::Babbage(_) => Era::Babbage,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            Block::Byron(payload)
            | Block::Shelley(payload)
            | Block::Allegra(payload)
            | Block::Mary(payload)
            | Block::Alonzo(payload)
            | Block::Babbage(payload) => payload,
        }
    }
}

impl TryFrom<Value> for Block {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Block> {
        let era = detect_era(&value)?;
        let payload = match value {
            Value::Object(mut map) => map.remove(era.as_str()).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        Ok(Block::new(era, payload))
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Block::try_from(value).map_err(de::Error::custom)
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.era().as_str(), self.payload())?;
        map.end()
    }
}

/// Header fields shared by every era from shelley onwards.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompactHeader {
    pub block_hash: String,
    pub block_height: u64,
    pub block_size: u64,
    pub prev_hash: String,
    pub slot: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidityInterval {
    pub invalid_before: Option<u64>,
    pub invalid_hereafter: Option<u64>,
}

/// A transaction in its era's native JSON form. Shelley transactions have
/// had a `validityInterval` synthesized from their time-to-live.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(transparent)]
pub struct CompatibleTx(Value);

impl CompatibleTx {
    pub fn new(value: Value) -> CompatibleTx {
        CompatibleTx(value)
    }

    pub fn body(&self) -> Option<&Value> {
        self.0.get("body")
    }

    pub fn validity_interval(&self) -> Option<ValidityInterval> {
        let interval = self.body()?.get("validityInterval")?;
        serde_json::from_value(interval.clone()).ok()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Uniform shape for every era after byron.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompatibleBlock {
    pub header: CompactHeader,
    pub header_hash: String,
    pub body: Vec<CompatibleTx>,
}
