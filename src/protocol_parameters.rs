use crate::types::Era;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::convert::TryFrom;

// The one field that tells each parameter shape apart.
const SHELLEY_FIELD: &str = "minUtxoValue";
const ALONZO_FIELD: &str = "coinsPerUtxoWord";
const BABBAGE_FIELD: &str = "coinsPerUtxoByte";

/// Protocol parameters, tagged once on ingestion by their characteristic
/// field. Allegra and mary share the shelley shape.
#[derive(Debug, PartialEq, Clone)]
pub enum ProtocolParameters {
    Shelley(Value),
    Alonzo(Value),
    Babbage(Value),
}

impl ProtocolParameters {
    /// The earliest era whose parameters take this shape.
    pub fn era(&self) -> Era {
        match self {
            ProtocolParameters::Shelley(_) => Era::Shelley,
            ProtocolParameters::Alonzo(_) => Era::Alonzo,
            ProtocolParameters::Babbage(_) => Era::Babbage,
        }
    }

    pub fn is_shelley(&self) -> bool {
        matches!(self, ProtocolParameters::Shelley(_))
    }

    pub fn is_alonzo(&self) -> bool {
        matches!(self, ProtocolParameters::Alonzo(_))
    }

    pub fn is_babbage(&self) -> bool {
        matches!(self, ProtocolParameters::Babbage(_))
    }

    pub fn as_value(&self) -> &Value {
        match self {
            ProtocolParameters::Shelley(value)
            | ProtocolParameters::Alonzo(value)
            | ProtocolParameters::Babbage(value) => value,
        }
    }

    /// Lovelace charged per unit of output size, whichever unit this shape
    /// prices by. Shelley parameters have a flat minimum instead.
    pub fn coins_per_utxo_unit(&self) -> Option<u64> {
        match self {
            ProtocolParameters::Shelley(_) => None,
            ProtocolParameters::Alonzo(value) => value.get(ALONZO_FIELD)?.as_u64(),
            ProtocolParameters::Babbage(value) => value.get(BABBAGE_FIELD)?.as_u64(),
        }
    }
}

impl TryFrom<Value> for ProtocolParameters {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<ProtocolParameters> {
        let map = value.as_object().ok_or_else(|| {
            crate::Error::MalformedParameters(String::from("parameters are not a JSON object"))
        })?;
        let present = |field: &str| map.get(field).map_or(false, |value| !value.is_null());

        match (
            present(SHELLEY_FIELD),
            present(ALONZO_FIELD),
            present(BABBAGE_FIELD),
        ) {
            (true, false, false) => Ok(ProtocolParameters::Shelley(value)),
            (false, true, false) => Ok(ProtocolParameters::Alonzo(value)),
            (false, false, true) => Ok(ProtocolParameters::Babbage(value)),
            (false, false, false) => Err(crate::Error::MalformedParameters(String::from(
                "no characteristic field present",
            ))),
            _ => Err(crate::Error::MalformedParameters(String::from(
                "more than one characteristic field present",
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for ProtocolParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ProtocolParameters::try_from(value).map_err(de::Error::custom)
    }
}

impl Serialize for ProtocolParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}
