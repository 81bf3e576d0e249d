/*!
# Block Normalizer

Stateless projections from era-keyed blocks into the shelley-compatible
shape. Byron blocks have no compatible form and are handed back natively.

Nothing here performs I/O or holds state; every function can be called from
any task, as often as needed, and always yields a fresh value the caller owns.
*/
use crate::types::{Block, CompactHeader, CompatibleBlock, CompatibleTx, Era};
use serde_json::{json, Map, Value};

/// A block after projection, with the era it came from.
#[derive(Debug, PartialEq, Clone)]
pub struct NormalizedBlock {
    pub block: CompatibleBlock,
    pub era: Era,
}

/// Returns the single era key populated in a raw JSON block.
///
/// A key whose value is `null` does not count as populated. Unknown keys,
/// no populated era, or more than one populated era are all malformed.
pub fn detect_era(value: &Value) -> crate::Result<Era> {
    let map = value
        .as_object()
        .ok_or_else(|| crate::Error::malformed_block("block is not a JSON object"))?;

    let mut found: Option<Era> = None;
    for (key, payload) in map {
        let era = Era::from_key(key)
            .ok_or_else(|| crate::Error::malformed_block(format!("unknown era key {}", key)))?;
        if payload.is_null() {
            continue;
        }
        if let Some(first) = found {
            return Err(crate::Error::malformed_block(format!(
                "block populates both {} and {}",
                first, era
            )));
        }
        found = Some(era);
    }
    found.ok_or_else(|| crate::Error::malformed_block("block has no era populated"))
}

/// The native byron payload, or `None` for every later era.
pub fn project_earliest_era(block: &Block) -> Option<&Value> {
    match block {
        Block::Byron(payload) if !payload.is_null() => Some(payload),
        _ => None,
    }
}

/// Projects a shelley-or-later block into its compatible form.
///
/// Returns `Ok(None)` for byron blocks and for blocks whose era payload is
/// not an object. Missing header fields fail with `MalformedBlock` rather
/// than producing a partial header.
pub fn normalize(block: &Block) -> crate::Result<Option<NormalizedBlock>> {
    let era = block.era();
    if era.is_earliest() {
        return Ok(None);
    }
    let payload = match block.payload().as_object() {
        Some(payload) => payload,
        None => return Ok(None),
    };

    let header = compact_header(
        payload
            .get("header")
            .ok_or_else(|| crate::Error::malformed_block(format!("{} block has no header", era)))?,
    )?;
    let header_hash = required_str(payload, "headerHash")?;
    let body = payload
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| crate::Error::malformed_block(format!("{} block has no body", era)))?
        .iter()
        .map(|tx| compatible_tx(era, tx))
        .collect::<crate::Result<Vec<CompatibleTx>>>()?;

    Ok(Some(NormalizedBlock {
        block: CompatibleBlock {
            header,
            header_hash,
            body,
        },
        era,
    }))
}

/// Copies the header fields common to every era. No field is derived.
pub fn compact_header(header: &Value) -> crate::Result<CompactHeader> {
    let header = header
        .as_object()
        .ok_or_else(|| crate::Error::malformed_block("header is not a JSON object"))?;
    Ok(CompactHeader {
        block_hash: required_str(header, "blockHash")?,
        block_height: required_u64(header, "blockHeight")?,
        block_size: required_u64(header, "blockSize")?,
        prev_hash: required_str(header, "prevHash")?,
        slot: required_u64(header, "slot")?,
    })
}

fn compatible_tx(era: Era, tx: &Value) -> crate::Result<CompatibleTx> {
    let mut tx = tx.clone();
    if era == Era::Shelley {
        let body = tx
            .get_mut("body")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| crate::Error::malformed_block("shelley transaction has no body"))?;
        if !body.contains_key("validityInterval") {
            let invalid_hereafter = body.get("timeToLive").cloned().unwrap_or(Value::Null);
            body.insert(
                String::from("validityInterval"),
                json!({
                    "invalidBefore": null,
                    "invalidHereafter": invalid_hereafter,
                }),
            );
        }
    }
    Ok(CompatibleTx::new(tx))
}

fn required_str(map: &Map<String, Value>, field: &str) -> crate::Result<String> {
    map.get(field)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| crate::Error::malformed_block(format!("missing string field {}", field)))
}

fn required_u64(map: &Map<String, Value>, field: &str) -> crate::Result<u64> {
    map.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| crate::Error::malformed_block(format!("missing integer field {}", field)))
}
