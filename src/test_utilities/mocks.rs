use crate::types::{Block, Era};
use serde_json::{json, Value};

pub fn mock_hash(seed: u64) -> String {
    format!("{:064x}", seed)
}

pub fn make_mock_header(height: u64) -> Value {
    let prev_hash = if height == 0 {
        String::from("genesis")
    } else {
        mock_hash(height - 1)
    };
    json!({
        "blockHash": mock_hash(height),
        "blockHeight": height,
        "blockSize": 1024 + height,
        "prevHash": prev_hash,
        "slot": height * 20,
        "issuerVk": "8b0960d234bda67d52432c5d1a26aca2bfb5b9a09f966d9592a7bf0c728a1ecd",
        "protocolVersion": { "major": 7, "minor": 0 }
    })
}

/// A shelley-or-later block at `height` carrying `txs`.
pub fn make_mock_block(era: Era, height: u64, txs: Vec<Value>) -> Block {
    Block::new(
        era,
        json!({
            "header": make_mock_header(height),
            "headerHash": mock_hash(1_000_000 + height),
            "body": txs,
        }),
    )
}

pub fn make_mock_byron_block(height: u64) -> Block {
    Block::Byron(json!({
        "hash": mock_hash(height),
        "header": {
            "blockHeight": height,
            "slot": height * 20,
            "prevHash": mock_hash(height.saturating_sub(1)),
            "genesisKey": "c3f0a6b4d3e2"
        },
        "body": { "txPayload": [], "updatePayload": {} }
    }))
}

/// A transaction in `era`'s native shape. Shelley transactions carry
/// `timeToLive` when `ttl` is given; later eras carry their own
/// `validityInterval`.
pub fn make_mock_tx(era: Era, index: u64, ttl: Option<u64>) -> Value {
    let mut body = json!({
        "inputs": [{ "txId": mock_hash(index), "index": 0 }],
        "outputs": [{ "address": "addr_test1vz09v9yfxguvlp0zsnrpa3tdtm7el8xufp3m5lsm7qxzclgmzkket", "value": { "coins": 2000000 } }],
        "certificates": [],
        "withdrawals": {},
        "fee": 170000,
        "update": null
    });
    match (era, ttl) {
        (Era::Shelley, Some(ttl)) => {
            body["timeToLive"] = json!(ttl);
        }
        (Era::Shelley, None) => {}
        _ => {
            body["validityInterval"] = json!({ "invalidBefore": index, "invalidHereafter": ttl });
        }
    }
    json!({
        "id": mock_hash(10_000 + index),
        "body": body,
        "witness": { "signatures": {}, "scripts": {}, "bootstrap": [] },
        "metadata": null,
        "raw": "84a400"
    })
}
