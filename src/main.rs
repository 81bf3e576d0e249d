/*!
# Ogmios Chain Sync Command Line Interface

Follows an Ogmios node and logs every roll forward and roll backward.

## Help

```bash
ogmios_sync --help
```

## Example Usage

```bash
ogmios_sync --url=ws://127.0.0.1:1337 --start=tip
ogmios_sync --start=shelley --compact
ogmios_sync --start=4492799.f8084c61b6a238acec985b59310b6ecec49c0ab8352249afd7268da5cff2a457
```

## Dev

To run from source:

```bash
RUST_LOG=debug cargo run -- --config=config --start=origin
```
*/

use async_trait::async_trait;
use clap::{App, Arg};
use ogmios_sync::networking::signals::signal_for_shutdown;
use ogmios_sync::settings::DEFAULT_CONFIG_NAME;
use ogmios_sync::{
    normalize, project_earliest_era, Block, ChainPoint, ChainSyncClient, ClientConfig,
    RollCallbacks, StartPoint,
};
use tracing::{error, event, info, warn, Level};

/// Logs each event; with `compact` set, blocks are normalized first.
struct TailCallbacks {
    compact: bool,
}

#[async_trait]
impl RollCallbacks for TailCallbacks {
    async fn roll_forward(&mut self, block: Block) {
        if !self.compact {
            event!(Level::INFO, "roll forward: {} block", block.era());
            return;
        }
        if let Some(byron) = project_earliest_era(&block) {
            info!(
                "roll forward: byron block {}",
                byron.get("hash").and_then(|hash| hash.as_str()).unwrap_or("?")
            );
            return;
        }
        match normalize(&block) {
            Ok(Some(normalized)) => {
                let header = &normalized.block.header;
                info!(
                    "roll forward: {} block {} at slot {} (height {}, {} bytes, {} txs)",
                    normalized.era,
                    normalized.block.header_hash,
                    header.slot,
                    header.block_height,
                    header.block_size,
                    normalized.block.body.len()
                );
            }
            Ok(None) => warn!("roll forward: {} block without a payload", block.era()),
            Err(err) => error!("roll forward: cannot normalize {} block: {}", block.era(), err),
        }
    }

    async fn roll_backward(&mut self, point: ChainPoint) {
        event!(Level::INFO, "roll backward: {}", point);
    }
}

#[tokio::main]
pub async fn main() -> ogmios_sync::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = App::new("Ogmios Chain Sync")
        .about("Follows the chain served by an Ogmios node")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("config file name"),
        )
        .arg(
            Arg::with_name("url")
                .short("u")
                .long("url")
                .takes_value(true)
                .help("websocket address of the node"),
        )
        .arg(
            Arg::with_name("start")
                .short("s")
                .long("start")
                .takes_value(true)
                .help("origin, tip, shelley or <slot>.<hash>"),
        )
        .arg(
            Arg::with_name("pipeline")
                .short("p")
                .long("pipeline")
                .takes_value(true)
                .help("number of RequestNext messages kept in flight"),
        )
        .arg(
            Arg::with_name("compact")
                .long("compact")
                .help("log normalized blocks"),
        )
        .get_matches();

    let config_name = matches.value_of("config").unwrap_or(DEFAULT_CONFIG_NAME);
    let mut config = ClientConfig::load(config_name)?;
    if let Some(url) = matches.value_of("url") {
        config.url = String::from(url);
    }
    if let Some(start) = matches.value_of("start") {
        config.start_point = Some(start.parse::<StartPoint>()?);
    }
    if let Some(pipeline) = matches.value_of("pipeline") {
        config.pipeline_depth = pipeline
            .parse()
            .map_err(|err| ogmios_sync::Error::config(format!("pipeline {}: {}", pipeline, err)))?;
    }
    config.validate()?;

    let callbacks = TailCallbacks {
        compact: matches.is_present("compact"),
    };
    let mut client = ChainSyncClient::connect(&config, callbacks).await?;

    let stop_handle = client.stop_handle();
    tokio::spawn(async move {
        if let Err(err) = signal_for_shutdown().await {
            error!("cannot listen for shutdown signals: {}", err);
            return;
        }
        info!("Shutting down!");
        stop_handle.stop();
    });

    client.start().await?;
    client.run().await
}
