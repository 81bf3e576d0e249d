/*!
# Ogmios Chain Sync

A client for the chain-sync protocol served by an Ogmios node. It follows the
tip of a Cardano chain, delivering an ordered stream of roll forward (new
block) and roll backward (reorganization) events to your callbacks, starting
from a negotiated intersection point.

The block normalizer reshapes every post-byron block into one uniform,
shelley-compatible form, so consumers do not need to know which era a block
came from.

# Usage

```no_run
use ogmios_sync::{Block, ChainPoint, ChainSyncClient, ClientConfig, RollCallbacks, StartPoint};

struct Printer;

#[async_trait::async_trait]
impl RollCallbacks for Printer {
    async fn roll_forward(&mut self, block: Block) {
        println!("forward {}", block.era());
    }
    async fn roll_backward(&mut self, point: ChainPoint) {
        println!("backward {}", point);
    }
}

# async fn follow() -> ogmios_sync::Result<()> {
let config = ClientConfig::new("ws://127.0.0.1:1337").with_start_point(Some(StartPoint::Tip));
let mut client = ChainSyncClient::connect(&config, Printer).await?;
client.start().await?;
client.run().await
# }
```

*/
#[macro_use]
extern crate lazy_static;

pub mod error;
pub mod networking;
pub mod normalizer;
pub mod protocol_parameters;
pub mod settings;
pub mod types;

#[cfg(test)]
mod test_setup;
#[cfg(test)]
pub mod test_utilities;

pub use error::Error;
pub use networking::client::{ChainSyncClient, RollCallbacks, SessionState, StopHandle};
pub use normalizer::{detect_era, normalize, project_earliest_era, NormalizedBlock};
pub use settings::ClientConfig;
pub use types::{
    Block, ChainPoint, CompactHeader, CompatibleBlock, CompatibleTx, Era, Point, StartPoint,
    POINT_SHELLEY_START,
};

pub type Result<T> = std::result::Result<T, Error>;
