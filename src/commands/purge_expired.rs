use tracing::{info, warn};

use crate::controllers::paste;
use crate::storage::AnyStore;
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    if matches!(app.store, AnyStore::Memory(_)) {
        warn!("memory store configured, nothing persisted to purge");
        return Ok(());
    }

    let now = app.clock.now();
    let count = paste::purge_expired(&app.store, now).await?;
    if count == 0 {
        info!("no gone pastes at {now}");
    }
    Ok(())
}
