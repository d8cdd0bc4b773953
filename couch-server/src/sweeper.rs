use std::{sync::Arc, time::Duration};

use couch_collab::{Collab, Database};
use log::{error, info};
use tokio::{task::JoinHandle, time};

/// Periodically removes expired rooms and clients, which closed connections leave behind
pub fn spawn_sweeper<Db: Database>(collab: Arc<Collab<Db>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match collab.clear_expired().await {
                Ok(0) => {}
                Ok(cleared) => info!("Cleared {} expired records", cleared),
                Err(e) => error!("Failed to clear expired records: {}", e.chain()),
            }
        }
    })
}
