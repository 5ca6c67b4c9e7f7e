pub mod broadcast;

pub use broadcast::BroadcastWorker;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background tasks built during boot and started once the listeners are up.
#[derive(Debug, Default)]
pub struct Workers {
    pub broadcast: Option<BroadcastWorker>,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(worker) = self.broadcast {
            tasks.push(tokio::spawn(worker.run(shutdown_rx)));
        } else {
            tracing::info!("Push disabled, no broadcast worker started");
        }
        tasks
    }
}
