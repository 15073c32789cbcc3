use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Cancels a running crawl.
///
/// Once stopped, no new description attempts are started and in-flight ones
/// are abandoned. A stopped handle stays stopped.
#[derive(Clone)]
pub struct StopHandle {
    tx: broadcast::Sender<()>,
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel::<()>(8);
        Self {
            tx,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // No receivers simply means nothing is running yet.
        let _res = self.tx.send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
            stopped: self.stopped.clone(),
        }
    }

    /// A new handle that is stopped whenever this one is, but can also be
    /// stopped on its own without affecting this one.
    ///
    /// The returned task forwards the stop; abort it once the child is no
    /// longer needed.
    pub fn child(&self) -> (StopHandle, JoinHandle<()>) {
        let child = StopHandle::new();
        let mut parent = self.subscribe();
        let forward = child.clone();
        let handle = tokio::spawn(async move {
            parent.stopped().await;
            forward.stop();
        });
        (child, handle)
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StopListener {
    rx: broadcast::Receiver<()>,
    stopped: Arc<AtomicBool>,
}

impl StopListener {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&mut self) {
        if self.is_stopped() {
            return;
        }
        loop {
            match self.rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => return,
                Err(RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}
