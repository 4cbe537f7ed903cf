use tokio::sync::watch;

/// Owner side of a cancellation signal for in-flight client calls.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

/// Receiver side, threaded into [`ApiClient::get_with_signal`](super::ApiClient::get_with_signal).
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller aborts. Never resolves if the
    /// controller is dropped without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_after_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        controller.abort();

        assert!(signal.is_aborted());
        tokio::time::timeout(Duration::from_secs(1), signal.aborted())
            .await
            .expect("signal should resolve once aborted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_controller_never_fires() {
        let signal = AbortController::new().signal();
        let outcome = tokio::time::timeout(Duration::from_secs(5), signal.aborted()).await;
        assert!(outcome.is_err());
    }
}
