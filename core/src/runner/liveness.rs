use tokio::sync::watch;

/// Launcher side of the "child is still running" flag. Flips once, on exit
/// or when dropped.
#[derive(Debug)]
pub struct LivenessSignal {
    tx: watch::Sender<bool>,
}

/// Relay side of the flag: can be queried or awaited.
#[derive(Debug, Clone)]
pub struct Liveness {
    rx: watch::Receiver<bool>,
}

impl LivenessSignal {
    pub fn channel() -> (Self, Liveness) {
        let (tx, rx) = watch::channel(true);
        (Self { tx }, Liveness { rx })
    }

    pub fn mark_exited(&self) {
        self.tx.send_replace(false);
    }
}

impl Drop for LivenessSignal {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

impl Liveness {
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the child has exited. Cancel safe.
    pub async fn exited(&self) {
        let mut rx = self.rx.clone();
        // Err means the signal is gone, which only happens after it flipped.
        let _ = rx.wait_for(|running| !*running).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_running_and_flips_once() {
        let (signal, liveness) = LivenessSignal::channel();
        assert!(liveness.is_running());

        let waiter = {
            let liveness = liveness.clone();
            tokio::spawn(async move { liveness.exited().await })
        };
        signal.mark_exited();

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("exited() should resolve")
            .unwrap();
        assert!(!liveness.is_running());
    }

    #[tokio::test]
    async fn dropping_the_signal_counts_as_exit() {
        let (signal, liveness) = LivenessSignal::channel();
        drop(signal);

        assert!(!liveness.is_running());
        tokio::time::timeout(Duration::from_secs(5), liveness.exited())
            .await
            .expect("exited() should resolve");
    }

    #[tokio::test]
    async fn exited_stays_pending_while_running() {
        let (_signal, liveness) = LivenessSignal::channel();
        let res = tokio::time::timeout(Duration::from_millis(20), liveness.exited()).await;
        assert!(res.is_err());
    }
}
