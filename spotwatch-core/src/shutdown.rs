//! Process-wide stop signal.
//!
//! The binary owns a `watch::Sender<bool>` and flips it to `true` once.
//! Long-running loops hold a receiver and race their work against
//! [`shutdown_requested`].

use tokio::sync::watch;

/// Completes once `rx` observes `true`, or its sender is gone.
pub async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Non-blocking check of the current value.
pub fn is_shutdown(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_on_flip() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { shutdown_requested(&mut rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_completes_when_already_set() {
        let (_tx, mut rx) = watch::channel(true);
        shutdown_requested(&mut rx).await;
        assert!(is_shutdown(&rx));
    }

    #[tokio::test]
    async fn test_completes_on_sender_drop() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        shutdown_requested(&mut rx).await;
        assert!(!is_shutdown(&rx));
    }
}
