//! Operator notifications
//!
//! The trading loop and the controller emit `Notification`s; a `Notifier`
//! delivers them to each recipient. Delivery runs concurrently per recipient
//! and a failure for one recipient never stops delivery to the others.
//! `dispatch` runs delivery on a detached task so callers never wait for it.

pub mod format;
pub mod types;

pub use format::{escape_html, format_notification};
pub use types::{Notification, TradeOrigin};

use crate::logger::{self, LogTag};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Chat ids that receive every notification
    fn recipients(&self) -> Vec<i64>;

    async fn send_to(&self, recipient: i64, notification: &Notification) -> Result<(), String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<(i64, String)>,
}

/// Deliver to every recipient concurrently
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) -> DeliveryReport {
    let results = join_all(notifier.recipients().into_iter().map(|recipient| async move {
        (recipient, notifier.send_to(recipient, notification).await)
    }))
    .await;

    let mut report = DeliveryReport::default();
    for (recipient, result) in results {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                logger::warning(
                    LogTag::System,
                    &format!(
                        "Failed to deliver {} to {}: {}",
                        notification.kind(),
                        recipient,
                        e
                    ),
                );
                report.failed.push((recipient, e));
            }
        }
    }
    report
}

/// Fire-and-forget delivery
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) -> JoinHandle<DeliveryReport> {
    tokio::spawn(async move { deliver(notifier.as_ref(), &notification).await })
}

/// Writes notifications to the log when no chat transport is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn recipients(&self) -> Vec<i64> {
        vec![0]
    }

    async fn send_to(&self, _recipient: i64, notification: &Notification) -> Result<(), String> {
        logger::info(
            LogTag::System,
            &format!("[notify] {}", format_notification(notification).replace('\n', " ")),
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_one_failing_recipient_does_not_block_others() {
        let notifier = RecordingNotifier::new(vec![1, 2, 3]).failing_for(2);
        let report = deliver(&notifier, &Notification::SessionStopped).await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert_eq!(notifier.delivered_to(1), vec![Notification::SessionStopped]);
        assert_eq!(notifier.delivered_to(3), vec![Notification::SessionStopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_recipient_does_not_delay_others() {
        let notifier = Arc::new(
            RecordingNotifier::new(vec![1, 2, 3]).stalling_for(2, Duration::from_secs(3600)),
        );
        let handle = dispatch(notifier.clone(), Notification::SessionStopped);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(notifier.delivered_to(1).len(), 1);
        assert_eq!(notifier.delivered_to(3).len(), 1);
        assert!(notifier.delivered_to(2).is_empty());

        let report = handle.await.unwrap();
        assert_eq!(report.delivered, 3);
    }
}
