//! In-process topic for download notifications.
//!
//! Publishing is fire-and-forget: it never blocks and never fails the caller.
//! Events published while nobody is subscribed are dropped.

use crate::models::event::DownloadRequested;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

const TOPIC_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct EventPublisher {
    topic: String,
    sender: broadcast::Sender<DownloadRequested>,
}

impl EventPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(TOPIC_CAPACITY);
        Self {
            topic: topic.into(),
            sender,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadRequested> {
        self.sender.subscribe()
    }

    /// Publish `event`. Returns the number of subscribers that received it.
    pub fn publish(&self, event: DownloadRequested) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    topic = %self.topic,
                    drs_id = %event.drs_id,
                    "no subscribers, download notification dropped"
                );
                0
            }
        }
    }

    /// Spawn a subscriber that logs every event on the topic.
    pub fn spawn_logger(&self) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        let topic = self.topic.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => info!(
                        target: "download_request",
                        topic = %topic,
                        event_id = %event.event_id,
                        drs_id = %event.drs_id,
                        access_id = %event.access_id,
                        user_id = %event.user_id,
                        "download requested"
                    ),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(topic = %topic, missed, "download notification logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new("download_request");
        assert_eq!(
            publisher.publish(DownloadRequested::new("download_request", "a", "s3", "u")),
            0
        );
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let publisher = EventPublisher::new("download_request");
        let mut rx = publisher.subscribe();

        let event = DownloadRequested::new(publisher.topic(), "Test1.txt", "s3", "alice");
        assert_eq!(publisher.publish(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn logger_stops_when_topic_closes() {
        let publisher = EventPublisher::new("download_request");
        let handle = publisher.spawn_logger();
        publisher.publish(DownloadRequested::new("download_request", "a", "s3", "u"));
        drop(publisher);
        handle.await.unwrap();
    }
}
