use std::collections::HashSet;

use futures_util::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use acua_types::events::{GatewayEvent, Topic};

/// A live, cancellable view of the events for a set of topics.
///
/// Dropping it is the unsubscribe.
pub struct Subscription {
    rx: broadcast::Receiver<GatewayEvent>,
    topics: HashSet<Topic>,
}

impl Subscription {
    pub(crate) fn new(
        rx: broadcast::Receiver<GatewayEvent>,
        topics: impl IntoIterator<Item = Topic>,
    ) -> Self {
        Self {
            rx,
            topics: topics.into_iter().collect(),
        }
    }

    pub fn topics(&self) -> &HashSet<Topic> {
        &self.topics
    }

    pub fn add(&mut self, topics: impl IntoIterator<Item = Topic>) {
        self.topics.extend(topics);
    }

    pub fn remove(&mut self, topics: impl IntoIterator<Item = Topic>) {
        for topic in topics {
            self.topics.remove(&topic);
        }
    }

    pub fn matches(&self, event: &GatewayEvent) -> bool {
        event.topic().is_some_and(|t| self.topics.contains(&t))
    }

    /// Next event for one of the subscribed topics, or `None` once the
    /// dispatcher is gone. Cancel-safe.
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscription lagged by {} events", n);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = GatewayEvent> {
        async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use uuid::Uuid;

    use super::*;
    use crate::dispatcher::Dispatcher;
    use acua_types::poll::Poll;

    fn poll_update(post_id: Uuid) -> GatewayEvent {
        GatewayEvent::PollUpdate {
            post_id,
            poll: Poll {
                options: vec![],
                voters: Default::default(),
                total_votes: 0,
                ends_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn only_subscribed_topics_are_delivered() {
        let dispatcher = Dispatcher::new();
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut sub = dispatcher.subscribe([Topic::Post(watched)]);

        dispatcher.publish(poll_update(other));
        dispatcher.publish(poll_update(watched));

        match sub.recv().await {
            Some(GatewayEvent::PollUpdate { post_id, .. }) => assert_eq!(post_id, watched),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn topics_can_change_while_subscribed() {
        let dispatcher = Dispatcher::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut sub = dispatcher.subscribe([Topic::Post(first)]);

        sub.remove([Topic::Post(first)]);
        sub.add([Topic::Post(second)]);
        assert_eq!(sub.topics().len(), 1);
        assert!(sub.topics().contains(&Topic::Post(second)));
        dispatcher.publish(poll_update(first));
        dispatcher.publish(poll_update(second));

        match sub.recv().await {
            Some(GatewayEvent::PollUpdate { post_id, .. }) => assert_eq!(post_id, second),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_ends_when_dispatcher_is_dropped() {
        let dispatcher = Dispatcher::new();
        let post = Uuid::new_v4();
        let stream = dispatcher.subscribe([Topic::Post(post)]).into_stream();
        dispatcher.publish(poll_update(post));
        drop(dispatcher);

        let events: Vec<_> = tokio::time::timeout(Duration::from_secs(1), stream.collect())
            .await
            .expect("stream terminates");
        assert_eq!(events.len(), 1);
    }
}
