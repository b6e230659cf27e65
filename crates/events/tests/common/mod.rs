#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use userhub_events::channel::ChannelError;
use userhub_events::{
    ActionResolver, DeliveryPolicy, EventPublisher, EventSubscriber, InMemoryBroker, MailError,
    MailSender, NotificationDispatcher, PartitionKey, RecordingMailer, RetryPolicy,
};

pub const TOPIC: &str = "user-events";
pub const GROUP: &str = "notification-group";

/// Publisher on `broker` with the given key strategy.
pub fn publisher(broker: &InMemoryBroker, key: PartitionKey) -> EventPublisher {
    EventPublisher::new(Arc::new(broker.clone()), TOPIC).with_partition_key(key)
}

/// Subscriber of the notification group on `broker`, sending through
/// `mailer`.
pub fn subscriber(
    broker: &InMemoryBroker,
    mailer: &Arc<RecordingMailer>,
    policy: DeliveryPolicy,
) -> EventSubscriber {
    let resolver = ActionResolver::new(mailer.clone()).with_timeout(Duration::from_secs(1));
    EventSubscriber::new(
        Arc::new(broker.clone()),
        TOPIC,
        GROUP,
        NotificationDispatcher::new(resolver),
    )
    .with_policy(policy)
}

/// Retry policy with millisecond delays.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::exponential(max_retries, Duration::from_millis(1), Duration::from_millis(5))
}

/// Close `broker` and run `subscriber` until it has drained every record.
pub async fn drain(broker: &InMemoryBroker, subscriber: &EventSubscriber) {
    use userhub_events::BrokerChannel;

    broker.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), subscriber.run(CancellationToken::new()))
        .await
        .expect("subscriber did not drain the closed channel")
        .unwrap();
}

/// A subscriber running on its own task.
pub struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), ChannelError>>,
}

pub fn spawn(subscriber: EventSubscriber) -> Running {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { subscriber.run(token).await });
    Running { cancel, handle }
}

impl Running {
    /// Cancel and wait for the loop to finish its in-flight delivery.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Fire the cancellation token without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit, failing the test after five seconds.
    pub async fn join(self) {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("subscriber did not exit")
            .unwrap()
            .unwrap();
    }
}

/// Mail sender that holds every call until the test releases it.
pub struct GatedMailer {
    entered: Notify,
    gate: Semaphore,
    delivered: AtomicUsize,
}

impl GatedMailer {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            delivered: AtomicUsize::new(0),
        }
    }

    /// Wait until a `send_email` call is blocked on the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one blocked call through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailSender for GatedMailer {
    async fn send_email(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| MailError::Unavailable("gate closed".into()))?;
        permit.forget();
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `check` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
