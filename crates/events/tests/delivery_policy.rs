//! Retry and dead-letter handling of failed notifications.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{drain, eventually, fast_retry, publisher, spawn, subscriber, GROUP, TOPIC};
use userhub_core::envelope::Operation;
use userhub_events::delivery::MailFailure;
use userhub_events::{
    DeadLetter, DeliveryPolicy, InMemoryBroker, PartitionKey, RecordingMailer,
    TopicDeadLetterSink,
};

const DLQ: &str = "user-events.dead-letter";

fn dead_letter_policy(dlq: &InMemoryBroker) -> DeliveryPolicy {
    DeliveryPolicy::baseline().with_dead_letter(Arc::new(TopicDeadLetterSink::new(
        Arc::new(dlq.clone()),
        DLQ,
    )))
}

async fn publish_create(broker: &InMemoryBroker, email: &str) {
    publisher(broker, PartitionKey::None)
        .publish(Operation::Create, email)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn baseline_drops_failed_notification_and_acknowledges() {
    let broker = InMemoryBroker::default();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_next([MailFailure::Transient]);

    publish_create(&broker, "a@example.com").await;
    drain(&broker, &subscriber(&broker, &mailer, DeliveryPolicy::baseline())).await;

    assert_eq!(mailer.attempts(), 1);
    assert!(mailer.sent().is_empty());
    assert!(broker.fully_acknowledged(TOPIC, GROUP).await);
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let broker = InMemoryBroker::default();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_next([MailFailure::Transient, MailFailure::Transient]);

    publish_create(&broker, "a@example.com").await;
    let policy = DeliveryPolicy::baseline().with_retry(fast_retry(3));
    drain(&broker, &subscriber(&broker, &mailer, policy)).await;

    assert_eq!(mailer.attempts(), 3);
    assert_eq!(mailer.sent().len(), 1);
    assert!(broker.fully_acknowledged(TOPIC, GROUP).await);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let broker = InMemoryBroker::default();
    let dlq = InMemoryBroker::default();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_next([MailFailure::Permanent]);

    publish_create(&broker, "a@example.com").await;
    let policy = dead_letter_policy(&dlq).with_retry(fast_retry(5));
    drain(&broker, &subscriber(&broker, &mailer, policy)).await;

    assert_eq!(mailer.attempts(), 1);
    let letters = dlq.records(DLQ).await;
    assert_eq!(letters.len(), 1);
    let letter: DeadLetter = serde_json::from_slice(&letters[0].payload).unwrap();
    assert_eq!(letter.attempts, 1);
}

// ---------------------------------------------------------------------------
// Dead letter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exhausted_retries_are_dead_lettered_and_acknowledged() {
    let broker = InMemoryBroker::default();
    let dlq = InMemoryBroker::default();
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_always(Some(MailFailure::Transient));

    publish_create(&broker, "a@example.com").await;
    let policy = dead_letter_policy(&dlq).with_retry(fast_retry(2));
    drain(&broker, &subscriber(&broker, &mailer, policy)).await;

    assert_eq!(mailer.attempts(), 3);
    assert!(broker.fully_acknowledged(TOPIC, GROUP).await);

    let letters = dlq.records(DLQ).await;
    assert_eq!(letters.len(), 1);
    let letter: DeadLetter = serde_json::from_slice(&letters[0].payload).unwrap();
    assert_eq!(letter.topic, TOPIC);
    assert_eq!(letter.attempts, 3);
    assert!(letter.payload.contains("a@example.com"));
    assert!(letter.error.contains("unavailable"));
}

#[tokio::test]
async fn failed_dead_letter_write_leaves_delivery_for_redelivery() {
    let broker = InMemoryBroker::default();
    let dlq = InMemoryBroker::default();
    dlq.set_available(false);
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_always(Some(MailFailure::Permanent));

    publish_create(&broker, "a@example.com").await;

    let running = spawn(subscriber(&broker, &mailer, dead_letter_policy(&dlq)));
    let m = &mailer;
    eventually(move || async move { m.attempts() == 1 }).await;
    running.stop().await;

    assert!(!broker.fully_acknowledged(TOPIC, GROUP).await);
    assert!(mailer.sent().is_empty());

    // The next consumer of the group gets the same delivery again.
    mailer.fail_always(None);
    let running = spawn(subscriber(&broker, &mailer, dead_letter_policy(&dlq)));
    let b = &broker;
    eventually(move || b.fully_acknowledged(TOPIC, GROUP)).await;
    running.stop().await;

    assert_eq!(mailer.attempts(), 2);
    assert_eq!(mailer.sent().len(), 1);
    assert!(dlq.records(DLQ).await.is_empty());
}

#[tokio::test]
async fn unacknowledged_delivery_is_not_skipped_by_later_acks() {
    let broker = InMemoryBroker::new(1);
    let dlq = InMemoryBroker::default();
    dlq.set_available(false);
    let mailer = Arc::new(RecordingMailer::new());
    mailer.fail_next([MailFailure::Permanent]);

    publish_create(&broker, "first@example.com").await;
    publish_create(&broker, "second@example.com").await;

    let subscriber = subscriber(&broker, &mailer, dead_letter_policy(&dlq))
        .with_redelivery_backoff(Duration::from_millis(10));
    let running = spawn(subscriber);
    let b = &broker;
    eventually(move || b.fully_acknowledged(TOPIC, GROUP)).await;
    running.stop().await;

    let recipients: Vec<String> = mailer.sent().into_iter().map(|m| m.recipient).collect();
    assert_eq!(recipients, vec!["first@example.com", "second@example.com"]);
    assert_eq!(mailer.attempts(), 3);
    assert_eq!(broker.committed_offsets(TOPIC, GROUP).await, vec![2]);
    assert!(dlq.records(DLQ).await.is_empty());
}
