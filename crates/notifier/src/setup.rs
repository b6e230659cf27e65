//! Construction of the notifier's components from configuration.

use std::sync::Arc;

use userhub_events::{
    ActionResolver, ChannelHandle, DeliveryPolicy, EventSubscriber, LogMailer, MailError,
    MailSender, NotificationDispatcher, SmtpMailer, TopicDeadLetterSink,
};

use crate::config::NotifierConfig;

/// SMTP when configured, otherwise the logging mailer.
pub fn build_mailer(config: &NotifierConfig) -> Result<Arc<dyn MailSender>, MailError> {
    match &config.email {
        Some(email) => Ok(Arc::new(SmtpMailer::new(email)?)),
        None => {
            tracing::warn!("SMTP_HOST not set, notification emails are only logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub fn build_dispatcher(
    config: &NotifierConfig,
    mailer: Arc<dyn MailSender>,
) -> NotificationDispatcher {
    NotificationDispatcher::new(ActionResolver::new(mailer).with_timeout(config.mail_timeout))
}

/// The subscription on the user events topic, with the configured delivery
/// policy. Dead letters go to the same channel as the events.
pub fn build_subscriber(
    config: &NotifierConfig,
    channel: ChannelHandle,
    dispatcher: NotificationDispatcher,
) -> EventSubscriber {
    let mut policy = DeliveryPolicy::baseline().with_retry(config.mail_retry);
    if let Some(topic) = &config.dead_letter_topic {
        tracing::info!(topic = %topic, "Dead-lettering enabled");
        policy = policy.with_dead_letter(Arc::new(TopicDeadLetterSink::new(
            Arc::clone(&channel),
            topic.clone(),
        )));
    }

    EventSubscriber::new(
        channel,
        config.broker.topic.clone(),
        config.broker.group_id.clone(),
        dispatcher,
    )
    .with_policy(policy)
}
