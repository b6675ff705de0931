use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures::StreamExt;
use rdkafka::consumer::CommitMode;
use rdkafka::consumer::Consumer;
use rdkafka::consumer::StreamConsumer;
use rdkafka::error::KafkaError;
use rdkafka::message::BorrowedMessage;
use rdkafka::ClientConfig;
use rdkafka::Message;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::domain::events::EventHandler;
use crate::domain::events::Topic;

#[derive(Debug, Error)]
enum MessageProcessingError {
    #[error("Kafka consumer error: {0}")]
    KafkaError(#[from] KafkaError),

    #[error("Message has no payload")]
    NoPayload,

    #[error("Failed to handle event: {0}")]
    HandlingError(String),
}

/// Kafka consumer dispatching every message of its topics to one handler.
///
/// Offsets are committed only after the handler succeeds. A failed message
/// is logged and left uncommitted for the broker to redeliver.
pub struct KafkaEventConsumer<H: EventHandler> {
    consumer: StreamConsumer,
    handler: Arc<H>,
    drain_timeout: Duration,
}

impl<H: EventHandler> KafkaEventConsumer<H> {
    /// Create a consumer and subscribe it to `topics`.
    ///
    /// # Arguments
    /// * `config` - Application configuration
    /// * `topics` - Topics to subscribe to
    /// * `handler` - Callback for each received message
    pub fn new(config: &Config, topics: &[Topic], handler: Arc<H>) -> Result<Self, anyhow::Error> {
        let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();

        tracing::info!(
            brokers = %config.kafka.brokers,
            group_id = %config.kafka.group_id,
            topics = ?names,
            "Initializing event consumer"
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("group.id", &config.kafka.group_id)
            .set("client.id", &config.kafka.client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&names)?;

        tracing::info!(topics = ?names, "Event consumer subscribed");

        Ok(Self {
            consumer,
            handler,
            drain_timeout: Duration::from_secs(config.kafka.shutdown_grace_seconds),
        })
    }

    /// Receive and dispatch messages until `shutdown` is cancelled.
    ///
    /// On cancellation no further message is received; a handler call already
    /// in flight gets up to the drain timeout to finish, then the consumer
    /// unsubscribes and closes.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Starting event consumer loop");

        let message_stream = self.consumer.stream();
        tokio::pin!(message_stream);

        loop {
            let result = match receive_or_cancel(&mut message_stream, &shutdown).await {
                Some(result) => result,
                None => break,
            };

            let processing = self.process_message(result);
            let outcome = match drain_or_cancel(processing, &shutdown, self.drain_timeout).await {
                Some(outcome) => outcome,
                None => break,
            };

            if let Err(error) = outcome {
                tracing::error!(error = %error, "Error processing event");

                // Add backoff on Kafka errors to avoid tight error loops
                if matches!(error, MessageProcessingError::KafkaError(_)) {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }

        self.consumer.unsubscribe();
        tracing::info!("Event consumer stopped");
    }

    async fn process_message(
        &self,
        result: Result<BorrowedMessage<'_>, KafkaError>,
    ) -> Result<(), MessageProcessingError> {
        let message = result?;
        let payload = message.payload().ok_or(MessageProcessingError::NoPayload)?;

        tracing::debug!(
            topic = %message.topic(),
            partition = message.partition(),
            offset = message.offset(),
            "Received event"
        );

        self.handler
            .handle(message.topic(), message.key(), payload)
            .await
            .map_err(|e| MessageProcessingError::HandlingError(e.to_string()))?;

        self.consumer.commit_message(&message, CommitMode::Async)?;

        Ok(())
    }
}

/// Next item of `stream`, or `None` once `shutdown` is cancelled.
///
/// Cancellation wins over a ready item so nothing new is picked up after shutdown.
async fn receive_or_cancel<S>(stream: &mut S, shutdown: &CancellationToken) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        next = stream.next() => next,
    }
}

/// Run `processing` to completion unless `shutdown` fires first, in which
/// case it gets at most `grace` more time. `None` means it was abandoned.
async fn drain_or_cancel<F>(
    processing: F,
    shutdown: &CancellationToken,
    grace: Duration,
) -> Option<F::Output>
where
    F: Future,
{
    tokio::pin!(processing);

    let finished = tokio::select! {
        outcome = &mut processing => Some(outcome),
        _ = shutdown.cancelled() => None,
    };
    if finished.is_some() {
        return finished;
    }

    tracing::info!(
        timeout_ms = grace.as_millis(),
        "Shutdown requested, draining in-flight event"
    );
    match tokio::time::timeout(grace, &mut processing).await {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            tracing::warn!("In-flight event did not finish before drain timeout");
            None
        }
    }
}
