use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::domain::events::Topic;
use crate::domain::user::events::ResetPasswordEvent;
use crate::domain::user::events::ResetPasswordMessage;
use crate::user::errors::EventPublisherError;
use crate::user::ports::EventPublisher;

#[derive(Debug, Error)]
pub enum KafkaProducerError {
    #[error("Failed to send message to Kafka: {0}")]
    SendError(String),

    #[error("Failed to serialize message: {0}")]
    SerializationError(String),
}

impl From<KafkaProducerError> for EventPublisherError {
    fn from(err: KafkaProducerError) -> Self {
        match err {
            KafkaProducerError::SerializationError(msg) => {
                EventPublisherError::SerializationFailed(msg)
            }
            KafkaProducerError::SendError(msg) => EventPublisherError::PublishFailed(msg),
        }
    }
}

pub struct KafkaEventProducer {
    producer: FutureProducer,
    timeout: Duration,
    // One publish at a time on the shared producer
    send_lock: Mutex<()>,
}

impl KafkaEventProducer {
    /// Create a new Kafka event producer with "at least once" delivery semantics
    ///
    /// # Arguments
    /// * `config` - Application configuration
    ///
    /// # Notes:
    /// - `acks=all`: Wait for all in-sync replicas to acknowledge
    /// - `enable.idempotence=true`: Retries keep per-partition order
    /// - `retry.backoff.ms=100`: Backoff between retry attempts
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        tracing::info!(
            brokers = %config.kafka.brokers,
            client_id = %config.kafka.client_id,
            "Initializing Kafka producer"
        );

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("client.id", &config.kafka.client_id)
            .set("message.timeout.ms", "30000")
            .set("compression.type", "gzip")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("retries", "10")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retry.backoff.ms", "100")
            .create()?;

        tracing::info!("Kafka producer initialized successfully");

        Ok(Self {
            producer,
            timeout: Duration::from_secs(30),
            send_lock: Mutex::new(()),
        })
    }

    /// Publish a JSON payload without a partitioning key.
    ///
    /// # Arguments
    /// * `topic` - Destination topic
    /// * `payload` - Value serialized as JSON
    ///
    /// # Errors
    /// * `SerializationError` - Payload cannot be encoded
    /// * `SendError` - Broker did not acknowledge after all retries
    pub async fn publish<T: Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<(), KafkaProducerError> {
        let payload = Self::encode(payload)?;
        let record = FutureRecord::<(), String>::to(topic).payload(&payload);

        self.send(topic, record).await
    }

    /// Publish a JSON payload with a partitioning key.
    ///
    /// Messages sharing a key land on the same partition and are consumed in send order.
    ///
    /// # Arguments
    /// * `topic` - Destination topic
    /// * `key` - Partitioning key
    /// * `payload` - Value serialized as JSON
    ///
    /// # Errors
    /// * `SerializationError` - Payload cannot be encoded
    /// * `SendError` - Broker did not acknowledge after all retries
    pub async fn publish_with_key<T: Serialize>(
        &self,
        topic: &str,
        key: &[u8],
        payload: &T,
    ) -> Result<(), KafkaProducerError> {
        let payload = Self::encode(payload)?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        self.send(topic, record).await
    }

    fn encode<T: Serialize>(payload: &T) -> Result<String, KafkaProducerError> {
        serde_json::to_string(payload)
            .map_err(|e| KafkaProducerError::SerializationError(e.to_string()))
    }

    async fn send<K>(
        &self,
        topic: &str,
        record: FutureRecord<'_, K, String>,
    ) -> Result<(), KafkaProducerError>
    where
        K: rdkafka::message::ToBytes + ?Sized,
    {
        let _guard = self.send_lock.lock().await;

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map(|(partition, offset)| {
                tracing::debug!(topic = %topic, partition, offset, "Event published");
            })
            .map_err(|(err, _)| {
                tracing::error!(
                    topic = %topic,
                    error = %err,
                    "Failed to publish event to Kafka after all retries"
                );
                KafkaProducerError::SendError(err.to_string())
            })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventProducer {
    async fn publish_password_reset(
        &self,
        event: &ResetPasswordEvent,
    ) -> Result<(), EventPublisherError> {
        let message = ResetPasswordMessage::from(event);

        self.publish_with_key(
            Topic::ResetPassword.as_str(),
            event.email.as_bytes(),
            &message,
        )
        .await
        .map_err(EventPublisherError::from)
    }
}
