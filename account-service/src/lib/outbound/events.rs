pub mod consumer;
pub mod producer;

pub use consumer::KafkaEventConsumer;
pub use producer::KafkaEventProducer;
