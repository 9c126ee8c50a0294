//! Kafka-backed implementation of the message-bus boundary.

use async_trait::async_trait;
use futures::FutureExt;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::warn;

use super::{BusError, Delivery, MessageBus};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaBus {
    producer: FutureProducer,
}

impl KafkaBus {
    pub fn new(brokers: &str, client_id: &str) -> Result<Self, BusError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .create::<FutureProducer>()
            .map_err(|e| BusError::Config(e.to_string()))?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl MessageBus for KafkaBus {
    fn enqueue(&self, topic: &str, key: &str, payload: &[u8]) -> Result<Delivery, BusError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send_result(record) {
            Ok(delivery) => Ok(delivery
                .map(|result| match result {
                    Ok(Ok(_partition_offset)) => Ok(()),
                    Ok(Err((err, _message))) => Err(BusError::Delivery(err.to_string())),
                    Err(_canceled) => Err(BusError::Closed),
                })
                .boxed()),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(BusError::QueueFull)
            }
            Err((err, _)) => Err(BusError::Delivery(err.to_string())),
        }
    }

    async fn close(&self) {
        if let Err(err) = self.producer.flush(Timeout::After(FLUSH_TIMEOUT)) {
            warn!(error = %err, "failed to flush producer on close");
        }
    }
}
