//! Publishing collaborators
//!
//! A [`Publisher`] turns a [`ReaderState`] snapshot into one upload. Two
//! variants exist: a compact MQTT message and a nested document written to a
//! cloud store. Both own their transport and expose the same readiness and
//! event-pump hooks to the scheduler.

use core::future::Future;

use hal_abstractions::{DocumentStore, MqttTransport, StoreResult};
use heapless::String;

use crate::config::{DocumentConfig, MqttConfig};
use crate::error::{PayloadError, PublishError};
use crate::fmt::Debug2Format;
use crate::payload::{document_payload, mqtt_payload, mqtt_topic, TOPIC_LEN};
use crate::sensor::ReaderState;

/// What happened to a snapshot handed to a publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// Delivered to the transport
    Sent,
    /// Deliberately not sent (nothing worth uploading)
    Skipped,
}

/// Upload sink driven by the scheduler
pub trait Publisher {
    /// Pump transport events; called once per loop iteration
    fn service(&mut self) -> impl Future<Output = ()>;

    /// Transport can accept an upload right now
    fn is_ready(&self) -> bool;

    /// Upload one snapshot, `timestamp` being the local wall clock
    fn publish(
        &mut self,
        state: &ReaderState,
        timestamp: &str,
    ) -> impl Future<Output = Result<PublishOutcome, PublishError>>;
}

/// Publishes the compact payload to `<prefix>/<device_id>`
pub struct MqttPublisher<T> {
    transport: T,
    topic: String<TOPIC_LEN>,
}

impl<T: MqttTransport> MqttPublisher<T> {
    pub fn new(config: &MqttConfig, device_id: &str, transport: T) -> Result<Self, PayloadError> {
        let topic = mqtt_topic(config.topic_prefix, device_id)?;
        info!("MQTT topic: {}", topic.as_str());
        Ok(Self { transport, topic })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: MqttTransport> Publisher for MqttPublisher<T> {
    async fn service(&mut self) {
        self.transport.poll().await;
    }

    fn is_ready(&self) -> bool {
        self.transport.is_connected()
    }

    async fn publish(
        &mut self,
        state: &ReaderState,
        _timestamp: &str,
    ) -> Result<PublishOutcome, PublishError> {
        if !self.transport.is_connected() {
            return Err(PublishError::NotReady);
        }

        let payload = mqtt_payload(state)?;
        self.transport
            .publish(&self.topic, payload.as_bytes())
            .await
            .map_err(|e| {
                error!("MQTT publish failed: {:?}", Debug2Format(&e));
                PublishError::Transport
            })?;

        info!("Published {} bytes to {}", payload.len(), self.topic.as_str());
        Ok(PublishOutcome::Sent)
    }
}

/// Creates one document per snapshot in a cloud store
pub struct DocumentPublisher<T> {
    store: T,
    config: DocumentConfig,
}

impl<T: DocumentStore> DocumentPublisher<T> {
    pub fn new(config: DocumentConfig, store: T) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &T {
        &self.store
    }
}

impl<T: DocumentStore> Publisher for DocumentPublisher<T> {
    async fn service(&mut self) {
        self.store.poll().await;
    }

    fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    async fn publish(
        &mut self,
        state: &ReaderState,
        timestamp: &str,
    ) -> Result<PublishOutcome, PublishError> {
        if !self.store.is_ready() {
            return Err(PublishError::NotReady);
        }
        if state.air_enabled && !state.air.is_numeric() {
            warn!("Air reading is NaN, skipping document upload");
            return Ok(PublishOutcome::Skipped);
        }

        let body = document_payload(state, timestamp)?;
        let result = self.store.create_document(self.config.path, &body).await;
        resolve_store_result(&result).map(|_| PublishOutcome::Sent)
    }
}

/// Log a document store result and decide whether the write failed
pub fn resolve_store_result(result: &StoreResult) -> Result<(), PublishError> {
    match result {
        StoreResult::Event {
            task,
            message,
            code,
        } => {
            info!(
                "Task {}: {} (code {})",
                task.as_str(),
                message.as_str(),
                code
            );
            Ok(())
        }
        StoreResult::Debug { task, message } => {
            debug!("Task {}: {}", task.as_str(), message.as_str());
            Ok(())
        }
        StoreResult::Error {
            task,
            message,
            code,
        } => {
            error!(
                "Task {} failed: {} (code {})",
                task.as_str(),
                message.as_str(),
                code
            );
            Err(PublishError::Rejected { code: *code })
        }
        StoreResult::Available { task } => {
            info!("Task {}: document created", task.as_str());
            Ok(())
        }
    }
}
