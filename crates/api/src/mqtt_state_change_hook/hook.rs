/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! MQTT hook implementation for publishing state changes.

use std::sync::Arc;
use std::time::Duration;

use carbide_uuid::machine::MachineId;
use model::machine::ManagedHostState;
use mqttea::{MqtteaClient, MqtteaClientError};
use opentelemetry::metrics::Meter;
use tokio::sync::mpsc;
use tokio::time::error::Elapsed;
use tokio::time::{Instant, timeout_at};

use crate::mqtt_state_change_hook::message::ManagedHostStateChangeMessage;
use crate::mqtt_state_change_hook::metrics::MqttHookMetrics;
use crate::state_controller::state_change_emitter::{StateChangeEvent, StateChangeHook};

/// Topic prefix for state change messages.
const TOPIC_PREFIX: &str = "carbide/v1/machine";

/// Internal queue item containing pre-serialized MQTT message with deadline.
struct QueuedMessage {
    topic: String,
    payload: Vec<u8>,
    /// Deadline by which this message must be published.
    deadline: Instant,
}

/// Trait for MQTT publishing, enabling test mocks.
#[async_trait::async_trait]
pub trait MqttPublisher: Send + Sync + 'static {
    /// Publish a message to the given topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqtteaClientError>;
}

#[async_trait::async_trait]
impl MqttPublisher for MqtteaClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqtteaClientError> {
        MqtteaClient::publish(self, topic, payload).await
    }
}

#[async_trait::async_trait]
impl<T: MqttPublisher> MqttPublisher for Arc<T> {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqtteaClientError> {
        T::publish(self, topic, payload).await
    }
}

/// MQTT hook that publishes `ManagedHostState` changes to the MQTT broker.
///
/// Implements the AsyncAPI specification in `carbide.yaml`, publishing to
/// `carbide/v1/machine/{machineId}/state`.
///
/// This hook maintains an internal queue and processes events in a background task.
/// If the queue is full, events are dropped and a warning is logged.
pub struct MqttStateChangeHook {
    sender: mpsc::Sender<QueuedMessage>,
    publish_timeout: Duration,
    metrics: MqttHookMetrics,
}

impl MqttStateChangeHook {
    /// Create a new MQTT state change hook.
    ///
    /// Spawns a background task to process queued events.
    /// Emits metrics:
    /// - `forge_dsx_event_bus_publish_count`: Total number of MQTT publish attempts
    /// - `forge_dsx_event_bus_queue_depth`: Current queue depth
    pub fn new<P: MqttPublisher>(
        client: P,
        publish_timeout: Duration,
        queue_capacity: usize,
        meter: &Meter,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let metrics = MqttHookMetrics::new(meter, sender.downgrade());
        tokio::spawn(process_events(receiver, client, metrics.clone()));
        Self {
            sender,
            publish_timeout,
            metrics,
        }
    }

    fn build_topic(machine_id: &MachineId) -> String {
        format!("{}/{}/state", TOPIC_PREFIX, machine_id)
    }
}

impl StateChangeHook<MachineId, ManagedHostState> for MqttStateChangeHook {
    fn on_state_changed(&self, event: &StateChangeEvent<'_, MachineId, ManagedHostState>) {
        // Serialize immediately to avoid cloning state
        let message =
            ManagedHostStateChangeMessage::new(event.object_id, event.new_state, event.timestamp);
        let topic = Self::build_topic(event.object_id);

        match message.to_json_bytes() {
            Ok(payload) => {
                let deadline = Instant::now() + self.publish_timeout;
                let queued = QueuedMessage {
                    topic,
                    payload,
                    deadline,
                };
                if let Err(e) = self.sender.try_send(queued) {
                    tracing::warn!("MQTT state change event dropped (queue full): {e}");
                    self.metrics.record_overflow();
                }
            }
            Err(e) => {
                tracing::error!(
                    machine_id = %event.object_id,
                    error = %e,
                    "Failed to serialize state change message"
                );
                self.metrics.record_serialization_error();
            }
        }
    }
}

/// Background task that processes queued messages and publishes to MQTT.
async fn process_events<P: MqttPublisher>(
    mut receiver: mpsc::Receiver<QueuedMessage>,
    client: P,
    metrics: MqttHookMetrics,
) {
    while let Some(msg) = receiver.recv().await {
        match timeout_at(msg.deadline, client.publish(&msg.topic, msg.payload)).await {
            Ok(Ok(())) => {
                tracing::debug!(topic = %msg.topic, "Published state change to MQTT");
                metrics.record_success();
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    topic = %msg.topic,
                    error = %e,
                    "Failed to publish state change to MQTT"
                );
                metrics.record_publish_error();
            }
            Err(Elapsed { .. }) => {
                tracing::warn!(
                    topic = %msg.topic,
                    "MQTT publish timed out"
                );
                metrics.record_timeout();
            }
        }
    }
    tracing::debug!("MQTT state change hook background task stopped");
}
