//! Long-running Kafka consumer feeding the storage write path.
//!
//! Each message is decoded, validated, and written through the
//! freshness-guarded upsert. Malformed messages are counted, logged with
//! their offset, and skipped; storage failures are retried with bounded
//! exponential backoff and then dead-lettered so the stream always advances.

pub mod message;

use kafka::consumer::{Consumer, FetchOffset, GroupOffsetStorage};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orca_storage::{Storage, StorageError};

pub use message::{parse_incoming, ValidatedMessage};

/// `[broker]` section of the service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Upper bound on the serialized report blob carried by one message.
    #[serde(default = "default_max_report_bytes")]
    pub max_report_bytes: usize,
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            addresses: default_addresses(),
            topic: default_topic(),
            group: default_group(),
            client_id: default_client_id(),
            max_report_bytes: default_max_report_bytes(),
            write_retries: default_write_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_addresses() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_topic() -> String {
    "ccx.ocp.results".to_string()
}

fn default_group() -> String {
    "aggregator".to_string()
}

fn default_client_id() -> String {
    "orca-consumer".to_string()
}

fn default_max_report_bytes() -> usize {
    1 << 20
}

fn default_write_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    500
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("malformed message: {reason}")]
    Malformed { reason: String },

    #[error("broker error: {0}")]
    Broker(#[from] kafka::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("consumer loop terminated abnormally: {0}")]
    Terminated(String),
}

impl ConsumerError {
    fn malformed(reason: impl Into<String>) -> Self {
        ConsumerError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Writes one validated message, retrying transient storage failures with
/// exponential backoff. `Closed` and `UnsupportedDriver` are not retried:
/// they are fatal for the instance and bubble up to stop the loop.
pub async fn process_message(
    storage: &Storage,
    msg: &ValidatedMessage,
    retries: u32,
    base_delay: Duration,
) -> Result<(), StorageError> {
    let mut attempt = 0;
    loop {
        match storage
            .write_report_for_cluster(msg.org_id, msg.cluster, &msg.report, msg.last_checked)
            .await
        {
            Ok(()) => return Ok(()),
            Err(err @ (StorageError::Closed | StorageError::UnsupportedDriver(_))) => {
                return Err(err)
            }
            Err(err) if attempt < retries => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(
                    cluster = %msg.cluster,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "storage write failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Consumer instance bound to one broker topic and one storage handle.
pub struct KafkaConsumer {
    config: BrokerConfig,
    storage: Arc<Storage>,
    shutdown: Arc<AtomicBool>,
}

impl KafkaConsumer {
    pub fn new(config: BrokerConfig, storage: Arc<Storage>) -> Self {
        Self {
            config,
            storage,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals the read loop to stop. The loop honors the signal between
    /// messages; an in-flight storage write is never interrupted.
    pub fn close(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Runs the read loop until shutdown. A disabled broker is a no-op.
    ///
    /// The `kafka` crate does blocking I/O, so the loop lives on a blocking
    /// thread; storage writes re-enter the runtime through its handle.
    pub async fn serve(&self) -> Result<(), ConsumerError> {
        if !self.config.enabled {
            tracing::info!("broker is disabled, not starting the consumer");
            return Ok(());
        }

        let handle = tokio::runtime::Handle::current();
        let config = self.config.clone();
        let storage = self.storage.clone();
        let shutdown = self.shutdown.clone();
        tokio::task::spawn_blocking(move || run_loop(&handle, &config, &storage, &shutdown))
            .await
            .map_err(|err| ConsumerError::Terminated(err.to_string()))?
    }
}

fn run_loop(
    handle: &tokio::runtime::Handle,
    config: &BrokerConfig,
    storage: &Storage,
    shutdown: &AtomicBool,
) -> Result<(), ConsumerError> {
    let mut consumer = Consumer::from_hosts(config.addresses.clone())
        .with_group(config.group.clone())
        .with_topic(config.topic.clone())
        .with_fallback_offset(FetchOffset::Earliest)
        .with_offset_storage(Some(GroupOffsetStorage::Kafka))
        .with_client_id(config.client_id.clone())
        .create()?;

    tracing::info!(
        topic = %config.topic,
        group = %config.group,
        "consumer started"
    );

    while !shutdown.load(Ordering::SeqCst) {
        let message_sets = match consumer.poll() {
            Ok(sets) => sets,
            Err(err) => {
                tracing::error!(error = %err, "broker poll failed, backing off");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };
        for set in message_sets.iter() {
            for msg in set.messages() {
                handle_one(handle, config, storage, set.partition(), msg.offset, msg.value)?;
            }
            if let Err(err) = consumer.consume_messageset(set) {
                tracing::error!(error = %err, "cannot mark message set consumed");
            }
        }
        if let Err(err) = consumer.commit_consumed() {
            tracing::error!(error = %err, "cannot commit consumed offsets");
        }
    }

    tracing::info!("consumer stopped");
    Ok(())
}

/// Handles one raw message. Only fatal storage states propagate; every other
/// failure is logged and the offset advances.
fn handle_one(
    handle: &tokio::runtime::Handle,
    config: &BrokerConfig,
    storage: &Storage,
    partition: i32,
    offset: i64,
    payload: &[u8],
) -> Result<(), ConsumerError> {
    let msg = match parse_incoming(payload, config.max_report_bytes) {
        Ok(msg) => msg,
        Err(err) => {
            metrics::counter!("orca_consumer_malformed_total").increment(1);
            tracing::warn!(partition, offset, error = %err, "skipping unprocessable message");
            return Ok(());
        }
    };

    let written = handle.block_on(process_message(
        storage,
        &msg,
        config.write_retries,
        Duration::from_millis(config.retry_base_ms),
    ));
    match written {
        Ok(()) => {
            metrics::counter!("orca_consumer_consumed_total").increment(1);
            tracing::debug!(partition, offset, org = %msg.org_id, cluster = %msg.cluster, "report stored");
            Ok(())
        }
        Err(err @ (StorageError::Closed | StorageError::UnsupportedDriver(_))) => {
            tracing::error!(error = %err, "storage is unusable, stopping the consumer");
            Err(ConsumerError::Storage(err))
        }
        Err(err) => {
            metrics::counter!("orca_consumer_dead_letter_total").increment(1);
            tracing::error!(
                partition,
                offset,
                error = %err,
                "retry budget exhausted, advancing past message"
            );
            Ok(())
        }
    }
}
