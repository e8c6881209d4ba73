//! Kafka-backed bus plumbing: connection config and envelope framing
//! (spec §4.1 "Bus semantics").

use std::time::Duration;

use clap::Args;
use rdkafka::ClientConfig;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{BaseConsumer, Consumer, stream_consumer::StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::producer::FutureProducer;

use crate::error::FatalStartup;

/// Connection options shared by every service (spec §6 "Configuration").
/// `broker` is the one genuinely required value; username/password are
/// optional so a local unauthenticated broker works with no flags at all.
#[derive(Debug, Clone, Args)]
pub struct CommonBusOpts {
    /// Kafka bootstrap server(s), e.g. `localhost:9092`.
    #[clap(long, env = "KAFKA_BOOTSTRAP_SERVER")]
    pub broker: String,

    /// SASL username, if the broker requires authentication.
    #[clap(long, env = "KAFKA_USERNAME")]
    pub username: Option<String>,

    /// SASL password, if the broker requires authentication.
    #[clap(long, env = "KAFKA_PASSWORD")]
    pub password: Option<String>,
}

/// Builds the base `rdkafka` client config shared by producers and
/// consumers: bootstrap servers plus optional SASL_PLAINTEXT auth.
pub fn generate_kafka_client_config(
    broker: &str,
    username: &Option<String>,
    password: &Option<String>,
) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", broker);

    if let (Some(username), Some(password)) = (username, password) {
        config
            .set("sasl.username", username)
            .set("sasl.password", password)
            .set("security.protocol", "SASL_PLAINTEXT")
            .set("sasl.mechanisms", "PLAIN");
    }

    config
}

/// Builds a consumer in manual-commit mode, subscribed to `topics` if given.
/// Manual commit is what makes at-least-once delivery (spec §4.1) an
/// explicit choice in the calling service rather than an implicit default.
pub fn create_default_consumer(
    broker: &str,
    username: &Option<String>,
    password: &Option<String>,
    consumer_group: &str,
    topics: Option<&[&str]>,
) -> KafkaResult<StreamConsumer> {
    let consumer: StreamConsumer = generate_kafka_client_config(broker, username, password)
        .set("group.id", consumer_group)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;

    if let Some(topics) = topics {
        rdkafka::consumer::Consumer::subscribe(&consumer, topics)?;
    }

    Ok(consumer)
}

pub fn create_default_producer(
    broker: &str,
    username: &Option<String>,
    password: &Option<String>,
) -> KafkaResult<FutureProducer> {
    generate_kafka_client_config(broker, username, password).create()
}

pub fn create_admin_client(
    broker: &str,
    username: &Option<String>,
    password: &Option<String>,
) -> KafkaResult<AdminClient<DefaultClientContext>> {
    generate_kafka_client_config(broker, username, password).create()
}

/// Blocks until the broker answers a metadata request, or gives up after
/// `timeout` (spec §4.7 "Bootstrap": "list-topics probe with 1 s backoff,
/// configurable timeout ≥ 20 s"; §5 "broker list-topics probes a 10 s
/// per-attempt timeout").
pub async fn wait_for_broker(
    broker: &str,
    username: &Option<String>,
    password: &Option<String>,
    timeout: Duration,
) -> Result<(), FatalStartup> {
    let probe: BaseConsumer = generate_kafka_client_config(broker, username, password).create()?;
    let deadline = tokio::time::Instant::now() + timeout;
    let backoff = Duration::from_secs(1);
    let probe_timeout = Duration::from_secs(10);

    loop {
        let result = tokio::task::block_in_place(|| probe.fetch_metadata(None, probe_timeout));

        if result.is_ok() {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(FatalStartup::BrokerTimeout);
        }

        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_without_credentials_has_no_sasl_keys() {
        let config = generate_kafka_client_config("localhost:9092", &None, &None);
        assert_eq!(
            config.get("bootstrap.servers"),
            Some("localhost:9092")
        );
        assert_eq!(config.get("sasl.username"), None);
    }

    #[test]
    fn client_config_with_credentials_sets_sasl_plaintext() {
        let config = generate_kafka_client_config(
            "localhost:9092",
            &Some("u".to_owned()),
            &Some("p".to_owned()),
        );
        assert_eq!(config.get("security.protocol"), Some("SASL_PLAINTEXT"));
    }
}
