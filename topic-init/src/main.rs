//! # Topic Bootstrap
//!
//! Waits for the broker, then ensures every topic in the NF×event catalog
//! plus the fixed control/delivery plane topics exists (spec §4.7).
//! `TOPIC_ALREADY_EXISTS` is treated as success, matching a re-run against
//! an already-initialised broker.

use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use nwdaf_common::{CommonBusOpts, TracerOptions, create_admin_client, init_tracer, wait_for_broker};
use nwdaf_messages::catalog::TopicCatalog;
use rdkafka::admin::{AdminOptions, NewTopic, TopicReplication};
use rdkafka::error::RDKafkaErrorCode;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "TOPIC_INIT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[clap(long)]
    otel_endpoint: Option<String>,

    #[clap(long, default_value = "")]
    otel_namespace: String,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Cli::parse();
    let _tracer = init_tracer!(TracerOptions::new(
        args.otel_endpoint.as_deref(),
        args.otel_namespace.clone(),
        args.log_level.clone()
    ));

    let bus = &args.common_bus_options;
    wait_for_broker(
        &bus.broker,
        &bus.username,
        &bus.password,
        Duration::from_secs(args.broker_wait_timeout_seconds),
    )
    .await
    .into_diagnostic()?;

    let admin = create_admin_client(&bus.broker, &bus.username, &bus.password).into_diagnostic()?;

    let topics = TopicCatalog::all();
    let new_topics: Vec<NewTopic> = topics
        .iter()
        .map(|name| NewTopic::new(name, 1, TopicReplication::Fixed(1)))
        .collect();

    let results = admin
        .create_topics(&new_topics, &AdminOptions::new())
        .await
        .into_diagnostic()?;

    for result in results {
        match result {
            Ok(name) => info!(%name, "created topic"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!(%name, "topic already exists");
            }
            Err((name, code)) => {
                warn!(%name, ?code, "failed to create topic");
            }
        }
    }

    info!(count = topics.len(), "topic bootstrap complete");
    Ok(())
}
