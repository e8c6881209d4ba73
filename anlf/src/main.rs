//! # AnLF (Throughput Analytics)
//!
//! Turns each subscribed SUPI into a recurring predicted-throughput
//! estimate (spec §4.4). Accepts `Control.NwdafEventSubscription.UE_LOC_THROUGHPUT`
//! subscription requests, opens per-SUPI GMLC/RAN event-exposure
//! subscriptions, fans their notifications into a per-SUPI FSM, calls out
//! to a provisioned ML model, and republishes the prediction on
//! `Data.NwdafEventDelivery.UE_LOC_THROUGHPUT`.

mod inbound;
mod predictor;
mod registry;
mod state_machine;
mod tick;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::bus::ReadMode;
use nwdaf_common::{
    CommonBusOpts, CrudCallbacks, ServiceBase, TracerOptions, create_default_consumer,
    create_default_producer, init_tracer, wait_for_broker,
};
use nwdaf_messages::catalog::{event_exposure_delivery, ml_model_provision_delivery, ml_model_provision_subscription, nwdaf_event_delivery, nwdaf_event_subscription};
use nwdaf_messages::nf::{GmlcEvent, NfType, RanEvent};
use nwdaf_messages::payload::location::EventNotifyDataExt;
use nwdaf_messages::payload::ml::{MlEventNotif, MlEventSubscription};
use nwdaf_messages::payload::ran::RanEventExposureNotification;
use nwdaf_messages::payload::subscription::NnwdafEventsSubscription;
use nwdaf_messages::{NwdafEvent, OperationType};
use tokio::sync::mpsc;
use tracing::warn;

use crate::inbound::{AnlfInboundEvent, GmlcNotification};
use crate::predictor::HttpPredictor;
use crate::registry::{GmlcSample, SubscriptionRegistry};
use crate::tick::{TickWriters, tick};

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    /// Consumer group id and the key used on the ML provisioning request.
    #[clap(long, env = "ANLF_SERVICE_NAME", default_value = "anlf")]
    service_name: String,

    /// Endpoint on which Prometheus text format metrics are available.
    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    /// How long to wait for the broker at startup before giving up.
    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "ANLF_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// If set, OpenTelemetry data is sent to the URL specified.
    #[clap(long)]
    otel_endpoint: Option<String>,

    /// "service.namespace" tag on every emitted span.
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

    PrometheusBuilder::new()
        .with_http_listener(args.observability_address)
        .install()
        .into_diagnostic()?;
    nwdaf_common::metrics::describe_all();
    nwdaf_common::metrics::component_info_metric("anlf");

    let (tx, mut rx) = mpsc::channel::<AnlfInboundEvent>(1024);

    let mut service = ServiceBase::new(args.service_name.clone());

    // Control.NwdafEventSubscription.UE_LOC_THROUGHPUT (CRUD)
    {
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[nwdaf_event_subscription(NwdafEvent::UeLocThroughput).as_str()]),
        )
        .into_diagnostic()?;
        let topic = nwdaf_event_subscription(NwdafEvent::UeLocThroughput);
        let tx = tx.clone();
        let tx_delete = tx.clone();
        let callbacks = CrudCallbacks::new()
            .on_create(move |sub_id, payload: NnwdafEventsSubscription| {
                let supis: Vec<String> = payload
                    .event_subscriptions
                    .into_iter()
                    .filter(|s| s.event == NwdafEvent::UeLocThroughput)
                    .flat_map(|s| s.tgt_ue.supis)
                    .collect();
                let _ = tx.try_send(AnlfInboundEvent::SubscriptionCreated { sub_id, supis });
            })
            .on_delete(move |sub_id, _payload: NnwdafEventsSubscription| {
                let _ = tx_delete.try_send(AnlfInboundEvent::SubscriptionDeleted { sub_id });
            });
        let handler =
            nwdaf_common::bus::BusReadHandler::new(consumer, topic, ReadMode::Crud(callbacks));
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Data.MLModelProvisionDelivery.UE_LOC_THROUGHPUT (RECEIVE)
    {
        let topic = ml_model_provision_delivery(NwdafEvent::UeLocThroughput);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let handler = nwdaf_common::bus::BusReadHandler::new(
            consumer,
            topic,
            ReadMode::Receive(Box::new(move |_key, notif: MlEventNotif| {
                let _ = tx.try_send(AnlfInboundEvent::ModelProvisioned(notif.m_l_file_addr));
            })),
        );
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Data.EventExposureDelivery.GMLC.PERIODIC (RECEIVE)
    {
        let topic = event_exposure_delivery(NfType::Gmlc, GmlcEvent::Periodic);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let handler = nwdaf_common::bus::BusReadHandler::new(
            consumer,
            topic,
            ReadMode::Receive(Box::new(move |_key, notif: EventNotifyDataExt| {
                let event = AnlfInboundEvent::GmlcNotif(GmlcNotification {
                    sub_id: notif.ldr_reference,
                    supi: notif.supi,
                    sample: GmlcSample {
                        latitude: notif.latitude,
                        longitude: notif.longitude,
                        h_speed: notif.h_speed,
                        bearing: notif.bearing,
                    },
                });
                let _ = tx.try_send(event);
            })),
        );
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Data.EventExposureDelivery.RAN.RSRP_INFO (RECEIVE)
    {
        let topic = event_exposure_delivery(NfType::Ran, RanEvent::RsrpInfo);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let handler = nwdaf_common::bus::BusReadHandler::new(
            consumer,
            topic,
            ReadMode::Receive(Box::new(move |_key, notif: RanEventExposureNotification| {
                let _ = tx.try_send(AnlfInboundEvent::RanNotif(notif));
            })),
        );
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    let gmlc_subscription_writer = nwdaf_common::BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        nwdaf_messages::catalog::event_exposure_subscription(NfType::Gmlc, GmlcEvent::Periodic),
        tick::SUBSCRIPTION_WIRE_MODE,
    );
    let ran_subscription_writer = nwdaf_common::BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        nwdaf_messages::catalog::event_exposure_subscription(NfType::Ran, RanEvent::RsrpInfo),
        tick::SUBSCRIPTION_WIRE_MODE,
    );
    let analytics_notification_writer = nwdaf_common::BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        nwdaf_event_delivery(NwdafEvent::UeLocThroughput),
        tick::DELIVERY_WIRE_MODE,
    );
    let model_provision_writer = nwdaf_common::BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        ml_model_provision_subscription(NwdafEvent::UeLocThroughput),
        tick::SUBSCRIPTION_WIRE_MODE,
    );

    let service_name_for_provisioning = args.service_name.clone();
    service.add_task(move |mut shutdown| async move {
        // Block until the service is ready (consumers subscribed, producers
        // live), then request a model (spec §4.4 "ML model provisioning").
        let request = MlEventSubscription {
            event: NwdafEvent::UeLocThroughput,
        };
        if let Err(e) = model_provision_writer
            .enqueue(
                &service_name_for_provisioning,
                &request,
                OperationType::Create,
            )
            .await
        {
            warn!(error = %e, "failed to request ML model provisioning");
        }

        let mut registry = SubscriptionRegistry::new();
        let predictor = HttpPredictor::new();
        let writers = TickWriters {
            gmlc_subscription: &gmlc_subscription_writer,
            ran_subscription: &ran_subscription_writer,
            analytics_notification: &analytics_notification_writer,
        };
        let mut tick_interval = tokio::time::interval(Duration::from_millis(300));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                event = rx.recv() => {
                    match event {
                        Some(event) => inbound::apply(&mut registry, &predictor, event).await,
                        None => return,
                    }
                }
                _ = tick_interval.tick() => {
                    tick(&mut registry, &predictor, &writers).await;
                }
            }
        }
    });

    service.run().await.into_diagnostic()?;
    Ok(())
}
