//! # RAN stub
//!
//! Stands in for a RAN node able to report per-UE RSRP readings (spec
//! §1/§6). Bus-native per §13: a `Control.EventExposureSubscription.RAN.
//! RSRP_INFO` CREATE opens a periodic RSRP subscription for one or more UE
//! ids, and this service publishes `RanEventExposureNotification`s directly
//! onto `Data.EventExposureDelivery.RAN.RSRP_INFO` on its own timer.
//!
//! `POST /ran-event-exposure/v1/subscriptions` is kept as the secondary,
//! manual-testing ingress (spec §6): it opens the same in-memory
//! subscription the CRUD path opens. `POST /data` lets the CSV replayer (or
//! a human) override the random RSRP readings the periodic sender would
//! otherwise invent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::{App, HttpResponse, HttpServer, post, web};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::bus::ReadMode;
use nwdaf_common::{
    BusWriteHandler, CommonBusOpts, CrudCallbacks, ServiceBase, TracerOptions, WireMode,
    create_default_consumer, create_default_producer, init_tracer, wait_for_broker,
};
use nwdaf_messages::catalog::{event_exposure_delivery, event_exposure_subscription};
use nwdaf_messages::nf::{NfType, RanEvent};
use nwdaf_messages::payload::ran::{RanEventExposureNotification, RanEventSubscription, RsrpInfo};
use nwdaf_messages::OperationType;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// One open RSRP subscription (spec §12 "NF stub subscription bookkeeping").
struct RanSubscription {
    ran_sub: RanEventSubscription,
    next_notification_time: DateTime<Utc>,
    notification_count: u32,
}

/// An optional override for the next notification's RSRP readings, fed by
/// `POST /data` (spec §12 "CSV replayer").
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct RanOverride {
    lte_rsrp: Option<i32>,
    #[serde(rename = "nr_ssRsrp")]
    nr_ss_rsrp: Option<f64>,
}

struct AppState {
    subscriptions: Mutex<HashMap<String, RanSubscription>>,
    next_override: Mutex<RanOverride>,
    notification_writer: BusWriteHandler<RanEventExposureNotification>,
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    #[clap(long, env = "RAN_SERVICE_NAME", default_value = "ran")]
    service_name: String,

    #[clap(long, env = "RAN_SERVICE_PORT", default_value = "10007")]
    http_port: u16,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "RAN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[clap(long)]
    otel_endpoint: Option<String>,

    #[clap(long, default_value = "")]
    otel_namespace: String,
}

#[actix_web::main]
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
    nwdaf_common::metrics::component_info_metric("ran");

    let state = web::Data::new(AppState {
        subscriptions: Mutex::new(HashMap::new()),
        next_override: Mutex::new(RanOverride::default()),
        notification_writer: BusWriteHandler::new(
            create_default_producer(&bus.broker, &bus.username, &bus.password)
                .into_diagnostic()?,
            event_exposure_delivery(NfType::Ran, RanEvent::RsrpInfo),
            WireMode::Payload,
        ),
    });

    let mut service = ServiceBase::new(args.service_name.clone());

    // Control.EventExposureSubscription.RAN.RSRP_INFO (CRUD)
    {
        let topic = event_exposure_subscription(NfType::Ran, RanEvent::RsrpInfo);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let state = state.clone();
        let callbacks =
            CrudCallbacks::new().on_create(move |sub_id, ran_sub: RanEventSubscription| {
                open_subscription(&state, sub_id, ran_sub);
            });
        let handler =
            nwdaf_common::bus::BusReadHandler::new(consumer, topic, ReadMode::Crud(callbacks));
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Periodic sender, reproducing the reference `send_notifications` loop.
    {
        let state = state.clone();
        service.add_task(move |mut shutdown| async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(Duration::from_millis(300)) => {
                        send_due_notifications(&state).await;
                    }
                }
            }
        });
    }

    let service_handle = tokio::spawn(async move { service.run().await });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(subscribe)
            .service(receive_data)
    })
    .bind(("0.0.0.0", args.http_port))
    .into_diagnostic()?
    .run()
    .await
    .into_diagnostic()?;

    service_handle.await.into_diagnostic()?.into_diagnostic()?;
    Ok(())
}

fn open_subscription(state: &AppState, sub_id: String, ran_sub: RanEventSubscription) {
    let interval = TimeDelta::seconds(ran_sub.periodicity as i64);
    info!(%sub_id, ue_ids = ?ran_sub.ue_ids, "opened RAN RSRP subscription");
    let subscription = RanSubscription {
        ran_sub,
        next_notification_time: Utc::now() + interval,
        notification_count: 0,
    };
    state
        .subscriptions
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(sub_id, subscription);
}

/// `should_notify` from the reference `ran.py`: this stub has no reporting
/// amount to cap against, only the notification interval.
fn should_notify(subscription: &RanSubscription) -> bool {
    subscription.next_notification_time <= Utc::now()
}

async fn send_due_notifications(state: &web::Data<AppState>) {
    let due: Vec<(String, RanEventSubscription)> = {
        let mut subscriptions = state.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();
        for (sub_id, subscription) in subscriptions.iter_mut() {
            if should_notify(subscription) {
                due.push((sub_id.clone(), subscription.ran_sub.clone()));
                let interval = TimeDelta::seconds(subscription.ran_sub.periodicity as i64);
                subscription.next_notification_time += interval;
                subscription.notification_count += 1;
            }
        }
        due
    };

    for (sub_id, ran_sub) in due {
        notify(state, &sub_id, &ran_sub).await;
    }
}

const LTE_RSRP_RANGE: (i32, i32) = (-140, -44);
const NR_SS_RSRP_RANGE: (f64, f64) = (-139.0, -68.0);

async fn notify(state: &web::Data<AppState>, sub_id: &str, ran_sub: &RanEventSubscription) {
    let overrides = *state.next_override.lock().unwrap_or_else(|e| e.into_inner());
    let mut rng = rand::rng();

    let rsrp_infos = ran_sub
        .ue_ids
        .iter()
        .map(|ue_id| {
            let lte_rsrp = overrides
                .lte_rsrp
                .unwrap_or_else(|| rng.random_range(LTE_RSRP_RANGE.0..=LTE_RSRP_RANGE.1)) as f64;
            let nr_ss_rsrp = overrides
                .nr_ss_rsrp
                .unwrap_or_else(|| rng.random_range(NR_SS_RSRP_RANGE.0..NR_SS_RSRP_RANGE.1));
            RsrpInfo {
                ue_id: ue_id.clone(),
                lte_rsrp,
                nr_ss_rsrp,
            }
        })
        .collect();

    let notification = RanEventExposureNotification {
        correlation_id: sub_id.to_owned(),
        rsrp_infos,
    };

    if let Err(e) = state
        .notification_writer
        .enqueue(sub_id, &notification, OperationType::Receive)
        .await
    {
        warn!(%sub_id, error = %e, "failed to publish RAN RSRP notification");
    }
}

#[post("/ran-event-exposure/v1/subscriptions")]
async fn subscribe(
    state: web::Data<AppState>,
    body: web::Json<RanEventSubscription>,
) -> HttpResponse {
    let sub_id = Uuid::new_v4().to_string();
    let ran_sub = body.into_inner();
    let location = format!("/ran-event-exposure/v1/subscriptions/{sub_id}");
    let response = HttpResponse::Created()
        .insert_header(("Location", location))
        .json(&ran_sub);
    open_subscription(&state, sub_id, ran_sub);
    response
}

#[post("/data")]
async fn receive_data(state: web::Data<AppState>, body: web::Json<RanOverride>) -> HttpResponse {
    *state.next_override.lock().unwrap_or_else(|e| e.into_inner()) = body.into_inner();
    HttpResponse::Ok().json(serde_json::json!({ "message": "Data received successfully" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sub() -> RanEventSubscription {
        RanEventSubscription {
            event: RanEvent::RsrpInfo,
            correlation_id: "corr-1".into(),
            notif_uri: "http://unused".into(),
            ue_ids: vec!["ue-1".into()],
            periodicity: 5,
        }
    }

    #[test]
    fn due_subscription_notifies() {
        let subscription = RanSubscription {
            ran_sub: sample_sub(),
            next_notification_time: Utc::now() - TimeDelta::seconds(1),
            notification_count: 0,
        };
        assert!(should_notify(&subscription));
    }

    #[test]
    fn not_yet_due_subscription_does_not_notify() {
        let subscription = RanSubscription {
            ran_sub: sample_sub(),
            next_notification_time: Utc::now() + TimeDelta::seconds(60),
            notification_count: 0,
        };
        assert!(!should_notify(&subscription));
    }
}
