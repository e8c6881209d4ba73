//! # GMLC stub
//!
//! Stands in for a real Gateway Mobile Location Centre (spec §1/§6). Bus-
//! native per §13: a `Control.EventExposureSubscription.GMLC.PERIODIC`
//! CREATE opens a periodic location-reporting subscription, and this
//! service publishes `EventNotifyDataExt` notifications directly onto
//! `Data.EventExposureDelivery.GMLC.PERIODIC` on its own timer, without
//! ever calling back over HTTP.
//!
//! `POST /ngmlc-loc/v1/provide-location` is kept as the secondary,
//! manual-testing ingress named in the external interface contract (spec
//! §6): it opens the same in-memory subscription the CRUD path opens, and
//! touches nothing else. `POST /data` lets the CSV replayer (or a human)
//! override the random location/velocity the periodic sender would
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
use nwdaf_messages::nf::{GmlcEvent, NfType};
use nwdaf_messages::payload::location::{EventNotifyDataExt, InputData};
use nwdaf_messages::OperationType;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// One open location-reporting subscription, tracked the way the reference
/// `send_notifications` loop tracks it (spec §12 "NF stub subscription
/// bookkeeping").
struct GmlcSubscription {
    input_data: InputData,
    next_notification_time: DateTime<Utc>,
    notification_count: u32,
}

/// An optional override for the next notification's location/velocity
/// fields, fed by `POST /data` (spec §12 "CSV replayer"). Any field left
/// unset falls back to a freshly generated random value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct GmlcOverride {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(rename = "movingSpeed")]
    moving_speed: Option<f64>,
    #[serde(rename = "compassDirection")]
    compass_direction: Option<u32>,
}

struct AppState {
    subscriptions: Mutex<HashMap<String, GmlcSubscription>>,
    next_override: Mutex<GmlcOverride>,
    notification_writer: BusWriteHandler<EventNotifyDataExt>,
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    #[clap(long, env = "GMLC_SERVICE_NAME", default_value = "gmlc")]
    service_name: String,

    #[clap(long, env = "GMLC_SERVICE_PORT", default_value = "10006")]
    http_port: u16,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "GMLC_LOG_LEVEL", default_value = "info")]
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
    nwdaf_common::metrics::component_info_metric("gmlc");

    let state = web::Data::new(AppState {
        subscriptions: Mutex::new(HashMap::new()),
        next_override: Mutex::new(GmlcOverride::default()),
        notification_writer: BusWriteHandler::new(
            create_default_producer(&bus.broker, &bus.username, &bus.password)
                .into_diagnostic()?,
            event_exposure_delivery(NfType::Gmlc, GmlcEvent::Periodic),
            WireMode::Payload,
        ),
    });

    let mut service = ServiceBase::new(args.service_name.clone());

    // Control.EventExposureSubscription.GMLC.PERIODIC (CRUD)
    {
        let topic = event_exposure_subscription(NfType::Gmlc, GmlcEvent::Periodic);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let state = state.clone();
        let callbacks = CrudCallbacks::new().on_create(move |sub_id, input_data: InputData| {
            open_subscription(&state, sub_id, input_data);
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
            .service(provide_location)
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

fn open_subscription(state: &AppState, sub_id: String, input_data: InputData) {
    let interval = TimeDelta::seconds(input_data.periodic_event_info.reporting_interval as i64);
    let subscription = GmlcSubscription {
        input_data,
        next_notification_time: Utc::now() + interval,
        notification_count: 0,
    };
    info!(%sub_id, "opened GMLC location subscription");
    state
        .subscriptions
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(sub_id, subscription);
}

/// `should_notify` from the reference `gmlc.py`: due by time, and either
/// unlimited or still within the reporting amount.
fn should_notify(subscription: &GmlcSubscription) -> bool {
    let is_time_to_notify = subscription.next_notification_time <= Utc::now();
    let is_amount_ok = subscription.input_data.periodic_event_info.reporting_infinite_ind
        || subscription.notification_count
            <= subscription.input_data.periodic_event_info.reporting_amount;
    is_time_to_notify && is_amount_ok
}

async fn send_due_notifications(state: &web::Data<AppState>) {
    let due: Vec<(String, InputData)> = {
        let mut subscriptions = state.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();
        for (sub_id, subscription) in subscriptions.iter_mut() {
            if should_notify(subscription) {
                due.push((sub_id.clone(), subscription.input_data.clone()));
                let interval = TimeDelta::seconds(
                    subscription.input_data.periodic_event_info.reporting_interval as i64,
                );
                subscription.next_notification_time += interval;
                subscription.notification_count += 1;
            }
        }
        due
    };

    for (sub_id, input_data) in due {
        notify(state, &sub_id, &input_data).await;
    }
}

/// Bounding box lifted verbatim from the reference `notify` function.
const LAT_RANGE: (f64, f64) = (44.9732550, 44.97696380);
const LON_RANGE: (f64, f64) = (-93.25899079999999, -93.26375390000001);
const SPEED_RANGE: (f64, f64) = (0.00010015551, 9.9988235);

async fn notify(state: &web::Data<AppState>, sub_id: &str, input_data: &InputData) {
    let overrides = state
        .next_override
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();

    let mut rng = rand::rng();
    let latitude = overrides
        .latitude
        .unwrap_or_else(|| rng.random_range(LAT_RANGE.0..LAT_RANGE.1));
    let longitude = overrides
        .longitude
        .unwrap_or_else(|| rng.random_range(LON_RANGE.0.min(LON_RANGE.1)..LON_RANGE.0.max(LON_RANGE.1)));
    let h_speed = overrides
        .moving_speed
        .unwrap_or_else(|| rng.random_range(SPEED_RANGE.0..SPEED_RANGE.1));
    let bearing = overrides
        .compass_direction
        .unwrap_or_else(|| rng.random_range(0..=360));

    let notification = EventNotifyDataExt {
        ldr_reference: input_data.ldr_reference.clone(),
        event_notify_data_type: GmlcEvent::Periodic,
        supi: input_data.supi.clone(),
        timestamp_of_location_estimate: Utc::now(),
        latitude,
        longitude,
        h_speed,
        bearing,
    };

    if let Err(e) = state
        .notification_writer
        .enqueue(sub_id, &notification, OperationType::Receive)
        .await
    {
        warn!(%sub_id, error = %e, "failed to publish GMLC location notification");
    }
}

#[post("/ngmlc-loc/v1/provide-location")]
async fn provide_location(
    state: web::Data<AppState>,
    body: web::Json<InputData>,
) -> HttpResponse {
    let sub_id = Uuid::new_v4().to_string();
    open_subscription(&state, sub_id, body.into_inner());
    HttpResponse::Ok().finish()
}

#[post("/data")]
async fn receive_data(state: web::Data<AppState>, body: web::Json<GmlcOverride>) -> HttpResponse {
    *state.next_override.lock().unwrap_or_else(|e| e.into_inner()) = body.into_inner();
    HttpResponse::Ok().json(serde_json::json!({ "message": "Data received successfully" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwdaf_messages::payload::location::{ExternalClientType, LocationTypeRequested, PeriodicEventInfo};

    fn sample_input() -> InputData {
        InputData {
            supi: "imsi-001".into(),
            ldr_reference: "S1".into(),
            external_client_type: ExternalClientType::ValueAddedServices,
            periodic_event_info: PeriodicEventInfo {
                reporting_amount: 1,
                reporting_interval: 10,
                reporting_infinite_ind: false,
            },
            location_type_requested: LocationTypeRequested::CurrentLocation,
            hgmlc_call_back_uri: None,
        }
    }

    #[test]
    fn due_subscription_with_budget_remaining_notifies() {
        let subscription = GmlcSubscription {
            input_data: sample_input(),
            next_notification_time: Utc::now() - TimeDelta::seconds(1),
            notification_count: 0,
        };
        assert!(should_notify(&subscription));
    }

    #[test]
    fn exhausted_finite_subscription_stops_notifying() {
        let mut input_data = sample_input();
        input_data.periodic_event_info.reporting_amount = 1;
        let subscription = GmlcSubscription {
            input_data,
            next_notification_time: Utc::now() - TimeDelta::seconds(1),
            notification_count: 2,
        };
        assert!(!should_notify(&subscription));
    }

    #[test]
    fn infinite_subscription_keeps_notifying_past_the_amount() {
        let mut input_data = sample_input();
        input_data.periodic_event_info.reporting_infinite_ind = true;
        input_data.periodic_event_info.reporting_amount = 1;
        let subscription = GmlcSubscription {
            input_data,
            next_notification_time: Utc::now() - TimeDelta::seconds(1),
            notification_count: 50,
        };
        assert!(should_notify(&subscription));
    }

    #[test]
    fn not_yet_due_subscription_does_not_notify() {
        let subscription = GmlcSubscription {
            input_data: sample_input(),
            next_notification_time: Utc::now() + TimeDelta::seconds(60),
            notification_count: 0,
        };
        assert!(!should_notify(&subscription));
    }
}
