//! # API Gateway
//!
//! HTTP ingress/egress for the analytics subscription contract (spec §2
//! "API gateway", §6 HTTP surface). Accepts `NnwdafEventsSubscription`
//! CREATE/DELETE requests over HTTP, republishes them onto
//! `Control.NwdafEventSubscription.<event>`, and forwards every
//! `Data.NwdafEventDelivery.<event>` notification it observes to the
//! `notification_uri` stored for that subscription's correlation id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use actix_web::{App, HttpResponse, HttpServer, delete, post, web};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::bus::ReadMode;
use nwdaf_common::{
    BusWriteHandler, CommonBusOpts, ServiceBase, TracerOptions, WireMode, create_default_consumer,
    create_default_producer, init_tracer, wait_for_broker,
};
use nwdaf_messages::catalog::{nwdaf_event_delivery, nwdaf_event_subscription};
use nwdaf_messages::payload::subscription::{
    NnwdafEventsSubscription, NnwdafEventsSubscriptionNotification,
};
use nwdaf_messages::{NwdafEvent, OperationType};
use strum::IntoEnumIterator;
use tracing::{info, warn};
use uuid::Uuid;

/// The part of a stored subscription the gateway needs to replay a DELETE
/// and to know which `Control.NwdafEventSubscription.<event>` topics it
/// published to (spec §3 "Subscription").
struct StoredSubscription {
    notification_uri: String,
    events: Vec<NwdafEvent>,
}

/// Shared HTTP-handler state. Plain `Mutex` rather than the cooperative
/// single-task model the other services use: actix-web runs each request on
/// its own worker thread, so this registry genuinely has concurrent writers.
struct AppState {
    subscriptions: Mutex<HashMap<String, StoredSubscription>>,
    subscription_writers: HashMap<NwdafEvent, BusWriteHandler<NnwdafEventsSubscription>>,
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    #[clap(long, env = "GATEWAY_SERVICE_NAME", default_value = "gateway")]
    service_name: String,

    #[clap(long, env = "GATEWAY_SERVICE_PORT", default_value = "8080")]
    http_port: u16,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
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
    nwdaf_common::metrics::component_info_metric("gateway");

    let mut subscription_writers = HashMap::new();
    for event in NwdafEvent::iter() {
        let writer = BusWriteHandler::new(
            create_default_producer(&bus.broker, &bus.username, &bus.password)
                .into_diagnostic()?,
            nwdaf_event_subscription(event),
            WireMode::Crud,
        );
        subscription_writers.insert(event, writer);
    }

    let state = web::Data::new(AppState {
        subscriptions: Mutex::new(HashMap::new()),
        subscription_writers,
    });

    let mut service = ServiceBase::new(args.service_name.clone());

    // Data.NwdafEventDelivery.<event> (RECEIVE), one reader per event, all
    // forwarded through the same HTTP-forwarding path.
    for event in NwdafEvent::iter() {
        let topic = nwdaf_event_delivery(event);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let state = state.clone();
        let handler = nwdaf_common::bus::BusReadHandler::new(
            consumer,
            topic,
            ReadMode::Receive(Box::new(
                move |sub_id, notif: NnwdafEventsSubscriptionNotification| {
                    let state = state.clone();
                    tokio::spawn(forward_notification(state, sub_id, notif));
                },
            )),
        );
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    let service_handle = tokio::spawn(async move { service.run().await });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(create_subscription)
            .service(delete_subscription)
    })
    .bind(("0.0.0.0", args.http_port))
    .into_diagnostic()?
    .run()
    .await
    .into_diagnostic()?;

    service_handle.await.into_diagnostic()?.into_diagnostic()?;
    Ok(())
}

/// Forwards a delivered analytics notification to the subscriber's stored
/// callback URI (spec §6 `POST /analytics-notification`). Missing
/// correlation (no subscriber known for this `sub_id`) is logged at DEBUG
/// and dropped per spec §7 item 3.
async fn forward_notification(
    state: web::Data<AppState>,
    sub_id: String,
    notif: NnwdafEventsSubscriptionNotification,
) {
    let notification_uri = {
        let subscriptions = state.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        subscriptions
            .get(&sub_id)
            .map(|s| s.notification_uri.clone())
    };
    let Some(notification_uri) = notification_uri else {
        tracing::debug!(%sub_id, "no stored subscriber for this notification, dropping");
        return;
    };

    let client = reqwest::Client::new();
    let url = format!("{notification_uri}/analytics-notification");
    match client
        .post(&url)
        .timeout(Duration::from_secs(5))
        .json(&notif)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            nwdaf_common::metrics::notifications_sent::incr();
        }
        Ok(resp) => {
            warn!(%sub_id, %url, status = %resp.status(), "downstream rejected analytics notification");
        }
        Err(e) => {
            warn!(%sub_id, %url, error = %e, "failed to forward analytics notification");
        }
    }
}

#[post("/nnwdaf-eventsubscription/v1/subscriptions")]
async fn create_subscription(
    state: web::Data<AppState>,
    body: web::Json<NnwdafEventsSubscription>,
) -> HttpResponse {
    let sub_id = Uuid::new_v4().to_string();
    let body = body.into_inner();
    let events: Vec<NwdafEvent> = body
        .event_subscriptions
        .iter()
        .map(|s| s.event)
        .collect();

    for &event in &events {
        let Some(writer) = state.subscription_writers.get(&event) else {
            continue;
        };
        if let Err(e) = writer.enqueue(&sub_id, &body, OperationType::Create).await {
            warn!(%sub_id, ?event, error = %e, "failed to publish subscription create");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let stored = StoredSubscription {
        notification_uri: body.notification_uri.clone(),
        events,
    };
    state
        .subscriptions
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(sub_id.clone(), stored);

    info!(%sub_id, "accepted analytics subscription");
    HttpResponse::Created()
        .insert_header(("Location", format!("/nnwdaf-eventsubscription/v1/subscriptions/{sub_id}")))
        .json(serde_json::json!({ "sub_id": sub_id }))
}

#[delete("/nnwdaf-eventsubscription/v1/subscriptions/{sub_id}")]
async fn delete_subscription(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let sub_id = path.into_inner();
    let stored = state
        .subscriptions
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&sub_id);

    let Some(stored) = stored else {
        return HttpResponse::NotFound().finish();
    };

    let empty_body = NnwdafEventsSubscription {
        notification_uri: stored.notification_uri,
        event_subscriptions: Vec::new(),
    };
    for event in stored.events {
        let Some(writer) = state.subscription_writers.get(&event) else {
            continue;
        };
        if let Err(e) = writer
            .enqueue(&sub_id, &empty_body, OperationType::Delete)
            .await
        {
            warn!(%sub_id, ?event, error = %e, "failed to publish subscription delete");
        }
    }

    info!(%sub_id, "removed analytics subscription");
    HttpResponse::NoContent().finish()
}
