//! # Notification client
//!
//! A minimal subscriber: accepts `POST /analytics-notification` (spec §6)
//! and exposes a `predicted_throughput{supi=...}` Prometheus gauge, parsed
//! back out of the `"X.XX Kbps"` string the AnLF formats (spec §12
//! "Notification-client gauge").

use std::net::SocketAddr;

use actix_web::{App, HttpResponse, HttpServer, post, web};
use clap::Parser;
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::{TracerOptions, init_tracer};
use nwdaf_messages::payload::subscription::NnwdafEventsSubscriptionNotification;
use tracing::{debug, info, warn};

const PREDICTED_THROUGHPUT_GAUGE: &str = "predicted_throughput";

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(long, env = "NOTIF_CLIENT_SERVICE_NAME", default_value = "notification-client")]
    service_name: String,

    #[clap(long, env = "NOTIF_CLIENT_SERVICE_PORT", default_value = "10009")]
    http_port: u16,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, env = "NOTIF_CLIENT_LOG_LEVEL", default_value = "info")]
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

    PrometheusBuilder::new()
        .with_http_listener(args.observability_address)
        .install()
        .into_diagnostic()?;
    metrics::describe_gauge!(
        PREDICTED_THROUGHPUT_GAUGE,
        metrics::Unit::Count,
        "Predicted throughput in Kbps, per SUPI"
    );

    info!(service = %args.service_name, "notification client listening");

    HttpServer::new(|| App::new().service(analytics_notification))
        .bind(("0.0.0.0", args.http_port))
        .into_diagnostic()?
        .run()
        .await
        .into_diagnostic()?;

    Ok(())
}

/// Parses `"12.34 Kbps"` into `12.34`, tolerating any whitespace around the
/// unit the way the reference client's `str.replace(" Mbps", "")` does.
fn parse_throughput_value(formatted: &str) -> Option<f64> {
    formatted
        .trim()
        .split_whitespace()
        .next()
        .and_then(|value| value.parse::<f64>().ok())
}

#[post("/analytics-notification")]
async fn analytics_notification(
    body: web::Json<NnwdafEventsSubscriptionNotification>,
) -> HttpResponse {
    let notif = body.into_inner();
    debug!(?notif, "received an analytics notification");

    for event in &notif.event_notifications {
        for info in &event.predicted_throughput_infos {
            match parse_throughput_value(&info.throughput) {
                Some(value) => {
                    gauge!(PREDICTED_THROUGHPUT_GAUGE, "supi" => info.supi.clone()).set(value);
                    info!(supi = %info.supi, value, "updated predicted throughput gauge");
                }
                None => {
                    warn!(supi = %info.supi, raw = %info.throughput, "unparseable throughput value, gauge not updated");
                }
            }
        }
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_value_with_unit_suffix() {
        assert_eq!(parse_throughput_value("12.34 Kbps"), Some(12.34));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_throughput_value("not-a-number"), None);
    }
}
