//! # CSV replayer
//!
//! Replays a Lumos5G-style CSV trace against the GMLC and RAN stubs' `/data`
//! endpoints, one row every `--interval-seconds`, so the rest of the system
//! sees a moving UE instead of uniformly-random samples (spec §12 "CSV
//! replayer"). `GET /start` begins playback; this stub does not touch the
//! bus at all.

use std::path::PathBuf;
use std::time::Duration;

use actix_web::{App, HttpResponse, HttpServer, get, web};
use clap::Parser;
use csv::ReaderBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::{ServiceBase, TracerOptions, init_tracer};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One CSV record, converted leniently: a column that is missing, empty, or
/// fails to parse becomes `None` rather than aborting the whole row (spec
/// §12, reproducing `convert_field_types` in the reference player).
#[derive(Debug, Clone, Default, Serialize)]
struct CsvDataRow {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(rename = "movingSpeed")]
    moving_speed: Option<f64>,
    #[serde(rename = "compassDirection")]
    compass_direction: Option<u32>,
    lte_rsrp: Option<i32>,
    #[serde(rename = "nr_ssRsrp")]
    nr_ss_rsrp: Option<f64>,
}

/// Raw string form of the same row, as read off the CSV file. Kept separate
/// from [`CsvDataRow`] so a malformed numeric field never fails the whole
/// row, only that one field.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawCsvRow {
    latitude: Option<String>,
    longitude: Option<String>,
    #[serde(rename = "movingSpeed")]
    moving_speed: Option<String>,
    #[serde(rename = "compassDirection")]
    compass_direction: Option<String>,
    lte_rsrp: Option<String>,
    #[serde(rename = "nr_ssRsrp")]
    nr_ss_rsrp: Option<String>,
}

fn lenient_parse<T: std::str::FromStr>(field: &str, raw: &Option<String>) -> Option<T> {
    match raw {
        None => None,
        Some(s) if s.is_empty() => None,
        Some(s) => match s.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(field, value = %s, "failed to convert CSV field, using None");
                None
            }
        },
    }
}

impl From<RawCsvRow> for CsvDataRow {
    fn from(raw: RawCsvRow) -> Self {
        CsvDataRow {
            latitude: lenient_parse("latitude", &raw.latitude),
            longitude: lenient_parse("longitude", &raw.longitude),
            moving_speed: lenient_parse("movingSpeed", &raw.moving_speed),
            compass_direction: lenient_parse("compassDirection", &raw.compass_direction),
            lte_rsrp: lenient_parse("lte_rsrp", &raw.lte_rsrp),
            nr_ss_rsrp: lenient_parse("nr_ssRsrp", &raw.nr_ss_rsrp),
        }
    }
}

#[derive(Clone)]
struct AppState {
    csv_path: PathBuf,
    interval: Duration,
    gmlc_tx: mpsc::Sender<CsvDataRow>,
    ran_tx: mpsc::Sender<CsvDataRow>,
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(long, env = "CSV_FP_SERVICE_NAME", default_value = "csv-replayer")]
    service_name: String,

    #[clap(long, env = "CSV_FP_SERVICE_PORT", default_value = "10008")]
    http_port: u16,

    /// Lumos5G-style CSV trace to replay.
    #[clap(long, default_value = "demos/lumos5g.csv")]
    csv_path: PathBuf,

    #[clap(long, default_value = "5")]
    interval_seconds: u64,

    #[clap(long, env = "GMLC_SERVICE_NAME", default_value = "127.0.0.1")]
    gmlc_service_name: String,

    #[clap(long, env = "GMLC_SERVICE_PORT", default_value = "10006")]
    gmlc_service_port: u16,

    #[clap(long, env = "RAN_SERVICE_NAME", default_value = "127.0.0.1")]
    ran_service_name: String,

    #[clap(long, env = "RAN_SERVICE_PORT", default_value = "10007")]
    ran_service_port: u16,

    #[clap(long, env = "CSV_FP_LOG_LEVEL", default_value = "info")]
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

    let gmlc_url = format!(
        "http://{}:{}/data",
        args.gmlc_service_name, args.gmlc_service_port
    );
    let ran_url = format!(
        "http://{}:{}/data",
        args.ran_service_name, args.ran_service_port
    );

    let (gmlc_tx, gmlc_rx) = mpsc::channel::<CsvDataRow>(32);
    let (ran_tx, ran_rx) = mpsc::channel::<CsvDataRow>(32);

    let mut service = ServiceBase::new(args.service_name.clone());
    service.add_task(move |shutdown| forward_rows(shutdown, gmlc_url, gmlc_rx));
    service.add_task(move |shutdown| forward_rows(shutdown, ran_url, ran_rx));

    let state = web::Data::new(AppState {
        csv_path: args.csv_path.clone(),
        interval: Duration::from_secs(args.interval_seconds),
        gmlc_tx,
        ran_tx,
    });

    let service_handle = tokio::spawn(async move { service.run().await });

    HttpServer::new(move || App::new().app_data(state.clone()).service(start_sending))
        .bind(("0.0.0.0", args.http_port))
        .into_diagnostic()?
        .run()
        .await
        .into_diagnostic()?;

    service_handle.await.into_diagnostic()?.into_diagnostic()?;
    Ok(())
}

/// One destination's outbound relay: receives rows off its channel and
/// forwards each as a JSON `POST` (spec §13 "No global mutable next-data
/// slot" — the hand-off is a channel, not a shared cell).
async fn forward_rows(
    mut shutdown: nwdaf_common::ShutdownSignal,
    url: String,
    mut rx: mpsc::Receiver<CsvDataRow>,
) {
    let client = reqwest::Client::new();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            row = rx.recv() => {
                let Some(row) = row else { return };
                match client.post(&url).json(&row).send().await {
                    Ok(resp) if !resp.status().is_success() => {
                        warn!(%url, status = %resp.status(), "stub rejected replayed row");
                    }
                    Err(e) => warn!(%url, error = %e, "failed to replay row"),
                    Ok(_) => {}
                }
            }
        }
    }
}

async fn play_csv(state: web::Data<AppState>) {
    let file = match std::fs::File::open(&state.csv_path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = ?state.csv_path, error = %e, "failed to open CSV trace, nothing to replay");
            return;
        }
    };
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    for record in reader.deserialize::<RawCsvRow>() {
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "skipping unparseable CSV row");
                continue;
            }
        };
        let row: CsvDataRow = raw.into();
        let _ = state.gmlc_tx.send(row.clone()).await;
        let _ = state.ran_tx.send(row).await;
        tokio::time::sleep(state.interval).await;
    }

    info!("CSV replay finished");
}

#[get("/start")]
async fn start_sending(state: web::Data<AppState>) -> HttpResponse {
    info!(path = ?state.csv_path, "starting CSV replay");
    tokio::spawn(play_csv(state));
    HttpResponse::Ok().json(serde_json::json!({ "message": "Started sending CSV data" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_becomes_none() {
        let raw = RawCsvRow {
            latitude: Some(String::new()),
            ..Default::default()
        };
        let row: CsvDataRow = raw.into();
        assert_eq!(row.latitude, None);
    }

    #[test]
    fn unparseable_field_becomes_none_not_an_error() {
        let raw = RawCsvRow {
            lte_rsrp: Some("not-a-number".to_owned()),
            ..Default::default()
        };
        let row: CsvDataRow = raw.into();
        assert_eq!(row.lte_rsrp, None);
    }

    #[test]
    fn valid_field_parses() {
        let raw = RawCsvRow {
            latitude: Some("44.97".to_owned()),
            compass_direction: Some("180".to_owned()),
            ..Default::default()
        };
        let row: CsvDataRow = raw.into();
        assert_eq!(row.latitude, Some(44.97));
        assert_eq!(row.compass_direction, Some(180));
    }
}
