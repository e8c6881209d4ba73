//! Structured logging and optional OpenTelemetry export (spec §11 "Logging").
//!
//! Every binary calls [`init_tracer!`] exactly once at startup. With no
//! `--otel-endpoint`, this installs a plain `tracing_subscriber::fmt` layer
//! filtered by `RUST_LOG`. With an endpoint, an OTLP span exporter is layered
//! in as well, so a trace can be followed across the bus from gateway
//! ingress through to a delivered notification.

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Where (if anywhere) to export spans, what namespace to tag them with, and
/// the `EnvFilter` directive driving the fmt layer.
#[derive(Debug, Clone)]
pub struct TracerOptions {
    otel_endpoint: Option<String>,
    otel_namespace: String,
    log_level: String,
}

impl TracerOptions {
    /// `log_level` is the service's own `*_LOG_LEVEL`-backed CLI flag (spec
    /// §11 "Logging"), not `RUST_LOG` — every binary's `Cli` reads it
    /// through `clap`'s `env` attribute and passes it straight through here.
    pub fn new(otel_endpoint: Option<&str>, otel_namespace: String, log_level: String) -> Self {
        Self {
            otel_endpoint: otel_endpoint.map(str::to_owned),
            otel_namespace,
            log_level,
        }
    }
}

/// Owns the process' global subscriber registration.
///
/// Dropping this does not tear down the OTLP pipeline; call
/// [`TracerEngine::use_otel`] to decide whether to flush on shutdown.
pub struct TracerEngine {
    otel_enabled: bool,
    setup_error: Option<String>,
}

impl TracerEngine {
    /// Installs the global `tracing` subscriber. `bin_name` is folded into
    /// the OTLP service name so traces from different binaries in the same
    /// deployment are distinguishable.
    pub fn new(options: TracerOptions, bin_name: &str) -> Self {
        let env_filter =
            EnvFilter::try_new(&options.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer();

        match options.otel_endpoint {
            Some(endpoint) => {
                let service_name = if options.otel_namespace.is_empty() {
                    bin_name.to_owned()
                } else {
                    format!("{}.{bin_name}", options.otel_namespace)
                };

                match build_otel_layer(&endpoint, &service_name) {
                    Ok(otel_layer) => {
                        Registry::default()
                            .with(env_filter)
                            .with(fmt_layer)
                            .with(otel_layer)
                            .init();
                        Self {
                            otel_enabled: true,
                            setup_error: None,
                        }
                    }
                    Err(e) => {
                        Registry::default().with(env_filter).with(fmt_layer).init();
                        Self {
                            otel_enabled: true,
                            setup_error: Some(e.to_string()),
                        }
                    }
                }
            }
            None => {
                Registry::default().with(env_filter).with(fmt_layer).init();
                Self {
                    otel_enabled: false,
                    setup_error: None,
                }
            }
        }
    }

    /// Whether OpenTelemetry export was requested (regardless of whether
    /// setup ultimately succeeded — see [`TracerEngine::get_otel_setup_error`]).
    pub fn use_otel(&self) -> bool {
        self.otel_enabled
    }

    /// `Some` if OTLP export was requested but the layer failed to install;
    /// the process still runs with plain `fmt` logging in that case.
    pub fn get_otel_setup_error(&self) -> Option<&str> {
        self.setup_error.as_deref()
    }

    /// Registers a handler for asynchronous OpenTelemetry export errors
    /// (batch-export failures reported after startup has already succeeded).
    pub fn set_otel_error_handler(
        &self,
        handler: impl Fn(opentelemetry::global::Error) + Send + Sync + 'static,
    ) -> Result<(), opentelemetry::global::Error> {
        global::set_error_handler(handler)
    }
}

fn build_otel_layer(
    endpoint: &str,
    service_name: &str,
) -> Result<
    tracing_opentelemetry::OpenTelemetryLayer<Registry, opentelemetry_sdk::trace::Tracer>,
    opentelemetry::trace::TraceError,
> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
            opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                service_name.to_owned(),
            )]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    let tracer = provider.tracer(service_name.to_owned());
    global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Installs the global subscriber and logs the OTLP setup outcome, if any.
///
/// Parallels the reference component's startup sequence: OTLP setup failures
/// are never fatal, only logged, since the service is still fully functional
/// on the bus without tracing export.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{
        let tracer = $crate::tracer::TracerEngine::new($options, env!("CARGO_BIN_NAME"));
        if tracer.use_otel() {
            if let Some(e) = tracer.get_otel_setup_error() {
                tracing::warn!("{e}");
            } else if let Err(e) = tracer.set_otel_error_handler(|e| tracing::warn!("{e}")) {
                tracing::warn!("{e}");
            }
        }
        tracer
    }};
}
