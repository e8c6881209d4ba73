//! # MTLF (Model-Training Logical Function)
//!
//! Answers `Control.MLModelProvisionSubscription.<event>` CREATEs with the
//! URL of a pre-trained model (spec §4.5). The MTLF never trains a model
//! itself; model files are supplied out of band. Optionally opens an ADRF
//! data-collection subscription to archive the GMLC samples that fed the
//! model it is handing out, and demonstrates the retrieval path by
//! immediately requesting that same dataset back.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use nwdaf_common::bus::ReadMode;
use nwdaf_common::{
    BusWriteHandler, CommonBusOpts, CrudCallbacks, ServiceBase, TracerOptions, WireMode,
    create_default_consumer, create_default_producer, init_tracer, wait_for_broker,
};
use nwdaf_messages::catalog::{
    dataset_collection_subscription, dataset_retrieval_delivery, dataset_retrieval_subscription,
    ml_model_provision_delivery, ml_model_provision_subscription,
};
use nwdaf_messages::payload::adrf::{
    DataSetTag, NadrfDataRetrievalNotification, NadrfDataRetrievalSubscription,
    NadrfDataStoreSubscription, NfDataSubscription, TimeWindow,
};
use nwdaf_messages::payload::location::{
    ExternalClientType, InputData, LocationTypeRequested, PeriodicEventInfo,
};
use nwdaf_messages::payload::ml::{MlEventNotif, MlEventSubscription, MlModelAddr};
use nwdaf_messages::{NwdafEvent, OperationType};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// What the subscription-topic CRUD callback hands off to the one task that
/// owns the outbound writers (spec §13 "Single inbound sequencer").
enum MtlfInboundEvent {
    ProvisionRequested { sub_id: String },
    RetrievalNotif(NadrfDataRetrievalNotification),
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    /// Consumer group id.
    #[clap(long, env = "MTLF_SERVICE_NAME", default_value = "mtlf")]
    service_name: String,

    /// Location every `MLEventNotif` points the AnLF at.
    #[clap(long, default_value = "models")]
    model_url: String,

    /// When set, opens an ADRF data-collection subscription tagged with
    /// this dataset id on every ML provisioning request, and immediately
    /// exercises the retrieval path against it (spec §12 "MTLF's
    /// training-data collection dataset id"). Unset by default, matching
    /// the reference implementation leaving the call commented out.
    #[clap(long)]
    training_dataset_id: Option<String>,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "MTLF_LOG_LEVEL", default_value = "info")]
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

    PrometheusBuilder::new()
        .with_http_listener(args.observability_address)
        .install()
        .into_diagnostic()?;
    nwdaf_common::metrics::describe_all();
    nwdaf_common::metrics::component_info_metric("mtlf");

    let (tx, mut rx) = mpsc::channel::<MtlfInboundEvent>(256);

    let mut service = ServiceBase::new(args.service_name.clone());

    // Control.MLModelProvisionSubscription.UE_LOC_THROUGHPUT (CRUD)
    {
        let topic = ml_model_provision_subscription(NwdafEvent::UeLocThroughput);
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic.as_str()]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let callbacks =
            CrudCallbacks::new().on_create(move |sub_id, _payload: MlEventSubscription| {
                let _ = tx.try_send(MtlfInboundEvent::ProvisionRequested { sub_id });
            });
        let handler =
            nwdaf_common::bus::BusReadHandler::new(consumer, topic, ReadMode::Crud(callbacks));
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Data.DatasetRetrievalDelivery (RECEIVE) — only meaningful once a
    // retrieval subscription has actually been opened below.
    {
        let topic = dataset_retrieval_delivery();
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let handler = nwdaf_common::bus::BusReadHandler::new(
            consumer,
            topic,
            ReadMode::Receive(Box::new(move |_key, notif: NadrfDataRetrievalNotification| {
                let _ = tx.try_send(MtlfInboundEvent::RetrievalNotif(notif));
            })),
        );
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    let model_provision_delivery_writer: BusWriteHandler<MlEventNotif> = BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        ml_model_provision_delivery(NwdafEvent::UeLocThroughput),
        WireMode::Payload,
    );
    let dataset_collection_writer: BusWriteHandler<NadrfDataStoreSubscription> =
        BusWriteHandler::new(
            create_default_producer(&bus.broker, &bus.username, &bus.password)
                .into_diagnostic()?,
            dataset_collection_subscription(),
            WireMode::Crud,
        );
    let dataset_retrieval_writer: BusWriteHandler<NadrfDataRetrievalSubscription> =
        BusWriteHandler::new(
            create_default_producer(&bus.broker, &bus.username, &bus.password)
                .into_diagnostic()?,
            dataset_retrieval_subscription(),
            WireMode::Crud,
        );

    let model_url = args.model_url.clone();
    let training_dataset_id = args.training_dataset_id.clone();
    service.add_task(move |mut shutdown| async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                event = rx.recv() => {
                    let Some(event) = event else { return };
                    match event {
                        MtlfInboundEvent::ProvisionRequested { sub_id } => {
                            handle_provision_request(
                                &sub_id,
                                &model_url,
                                training_dataset_id.as_deref(),
                                &model_provision_delivery_writer,
                                &dataset_collection_writer,
                                &dataset_retrieval_writer,
                            )
                            .await;
                        }
                        MtlfInboundEvent::RetrievalNotif(notif) => {
                            info!(
                                notif_corr_id = %notif.notif_corr_id,
                                termination_req = notif.termination_req,
                                "received a dataset retrieval notification"
                            );
                        }
                    }
                }
            }
        }
    });

    service.run().await.into_diagnostic()?;
    Ok(())
}

/// Everything that happens off the back of one `MLEventSubscription` CREATE
/// (spec §4.5 plus §12's supplemented training-data-collection behaviour).
async fn handle_provision_request(
    sub_id: &str,
    model_url: &str,
    training_dataset_id: Option<&str>,
    model_provision_delivery_writer: &BusWriteHandler<MlEventNotif>,
    dataset_collection_writer: &BusWriteHandler<NadrfDataStoreSubscription>,
    dataset_retrieval_writer: &BusWriteHandler<NadrfDataRetrievalSubscription>,
) {
    let notif = MlEventNotif {
        event: NwdafEvent::UeLocThroughput,
        m_l_file_addr: MlModelAddr {
            m_l_model_url: model_url.to_owned(),
        },
    };
    info!(%sub_id, model_url, "provisioning model to AnLF");
    if let Err(e) = model_provision_delivery_writer
        .enqueue(sub_id, &notif, OperationType::Receive)
        .await
    {
        warn!(%sub_id, error = %e, "failed to publish model provisioning notification");
    }

    let Some(dataset_id) = training_dataset_id else {
        return;
    };

    let dataset_sub = NadrfDataStoreSubscription {
        data_set_tag: DataSetTag {
            data_set_id: dataset_id.to_owned(),
        },
        data_sub: NfDataSubscription::Gmlc(InputData {
            supi: "imsi-abcde".to_owned(),
            ldr_reference: dataset_id.to_owned(),
            external_client_type: ExternalClientType::ValueAddedServices,
            periodic_event_info: PeriodicEventInfo {
                reporting_amount: 1,
                reporting_interval: 10,
                reporting_infinite_ind: true,
            },
            location_type_requested: LocationTypeRequested::CurrentLocation,
            hgmlc_call_back_uri: None,
        }),
    };
    if let Err(e) = dataset_collection_writer
        .enqueue(dataset_id, &dataset_sub, OperationType::Create)
        .await
    {
        warn!(%dataset_id, error = %e, "failed to open ADRF data-collection subscription");
    }

    let retrieval_sub_id = format!("{dataset_id}_retrieval");
    let retrieval_sub = NadrfDataRetrievalSubscription {
        data_set_id: dataset_id.to_owned(),
        notif_corr_id: "dummy".to_owned(),
        notification_uri: "dummy".to_owned(),
        time_period: TimeWindow {
            start_time: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            stop_time: chrono::DateTime::<chrono::Utc>::MAX_UTC,
        },
    };
    info!(%retrieval_sub_id, "exercising the dataset retrieval path");
    if let Err(e) = dataset_retrieval_writer
        .enqueue(&retrieval_sub_id, &retrieval_sub, OperationType::Create)
        .await
    {
        warn!(%retrieval_sub_id, error = %e, "failed to send dataset retrieval subscription");
    }
}
