//! # ADRF (Analytics Data Repository Function)
//!
//! Observes every `Data.EventExposureDelivery.<NF>.<event>` topic and, for
//! whichever NFs currently have an active dataset-collection subscription,
//! persists each notification to MongoDB (spec §4.6). Also answers dataset
//! retrieval subscriptions by scanning a dataset's collection and replaying
//! it over `Data.DatasetRetrievalDelivery`.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use futures::stream::TryStreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use miette::IntoDiagnostic;
use mongodb::bson::doc;
use nwdaf_common::bus::ReadMode;
use nwdaf_common::{
    BusWriteHandler, CommonBusOpts, CrudCallbacks, ServiceBase, TracerOptions, WireMode,
    create_default_consumer, create_default_producer, init_tracer, wait_for_broker,
};
use nwdaf_messages::catalog::{
    dataset_collection_subscription, dataset_retrieval_delivery, dataset_retrieval_subscription,
    event_exposure_delivery, event_exposure_subscription,
};
use nwdaf_messages::nf::{
    AfEvent, AmfEventType, GmlcEvent, NefEvent, NfEventPayload, NfType, NrfEvent, NsacfEvent,
    RanEvent, SmfEvent, UdmEvent, UpfEventType,
};
use nwdaf_messages::payload::adrf::{
    DataNotification, NadrfDataRetrievalNotification, NadrfDataRetrievalSubscription,
    NadrfDataStoreSubscription,
};
use nwdaf_messages::payload::nf_notifications::{
    AfEventExposureNotif, AmfEventNotification, MonitoringReport, NefEventExposureNotif,
    NrfNotificationData, NsmfEventExposureNotification, SacEventReport, UpfNotificationData,
};
use nwdaf_messages::payload::location::EventNotifyDataExt;
use nwdaf_messages::payload::ran::RanEventExposureNotification;
use nwdaf_messages::OperationType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One persisted record (spec §3 "Dataset record"). Stored one-per-document
/// in a MongoDB collection named after its dataset id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetRecordDoc {
    payload: NfEventPayload,
    timestamp: DateTime<Utc>,
}

enum AdrfInboundEvent {
    DatasetCollectionCreated {
        payload: NadrfDataStoreSubscription,
    },
    DatasetRetrievalCreated {
        payload: NadrfDataRetrievalSubscription,
    },
    EventExposureNotif(NfEventPayload),
}

#[derive(Debug, Parser)]
#[clap(author, version = nwdaf_common::version!(), about)]
struct Cli {
    #[clap(flatten)]
    common_bus_options: CommonBusOpts,

    #[clap(long, env = "ADRF_SERVICE_NAME", default_value = "adrf")]
    service_name: String,

    /// MongoDB connection string (spec §11 "Configuration").
    #[clap(long, env = "MONGO_URI")]
    mongo_uri: String,

    #[clap(long, default_value = "adrf")]
    db_name: String,

    #[clap(long, env, default_value = "127.0.0.1:9090")]
    observability_address: SocketAddr,

    #[clap(long, default_value = "20")]
    broker_wait_timeout_seconds: u64,

    #[clap(long, env = "ADRF_LOG_LEVEL", default_value = "info")]
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

    let mongo_client = mongodb::Client::with_uri_str(&args.mongo_uri)
        .await
        .into_diagnostic()?;
    let db = mongo_client.database(&args.db_name);

    PrometheusBuilder::new()
        .with_http_listener(args.observability_address)
        .install()
        .into_diagnostic()?;
    nwdaf_common::metrics::describe_all();
    nwdaf_common::metrics::component_info_metric("adrf");

    let (tx, mut rx) = mpsc::channel::<AdrfInboundEvent>(1024);

    let mut service = ServiceBase::new(args.service_name.clone());

    // Control.DatasetCollectionSubscription (CRUD)
    {
        let topic = dataset_collection_subscription();
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let callbacks = CrudCallbacks::new().on_create(
            move |_sub_id, payload: NadrfDataStoreSubscription| {
                let _ = tx.try_send(AdrfInboundEvent::DatasetCollectionCreated { payload });
            },
        );
        let handler =
            nwdaf_common::bus::BusReadHandler::new(consumer, topic, ReadMode::Crud(callbacks));
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Control.DatasetRetrievalSubscription (CRUD)
    {
        let topic = dataset_retrieval_subscription();
        let consumer = create_default_consumer(
            &bus.broker,
            &bus.username,
            &bus.password,
            &args.service_name,
            Some(&[topic]),
        )
        .into_diagnostic()?;
        let tx = tx.clone();
        let callbacks = CrudCallbacks::new().on_create(
            move |_sub_id, payload: NadrfDataRetrievalSubscription| {
                let _ = tx.try_send(AdrfInboundEvent::DatasetRetrievalCreated { payload });
            },
        );
        let handler =
            nwdaf_common::bus::BusReadHandler::new(consumer, topic, ReadMode::Crud(callbacks));
        service.add_read_handler(move |shutdown| handler.run(shutdown));
    }

    // Data.EventExposureDelivery.<NF>.<event> (RECEIVE) for every NF this
    // system knows about (spec §4.6: "subscribes to all ... topics").
    macro_rules! spawn_event_exposure_readers {
        ($events:ty, $nf:expr, $wrap:expr) => {
            for event in <$events>::iter() {
                spawn_event_exposure_reader(
                    &mut service,
                    bus,
                    &args.service_name,
                    $nf,
                    event,
                    tx.clone(),
                    $wrap,
                )?;
            }
        };
    }
    spawn_event_exposure_readers!(SmfEvent, NfType::Smf, NfEventPayload::Smf as fn(
        NsmfEventExposureNotification
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(AfEvent, NfType::Af, NfEventPayload::Af as fn(
        AfEventExposureNotif
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(AmfEventType, NfType::Amf, NfEventPayload::Amf as fn(
        AmfEventNotification
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(UpfEventType, NfType::Upf, NfEventPayload::Upf as fn(
        UpfNotificationData
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(NefEvent, NfType::Nef, NfEventPayload::Nef as fn(
        NefEventExposureNotif
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(GmlcEvent, NfType::Gmlc, NfEventPayload::Gmlc as fn(
        EventNotifyDataExt
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(RanEvent, NfType::Ran, NfEventPayload::Ran as fn(
        RanEventExposureNotification
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(NrfEvent, NfType::Nrf, NfEventPayload::Nrf as fn(
        NrfNotificationData
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(NsacfEvent, NfType::Nsacf, NfEventPayload::Nsacf as fn(
        SacEventReport
    ) -> NfEventPayload);
    spawn_event_exposure_readers!(UdmEvent, NfType::Udm, NfEventPayload::Udm as fn(
        MonitoringReport
    ) -> NfEventPayload);

    // Control.EventExposureSubscription.<NF>.<event> writers, keyed by
    // topic, built once so the dataset-collection dispatch table (spec §4.6
    // "map it to the NF/event pair") can look one up at runtime.
    let mut subscription_writers: HashMap<String, BusWriteHandler<serde_json::Value>> =
        HashMap::new();
    macro_rules! register_subscription_writers {
        ($events:ty, $nf:expr) => {
            for event in <$events>::iter() {
                let topic = event_exposure_subscription($nf, event);
                let writer = BusWriteHandler::new(
                    create_default_producer(&bus.broker, &bus.username, &bus.password)
                        .into_diagnostic()?,
                    topic.clone(),
                    WireMode::Crud,
                );
                subscription_writers.insert(topic, writer);
            }
        };
    }
    register_subscription_writers!(SmfEvent, NfType::Smf);
    register_subscription_writers!(AfEvent, NfType::Af);
    register_subscription_writers!(AmfEventType, NfType::Amf);
    register_subscription_writers!(UpfEventType, NfType::Upf);
    register_subscription_writers!(NefEvent, NfType::Nef);
    register_subscription_writers!(GmlcEvent, NfType::Gmlc);
    register_subscription_writers!(RanEvent, NfType::Ran);
    register_subscription_writers!(NrfEvent, NfType::Nrf);
    register_subscription_writers!(NsacfEvent, NfType::Nsacf);
    register_subscription_writers!(UdmEvent, NfType::Udm);

    let retrieval_writer: BusWriteHandler<NadrfDataRetrievalNotification> = BusWriteHandler::new(
        create_default_producer(&bus.broker, &bus.username, &bus.password).into_diagnostic()?,
        dataset_retrieval_delivery(),
        WireMode::Payload,
    );

    service.add_task(move |mut shutdown| async move {
        let mut active_dataset_ids: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                event = rx.recv() => {
                    let Some(event) = event else { return };
                    match event {
                        AdrfInboundEvent::DatasetCollectionCreated { payload } => {
                            handle_dataset_collection_created(
                                payload,
                                &subscription_writers,
                                &mut active_dataset_ids,
                            )
                            .await;
                        }
                        AdrfInboundEvent::EventExposureNotif(payload) => {
                            handle_event_exposure_notif(payload, &db, &active_dataset_ids).await;
                        }
                        AdrfInboundEvent::DatasetRetrievalCreated { payload } => {
                            handle_dataset_retrieval_created(payload, &db, &retrieval_writer).await;
                        }
                    }
                }
            }
        }
    });

    service.run().await.into_diagnostic()?;
    Ok(())
}

fn spawn_event_exposure_reader<T>(
    service: &mut ServiceBase,
    bus: &CommonBusOpts,
    service_name: &str,
    nf: NfType,
    event: impl std::fmt::Display,
    tx: mpsc::Sender<AdrfInboundEvent>,
    wrap: fn(T) -> NfEventPayload,
) -> miette::Result<()>
where
    T: DeserializeOwned + Send + 'static,
{
    let topic = event_exposure_delivery(nf, event);
    let consumer = create_default_consumer(
        &bus.broker,
        &bus.username,
        &bus.password,
        service_name,
        Some(&[topic.as_str()]),
    )
    .into_diagnostic()?;
    let handler = nwdaf_common::bus::BusReadHandler::new(
        consumer,
        topic,
        ReadMode::Receive(Box::new(move |_key, payload: T| {
            let _ = tx.try_send(AdrfInboundEvent::EventExposureNotif(wrap(payload)));
        })),
    );
    service.add_read_handler(move |shutdown| handler.run(shutdown));
    Ok(())
}

/// Re-emits the subscription's inner payload as a CREATE on the matching
/// `Control.EventExposureSubscription.<NF>.<event>` topic and starts
/// tracking its dataset id (spec §4.6).
async fn handle_dataset_collection_created(
    payload: NadrfDataStoreSubscription,
    subscription_writers: &HashMap<String, BusWriteHandler<serde_json::Value>>,
    active_dataset_ids: &mut HashSet<String>,
) {
    let dataset_id = payload.data_set_tag.data_set_id.clone();
    let topic = event_exposure_subscription(
        payload.data_sub.nf_type(),
        payload.data_sub.event_topic_segment(),
    );

    let Some(writer) = subscription_writers.get(&topic) else {
        warn!(%topic, "no event-exposure subscription writer for this NF/event, ignoring");
        return;
    };

    let value = match payload.data_sub.inner_payload_json() {
        Ok(value) => value,
        Err(e) => {
            warn!(%dataset_id, error = %e, "failed to serialise inner event-exposure subscription");
            return;
        }
    };

    match writer
        .enqueue(&dataset_id, &value, OperationType::Create)
        .await
    {
        Ok(()) => {
            info!(%dataset_id, %topic, "opened event-exposure subscription for dataset collection");
            active_dataset_ids.insert(dataset_id);
        }
        Err(e) => warn!(%dataset_id, error = %e, "failed to open event-exposure subscription"),
    }
}

/// Persists the notification if (and only if) its correlation id names a
/// dataset currently being collected (spec §4.6 "if that value is in the
/// active dataset set, persist").
async fn handle_event_exposure_notif(
    payload: NfEventPayload,
    db: &mongodb::Database,
    active_dataset_ids: &HashSet<String>,
) {
    let dataset_id = payload.correlation_id().to_owned();
    if !active_dataset_ids.contains(&dataset_id) {
        return;
    }

    let record = DatasetRecordDoc {
        timestamp: payload.timestamp(Utc::now()),
        payload,
    };
    let collection = db.collection::<DatasetRecordDoc>(&dataset_id);
    if let Err(e) = collection.insert_one(&record).await {
        warn!(%dataset_id, error = %e, "failed to persist dataset record");
    } else {
        info!(%dataset_id, "persisted new dataset record");
    }
}

/// Scans the dataset's collection, filters by the requested time window,
/// and replays every matching record over `Data.DatasetRetrievalDelivery`
/// (spec §4.6 "Retrieval"). Records are delivered in scan order; the last
/// one carries `termination_req = true`.
async fn handle_dataset_retrieval_created(
    payload: NadrfDataRetrievalSubscription,
    db: &mongodb::Database,
    retrieval_writer: &BusWriteHandler<NadrfDataRetrievalNotification>,
) {
    let collection = db.collection::<DatasetRecordDoc>(&payload.data_set_id);
    let cursor = match collection.find(doc! {}).await {
        Ok(cursor) => cursor,
        Err(e) => {
            warn!(data_set_id = %payload.data_set_id, error = %e, "failed to scan dataset collection");
            return;
        }
    };

    let all_records: Vec<DatasetRecordDoc> = match cursor.try_collect().await {
        Ok(records) => records,
        Err(e) => {
            warn!(data_set_id = %payload.data_set_id, error = %e, "failed to read dataset cursor");
            return;
        }
    };

    let records: Vec<DatasetRecordDoc> = all_records
        .into_iter()
        .filter(|r| {
            r.timestamp >= payload.time_period.start_time
                && r.timestamp <= payload.time_period.stop_time
        })
        .collect();

    let last_index = records.len().saturating_sub(1);
    for (index, record) in records.into_iter().enumerate() {
        let notif = NadrfDataRetrievalNotification {
            notif_corr_id: payload.notif_corr_id.clone(),
            time_stamp: Utc::now(),
            data_notif: DataNotification {
                payload: record.payload,
                time_stamp: record.timestamp,
            },
            termination_req: index == last_index,
        };
        if let Err(e) = retrieval_writer
            .enqueue(&payload.data_set_id, &notif, OperationType::Receive)
            .await
        {
            warn!(data_set_id = %payload.data_set_id, error = %e, "failed to publish dataset retrieval notification");
        }
    }
}
