//! ML model provisioning payloads (spec §4.4 "ML model provisioning", §4.5 MTLF).

use serde::{Deserialize, Serialize};

use crate::nf::NwdafEvent;

/// CREATE payload on `Control.MLModelProvisionSubscription.<event>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlEventSubscription {
    pub event: NwdafEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlModelAddr {
    pub m_l_model_url: String,
}

/// Reply on `Data.MLModelProvisionDelivery.<event>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlEventNotif {
    pub event: NwdafEvent,
    pub m_l_file_addr: MlModelAddr,
}
