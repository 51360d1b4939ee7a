//! JSON bodies exchanged with the coordinator.
//!
//! Binary payloads travel as `0x`-prefixed hex strings.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use wallet_core::{FinishStatus, Metadata, Notice, Report, Request, Voucher};

use crate::RollupError;

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(s: &str) -> Result<Vec<u8>, RollupError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(digits)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishBody {
    pub status: FinishStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceData {
    pub metadata: Metadata,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectData {
    pub payload: String,
}

/// Body of a `200` answer to `/finish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request_type", content = "data", rename_all = "snake_case")]
pub enum RollupRequest {
    AdvanceState(AdvanceData),
    InspectState(InspectData),
}

impl RollupRequest {
    pub fn into_request(self) -> Result<Request, RollupError> {
        match self {
            RollupRequest::AdvanceState(data) => Ok(Request::Advance {
                payload: from_hex(&data.payload)?,
                metadata: data.metadata,
            }),
            RollupRequest::InspectState(data) => Ok(Request::Inspect {
                payload: from_hex(&data.payload)?,
            }),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        match request {
            Request::Advance { metadata, payload } => RollupRequest::AdvanceState(AdvanceData {
                metadata: metadata.clone(),
                payload: to_hex(payload),
            }),
            Request::Inspect { payload } => RollupRequest::InspectState(InspectData {
                payload: to_hex(payload),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadBody {
    pub payload: String,
}

impl From<&Notice> for PayloadBody {
    fn from(notice: &Notice) -> Self {
        Self {
            payload: to_hex(&notice.payload),
        }
    }
}

impl From<&Report> for PayloadBody {
    fn from(report: &Report) -> Self {
        Self {
            payload: to_hex(&report.payload),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherBody {
    pub destination: Address,
    pub payload: String,
}

impl From<&Voucher> for VoucherBody {
    fn from(voucher: &Voucher) -> Self {
        Self {
            destination: voucher.destination,
            payload: to_hex(&voucher.payload),
        }
    }
}
