//! Request surface: structured payloads in, structured responses out.
//!
//! Malformed input maps to a 400-equivalent, business outcomes (not found,
//! insufficient balance, ...) to a 200-equivalent carrying an error
//! discriminator, and store faults to a 500-equivalent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info_span};

use crate::cup::tracker::checkin::{CheckInOutcome, Ledger};
use crate::cup::tracker::clock::Clock;
use crate::cup::tracker::config::TrackerConfig;
use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::index::normalize_date;
use crate::cup::tracker::io::TabularStore;
use crate::cup::tracker::model::{ActionKind, RankingEntry, RankingMode};
use crate::cup::tracker::ranking::RankingAggregator;
use crate::cup::tracker::transcript::Transcript;
use crate::cup::tracker::transfer::{PointTransferSaga, TransferOutcome, TransferRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckInPayload {
    #[serde(alias = "studentId")]
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransferPayload {
    #[serde(alias = "actorId")]
    pub actor_id: Option<String>,
    #[serde(alias = "recipientId", alias = "studentId")]
    pub recipient_id: Option<String>,
    #[serde(alias = "points")]
    pub amount: Option<i64>,
    pub reason: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RankingPayload {
    pub week: Option<String>,
    #[serde(alias = "type")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranscriptPayload {
    pub date: Option<String>,
}

/// Operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckIn,
    Transfer,
    Ranking,
    Transcript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Response envelope shared by every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: Status,
    /// HTTP-equivalent status code.
    pub code: u16,
    /// Machine-readable discriminator.
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    fn success(kind: &str, message: String, data: Option<Value>) -> Self {
        Self {
            status: Status::Success,
            code: 200,
            kind: kind.to_string(),
            message,
            data,
        }
    }

    fn business_error(kind: &str, message: String, data: Option<Value>) -> Self {
        Self {
            status: Status::Error,
            code: 200,
            kind: kind.to_string(),
            message,
            data,
        }
    }

    fn from_error(err: &TrackerError) -> Self {
        if err.is_validation() {
            return Self {
                status: Status::Error,
                code: 400,
                kind: "invalid_request".to_string(),
                message: err.to_string(),
                data: None,
            };
        }
        error!(error = %err, "operation failed");
        Self {
            status: Status::Error,
            code: 500,
            kind: "internal_error".to_string(),
            message: format!("An error occurred: {err}"),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(TrackerError::Validation(format!("{field} not provided"))),
    }
}

/// Binds the store, configuration and clock for request handling.
pub struct Service<'a, T: TabularStore, C: Clock> {
    store: &'a T,
    config: &'a TrackerConfig,
    clock: &'a C,
}

impl<'a, T: TabularStore, C: Clock> Service<'a, T, C> {
    pub fn new(store: &'a T, config: &'a TrackerConfig, clock: &'a C) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Decodes a JSON body and dispatches it.
    pub fn handle(&self, operation: Operation, body: &str) -> Response {
        let decoded = match operation {
            Operation::CheckIn => serde_json::from_str::<CheckInPayload>(body)
                .map(|payload| self.check_in(&payload)),
            Operation::Transfer => serde_json::from_str::<TransferPayload>(body)
                .map(|payload| self.transfer(&payload)),
            Operation::Ranking => serde_json::from_str::<RankingPayload>(body)
                .map(|payload| self.ranking(&payload)),
            Operation::Transcript => serde_json::from_str::<TranscriptPayload>(body)
                .map(|payload| self.transcript(&payload)),
        };
        decoded.unwrap_or_else(|err| {
            Response::from_error(&TrackerError::Validation(format!("malformed body: {err}")))
        })
    }

    pub fn check_in(&self, payload: &CheckInPayload) -> Response {
        let _span = info_span!("check_in").entered();
        let result = required(&payload.entity_id, "entity_id").and_then(|entity_id| {
            Ledger::new(self.store, self.config).check_in(&entity_id, self.clock.local_now())
        });
        match result {
            Ok(outcome) => check_in_response(&outcome),
            Err(err) => Response::from_error(&err),
        }
    }

    pub fn transfer(&self, payload: &TransferPayload) -> Response {
        let _span = info_span!("transfer").entered();
        let result = transfer_request(payload).and_then(|request| {
            PointTransferSaga::new(self.store, self.config)
                .transfer(&request, self.clock.local_now())
        });
        match result {
            Ok(outcome) => transfer_response(&outcome),
            Err(err) => Response::from_error(&err),
        }
    }

    pub fn ranking(&self, payload: &RankingPayload) -> Response {
        let _span = info_span!("ranking").entered();
        match self.run_ranking(payload) {
            Ok((week, ranking)) => Response::success(
                "ranking",
                format!("{} entries ranked for {week}.", ranking.len()),
                serde_json::to_value(&ranking).ok(),
            ),
            Err(err) => Response::from_error(&err),
        }
    }

    pub fn transcript(&self, payload: &TranscriptPayload) -> Response {
        let _span = info_span!("transcript").entered();
        match self.run_transcript(payload) {
            Ok((date, lines)) => Response::success(
                "transcript",
                format!("{} entries on {date}.", lines.len()),
                serde_json::to_value(&lines).ok(),
            ),
            Err(err) => Response::from_error(&err),
        }
    }

    fn run_ranking(&self, payload: &RankingPayload) -> Result<(String, Vec<RankingEntry>)> {
        let week = required(&payload.week, "week")?;
        let mode: RankingMode = required(&payload.mode, "mode")?.parse()?;
        let ranking =
            RankingAggregator::new(self.store, self.config).aggregate(&[week.clone()], mode)?;
        Ok((week, ranking))
    }

    fn run_transcript(&self, payload: &TranscriptPayload) -> Result<(NaiveDate, Vec<String>)> {
        let raw = required(&payload.date, "date")?;
        let date = normalize_date(&raw)
            .ok_or_else(|| TrackerError::Validation(format!("unrecognised date '{raw}'")))?;
        let lines = Transcript::new(self.store, self.config).lines_for(date)?;
        Ok((date, lines))
    }
}

fn transfer_request(payload: &TransferPayload) -> Result<TransferRequest> {
    let actor_id = required(&payload.actor_id, "actor_id")?;
    let recipient_id = required(&payload.recipient_id, "recipient_id")?;
    let amount = payload
        .amount
        .ok_or_else(|| TrackerError::Validation("amount not provided".to_string()))?;
    if amount < 0 {
        return Err(TrackerError::Validation(format!(
            "amount must be non-negative, got {amount}"
        )));
    }
    let action: ActionKind = required(&payload.action, "action")?.parse()?;
    Ok(TransferRequest {
        actor_id,
        recipient_id,
        amount,
        reason: payload.reason.as_deref().unwrap_or("").trim().to_string(),
        action,
    })
}

fn check_in_response(outcome: &CheckInOutcome) -> Response {
    let data = serde_json::to_value(outcome).ok();
    if outcome.is_success() {
        Response::success(outcome.kind(), outcome.message(), data)
    } else {
        Response::business_error(outcome.kind(), outcome.message(), data)
    }
}

fn transfer_response(outcome: &TransferOutcome) -> Response {
    let data = serde_json::to_value(outcome).ok();
    if outcome.is_success() {
        Response::success(outcome.kind(), outcome.message(), data)
    } else {
        Response::business_error(outcome.kind(), outcome.message(), data)
    }
}
