//! Point transfers from an actor's budget to a participant's daily score.
//!
//! The actor balance is the ledger of record: its debit is the only step with
//! a compensation. The recipient's new total is computed, with overflow
//! checked, before anything past the debit is written. Once the recipient
//! score is being written the transfer is past the point of no return, and a
//! failure there or while appending the audit row is reported without rolling
//! anything back.
//!
//! Nothing is locked. Two transfers racing on the same balance or score cell
//! can lose an update; callers that need stronger guarantees must serialize.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::cup::tracker::config::TrackerConfig;
use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::index::{ColumnIndex, RowIndex};
use crate::cup::tracker::io::TabularStore;
use crate::cup::tracker::model::{
    ActionKind, AuditEntry, CellAddress, RangeSpec, Snapshot, cell, parse_points,
};
use crate::cup::tracker::saga::{Saga, SagaOutcome, Step, StepFlow};

/// Arguments of a single transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub actor_id: String,
    pub recipient_id: String,
    pub amount: i64,
    pub reason: String,
    pub action: ActionKind,
}

/// Result of a transfer. Every variant other than `Success` is a business
/// outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Success { recipient: String, new_total: i64 },
    ActorNotFound { actor_id: String },
    InsufficientBalance { balance: i64, amount: i64 },
    ColumnNotFound { category: String, date: NaiveDate },
    RecipientNotFound { recipient_id: String },
    ScoreOutOfRange { recipient: String, current: i64, delta: i64 },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    /// Stable discriminator used in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferOutcome::Success { .. } => "success",
            TransferOutcome::ActorNotFound { .. } => "actor_not_found",
            TransferOutcome::InsufficientBalance { .. } => "insufficient_balance",
            TransferOutcome::ColumnNotFound { .. } => "column_not_found",
            TransferOutcome::RecipientNotFound { .. } => "recipient_not_found",
            TransferOutcome::ScoreOutOfRange { .. } => "score_out_of_range",
        }
    }

    pub fn message(&self) -> String {
        match self {
            TransferOutcome::Success {
                recipient,
                new_total,
            } => format!("Updated points for {recipient} to {new_total}."),
            TransferOutcome::ActorNotFound { actor_id } => {
                format!("Actor '{actor_id}' has no balance entry.")
            }
            TransferOutcome::InsufficientBalance { balance, amount } => {
                format!("Insufficient balance: {balance} available, {amount} requested.")
            }
            TransferOutcome::ColumnNotFound { category, date } => {
                format!("Could not find '{category}' column for {date}.")
            }
            TransferOutcome::RecipientNotFound { recipient_id } => {
                format!("Participant '{recipient_id}' not found.")
            }
            TransferOutcome::ScoreOutOfRange {
                recipient,
                current,
                delta,
            } => format!("Cannot move {recipient}'s score of {current} by {delta}."),
        }
    }
}

/// Values carried between saga steps.
#[derive(Debug, Default)]
struct TransferState {
    balance_address: Option<CellAddress>,
    balance_before: i64,
    actor_name: String,
    week_table: String,
    week_rows: Snapshot,
    points_column: usize,
    recipient_row: usize,
    recipient_name: String,
    recipient_group: String,
    new_total: i64,
}

/// Executes point transfers against the balance, weekly and audit tables.
pub struct PointTransferSaga<'a, T: TabularStore> {
    store: &'a T,
    config: &'a TrackerConfig,
}

impl<'a, T: TabularStore> PointTransferSaga<'a, T> {
    pub fn new(store: &'a T, config: &'a TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Moves `amount` points from the actor's budget onto the recipient's
    /// score for today.
    ///
    /// The actor's balance is consumed by `amount` for both `add` and
    /// `remove`; the recipient's score moves by `+amount` or `-amount`.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            actor = %request.actor_id,
            recipient = %request.recipient_id,
            amount = request.amount,
            action = ?request.action,
            %now
        )
    )]
    pub fn transfer(
        &self,
        request: &TransferRequest,
        now: NaiveDateTime,
    ) -> Result<TransferOutcome> {
        if request.amount < 0 {
            return Err(TrackerError::Validation(format!(
                "amount must be non-negative, got {}",
                request.amount
            )));
        }

        let balances = &self.config.balances;
        let balance_rows = self.store.get_range(&balances.table, RangeSpec::All)?;
        let actors = RowIndex::build(&balance_rows, balances.id_column, balances.first_data_row);
        let Some(actor_row) = actors.find(&request.actor_id) else {
            return Ok(TransferOutcome::ActorNotFound {
                actor_id: request.actor_id.clone(),
            });
        };

        let actor_cells = &balance_rows[actor_row];
        let balance = parse_points(cell(actor_cells, balances.balance_column));
        if balance < request.amount {
            info!(balance, "insufficient balance");
            return Ok(TransferOutcome::InsufficientBalance {
                balance,
                amount: request.amount,
            });
        }

        let actor_name = match cell(actor_cells, balances.name_column).trim() {
            "" => request.actor_id.trim().to_string(),
            name => name.to_string(),
        };

        let mut state = TransferState {
            balance_address: Some(CellAddress::from_offsets(actor_row, balances.balance_column)),
            balance_before: balance,
            actor_name,
            ..TransferState::default()
        };

        let outcome = self.saga(request, now).run(&mut state)?;
        match outcome {
            SagaOutcome::Completed => {
                info!(
                    table = %state.week_table,
                    new_total = state.new_total,
                    remaining = state.balance_before - request.amount,
                    "transfer completed"
                );
                Ok(TransferOutcome::Success {
                    recipient: state.recipient_name,
                    new_total: state.new_total,
                })
            }
            SagaOutcome::Aborted { step, outcome } => {
                warn!(step, kind = outcome.kind(), "transfer aborted, actor balance restored");
                Ok(outcome)
            }
        }
    }

    fn saga<'r>(
        &self,
        request: &'r TransferRequest,
        now: NaiveDateTime,
    ) -> Saga<'r, TransferState, TransferOutcome>
    where
        'a: 'r,
        T: 'r,
    {
        let store = self.store;
        let config = self.config;
        let balance_table = config.balances.table.as_str();
        let today = now.date();
        let column_missing = move || TransferOutcome::ColumnNotFound {
            category: config.points_label.clone(),
            date: today,
        };

        Saga::new("point_transfer")
            .step(Step::compensable(
                "debit_actor",
                move |state: &mut TransferState| {
                    let address = balance_address(state)?;
                    let remaining = state.balance_before - request.amount;
                    store.update_cell(balance_table, address, &remaining.to_string())?;
                    Ok(StepFlow::Continue)
                },
                move |state: &mut TransferState| {
                    let address = balance_address(state)?;
                    store.update_cell(balance_table, address, &state.balance_before.to_string())
                },
            ))
            .step(Step::guard(
                "resolve_points_column",
                move |state: &mut TransferState| {
                    let Some(table) = config.schedule.resolve_week_table(now) else {
                        return Ok(StepFlow::Abort(column_missing()));
                    };
                    let layout = &config.layout;
                    let rows = store.get_range(table, layout.lookup_range())?;
                    let columns = ColumnIndex::build(&rows, layout.category_row, layout.date_row);
                    let Some(column) = columns.find(&config.points_label, today) else {
                        return Ok(StepFlow::Abort(column_missing()));
                    };
                    state.week_table = table.to_string();
                    state.week_rows = rows;
                    state.points_column = column;
                    Ok(StepFlow::Continue)
                },
            ))
            .step(Step::guard(
                "resolve_recipient",
                move |state: &mut TransferState| {
                    let layout = &config.layout;
                    let recipients =
                        RowIndex::build(&state.week_rows, layout.id_column, layout.first_data_row);
                    let Some(row_offset) = recipients.find(&request.recipient_id) else {
                        return Ok(StepFlow::Abort(TransferOutcome::RecipientNotFound {
                            recipient_id: request.recipient_id.clone(),
                        }));
                    };
                    let row = &state.week_rows[row_offset];
                    state.recipient_name = match cell(row, layout.name_column).trim() {
                        "" => request.recipient_id.trim().to_string(),
                        name => name.to_string(),
                    };
                    state.recipient_group = cell(row, layout.group_column).trim().to_string();
                    state.recipient_row = row_offset;

                    let current = parse_points(cell(row, state.points_column));
                    let delta = request.action.signed(request.amount);
                    let Some(new_total) = current.checked_add(delta) else {
                        return Ok(StepFlow::Abort(TransferOutcome::ScoreOutOfRange {
                            recipient: state.recipient_name.clone(),
                            current,
                            delta,
                        }));
                    };
                    state.new_total = new_total;
                    Ok(StepFlow::Continue)
                },
            ))
            .step(Step::forward(
                "credit_recipient",
                move |state: &mut TransferState| {
                    let address =
                        CellAddress::from_offsets(state.recipient_row, state.points_column);
                    store.update_cell(&state.week_table, address, &state.new_total.to_string())?;
                    Ok(StepFlow::Continue)
                },
            ))
            .step(Step::forward(
                "append_audit",
                move |state: &mut TransferState| {
                    let entry = AuditEntry::for_transfer(
                        now,
                        &state.recipient_name,
                        &config.actor_role,
                        &state.actor_name,
                        request.action.signed(request.amount),
                        &request.reason,
                        &state.recipient_group,
                    );
                    store.append_row(&config.audit_table, &entry.to_row())?;
                    Ok(StepFlow::Continue)
                },
            ))
    }
}

fn balance_address(state: &TransferState) -> Result<CellAddress> {
    state
        .balance_address
        .ok_or_else(|| TrackerError::Store("actor balance cell not resolved".to_string()))
}
