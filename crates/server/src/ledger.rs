//! Ledger API endpoints: vouchers, account ledgers and statements.

use api_types::ledger::{
    AccountLedgerView, BalanceSheetView, LedgerLineView, LedgerQuery, ProfitAndLossView,
    ReportLine, ReportQuery, TrialBalanceRow, TrialBalanceView, VoucherCreated, VoucherNew,
    VoucherType,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{EntryLine, Money, PostTransactionCmd};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{Actor, ServerState},
};

fn map_voucher_type(voucher_type: VoucherType) -> engine::VoucherType {
    match voucher_type {
        VoucherType::Journal => engine::VoucherType::Journal,
        VoucherType::Payment => engine::VoucherType::Payment,
        VoucherType::Receipt => engine::VoucherType::Receipt,
        VoucherType::Contra => engine::VoucherType::Contra,
        VoucherType::Sales => engine::VoucherType::Sales,
        VoucherType::Purchase => engine::VoucherType::Purchase,
    }
}

fn map_lines(lines: Vec<engine::ReportLine>) -> Vec<ReportLine> {
    lines
        .into_iter()
        .map(|line| ReportLine {
            account_id: line.account_id,
            code: line.code,
            name: line.name,
            amount_minor: line.amount.minor(),
        })
        .collect()
}

pub async fn voucher_new(
    Extension(Actor(actor)): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<VoucherNew>,
) -> Result<(StatusCode, Json<VoucherCreated>), ServerError> {
    let mut cmd = PostTransactionCmd::new(
        payload.date,
        map_voucher_type(payload.voucher_type),
        payload.description,
        actor,
    );
    cmd.reference_type = payload.reference_type;
    cmd.reference_id = payload.reference_id;
    for entry in payload.entries {
        cmd = cmd.entry(EntryLine {
            account_id: entry.account_id,
            debit: Money::new(entry.debit_minor),
            credit: Money::new(entry.credit_minor),
            description: entry.description,
        });
    }
    let transaction = state.engine.post_transaction(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(VoucherCreated {
            id: transaction.id,
            voucher_number: transaction.voucher_number,
        }),
    ))
}

pub async fn account_ledger(
    State(state): State<ServerState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<AccountLedgerView>, ServerError> {
    let ledger = state
        .engine
        .account_ledger(account_id, query.from, query.to)
        .await?;

    Ok(Json(AccountLedgerView {
        account_id: ledger.account.id,
        code: ledger.account.code,
        name: ledger.account.name,
        opening_balance_minor: ledger.opening_balance.minor(),
        closing_balance_minor: ledger.closing_balance.minor(),
        lines: ledger
            .lines
            .into_iter()
            .map(|line| LedgerLineView {
                transaction_id: line.transaction_id,
                voucher_number: line.voucher_number,
                date: line.date,
                description: line.description,
                debit_minor: line.debit.minor(),
                credit_minor: line.credit.minor(),
                balance_minor: line.balance.minor(),
            })
            .collect(),
    }))
}

pub async fn trial_balance(
    State(state): State<ServerState>,
) -> Result<Json<TrialBalanceView>, ServerError> {
    let trial = state.engine.trial_balance().await?;
    let balanced = trial.is_balanced();

    Ok(Json(TrialBalanceView {
        rows: trial
            .rows
            .into_iter()
            .map(|row| TrialBalanceRow {
                account_id: row.account_id,
                code: row.code,
                name: row.name,
                debit_minor: row.debit.minor(),
                credit_minor: row.credit.minor(),
            })
            .collect(),
        total_debit_minor: trial.total_debit.minor(),
        total_credit_minor: trial.total_credit.minor(),
        balanced,
    }))
}

pub async fn profit_and_loss(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ProfitAndLossView>, ServerError> {
    let report = state.engine.profit_and_loss(query.from, query.to).await?;

    Ok(Json(ProfitAndLossView {
        from: report.from,
        to: report.to,
        income: map_lines(report.income),
        expenses: map_lines(report.expenses),
        net_profit_minor: report.net_profit.minor(),
    }))
}

pub async fn balance_sheet(
    State(state): State<ServerState>,
) -> Result<Json<BalanceSheetView>, ServerError> {
    let sheet = state.engine.balance_sheet().await?;
    let balanced = sheet.is_balanced();

    Ok(Json(BalanceSheetView {
        assets: map_lines(sheet.assets),
        liabilities: map_lines(sheet.liabilities),
        equity: map_lines(sheet.equity),
        retained_earnings_minor: sheet.retained_earnings.minor(),
        balanced,
    }))
}
