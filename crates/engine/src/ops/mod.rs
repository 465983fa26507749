use std::sync::Arc;

use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use serde::{Serialize, de::DeserializeOwned};

use crate::{EngineError, NoopPrinter, PrintDispatcher, PrintJob, ResultEngine, StockPolicy};

mod catalog;
mod customers;
mod fulfillment;
mod ledger;
mod order_views;
mod orders;
mod purchases;
mod recipes;
mod reports;
mod sequences;
mod sessions;
mod stock;

pub use ledger::{AccountLedger, LedgerLine};
pub use order_views::{OrderListFilter, OrderView};
pub use reports::{BalanceSheet, ProfitAndLoss, ReportLine, TrialBalance, TrialBalanceRow};
pub use sessions::SessionSummary;
pub use stock::StockDrift;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// A [`EngineError::WriteConflict`] raised by the block (a lost optimistic
/// version check) drops the transaction and re-runs the whole block in a
/// fresh one, up to `conflict_retries` times.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            let $tx = $self.database.begin().await?;
            let result: crate::ResultEngine<_> = async { $body }.await;
            match result {
                Ok(value) => {
                    $tx.commit().await?;
                    break Ok(value);
                }
                Err(crate::EngineError::WriteConflict(reason))
                    if attempt < $self.conflict_retries =>
                {
                    attempt += 1;
                    tracing::debug!(attempt, %reason, "write conflict, retrying");
                    drop($tx);
                }
                Err(err) => break Err(err),
            }
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    stock_policy: StockPolicy,
    conflict_retries: u32,
    timezone: Tz,
    printer: Arc<dyn PrintDispatcher>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Business day in the configured timezone.
    fn business_day(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Hands a job to the printer. Runs after commit; failures are only logged.
    fn dispatch(&self, job: PrintJob) {
        if let Err(err) = self.printer.dispatch(&job) {
            tracing::warn!(
                kind = job.kind(),
                order = job.order_number(),
                error = %err,
                "print dispatch failed"
            );
        }
    }
}

/// Actor ids are opaque; only presence is checked.
fn require_actor(actor: &str) -> ResultEngine<String> {
    let trimmed = actor.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("actor is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Maps a unique-constraint violation to `on_unique`, everything else to `Database`.
fn map_unique_violation(err: DbErr, on_unique: impl FnOnce() -> EngineError) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => on_unique(),
        _ => EngineError::Database(err),
    }
}

/// Encodes a pagination cursor as URL-safe base64 JSON.
fn encode_cursor<T: Serialize>(cursor: &T, label: &str) -> ResultEngine<String> {
    let bytes = serde_json::to_vec(cursor)
        .map_err(|_| EngineError::InvalidCursor(format!("invalid {label} cursor")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_cursor<T: DeserializeOwned>(input: &str, label: &str) -> ResultEngine<T> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(input.as_bytes())
        .map_err(|_| EngineError::InvalidCursor(format!("invalid {label} cursor")))?;
    serde_json::from_slice::<T>(&bytes)
        .map_err(|_| EngineError::InvalidCursor(format!("invalid {label} cursor")))
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    stock_policy: StockPolicy,
    conflict_retries: u32,
    timezone: Tz,
    printer: Arc<dyn PrintDispatcher>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            stock_policy: StockPolicy::default(),
            conflict_retries: 3,
            timezone: Tz::UTC,
            printer: Arc::new(NoopPrinter),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// What a deduction does when stock runs out (default: reject).
    pub fn stock_policy(mut self, policy: StockPolicy) -> EngineBuilder {
        self.stock_policy = policy;
        self
    }

    /// How many times an operation is re-run after losing an optimistic race.
    pub fn conflict_retries(mut self, retries: u32) -> EngineBuilder {
        self.conflict_retries = retries;
        self
    }

    /// Timezone of the business day used in order numbers and voucher dates.
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    pub fn printer(mut self, printer: Arc<dyn PrintDispatcher>) -> EngineBuilder {
        self.printer = printer;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            stock_policy: self.stock_policy,
            conflict_retries: self.conflict_retries,
            timezone: self.timezone,
            printer: self.printer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use sea_orm::{Database, TransactionTrait};

    use super::*;

    async fn engine(conflict_retries: u32) -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Engine::builder()
            .database(db)
            .conflict_retries(conflict_retries)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn write_conflict_reruns_the_block() {
        let engine = engine(3).await;
        let attempts = AtomicU32::new(0);

        let result: ResultEngine<u32> = async {
            with_tx!(engine, |db_tx| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt == 1 {
                    Err(EngineError::WriteConflict("ingredient changed".to_string()))
                } else {
                    Ok(attempt)
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn write_conflict_surfaces_once_retries_run_out() {
        let engine = engine(2).await;
        let attempts = AtomicU32::new(0);

        let result: ResultEngine<()> = async {
            with_tx!(engine, |db_tx| {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::WriteConflict("order changed".to_string()))
            })
        }
        .await;

        assert!(matches!(result, Err(EngineError::WriteConflict(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let engine = engine(3).await;
        let attempts = AtomicU32::new(0);

        let result: ResultEngine<()> = async {
            with_tx!(engine, |db_tx| {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Validation("bad input".to_string()))
            })
        }
        .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
