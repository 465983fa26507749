//! Print dispatch seam.
//!
//! Jobs are handed over after the owning transaction commits. A failing
//! printer is logged and never rolls back or fails the order mutation.

use std::fmt::Debug;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{Money, OrderTotals};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrintLine {
    pub name: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrintJob {
    /// Kitchen order ticket for items not printed yet.
    Kot {
        order_id: Uuid,
        order_number: String,
        table: Option<String>,
        lines: Vec<PrintLine>,
    },
    /// Customer bill after fulfillment.
    Bill {
        order_id: Uuid,
        order_number: String,
        lines: Vec<PrintLine>,
        totals: OrderTotals,
        paid: Money,
        change: Money,
    },
}

impl PrintJob {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Kot { .. } => "kot",
            Self::Bill { .. } => "bill",
        }
    }

    #[must_use]
    pub fn order_number(&self) -> &str {
        match self {
            Self::Kot { order_number, .. } | Self::Bill { order_number, .. } => order_number,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("printer unavailable: {0}")]
pub struct PrintError(pub String);

pub trait PrintDispatcher: Debug + Send + Sync {
    fn dispatch(&self, job: &PrintJob) -> Result<(), PrintError>;
}

/// Drops every job.
#[derive(Debug, Default)]
pub struct NoopPrinter;

impl PrintDispatcher for NoopPrinter {
    fn dispatch(&self, _job: &PrintJob) -> Result<(), PrintError> {
        Ok(())
    }
}

/// Writes jobs to the log instead of a device.
#[derive(Debug, Default)]
pub struct LogPrinter;

impl PrintDispatcher for LogPrinter {
    fn dispatch(&self, job: &PrintJob) -> Result<(), PrintError> {
        let payload = serde_json::to_string(job).map_err(|err| PrintError(err.to_string()))?;
        tracing::info!(kind = job.kind(), order = job.order_number(), %payload, "print job");
        Ok(())
    }
}
