//! Cashier cash sessions.
//!
//! The payment path keeps the per-method accumulators up to date while the
//! session is open; closing only reconciles the counted drawer against them.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, PaymentMethod,
    util::{parse_uuid, string_enum},
};

string_enum! {
    pub enum SessionStatus("session status") {
        Open => "open",
        Closed => "closed",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierSession {
    pub id: Uuid,
    pub cashier_id: String,
    pub opening_cash: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub online_sales: Money,
    pub credit_sales: Money,
    pub total_sales: Money,
    pub order_count: i64,
    pub status: SessionStatus,
    pub counted_cash: Option<Money>,
    pub expected_cash: Option<Money>,
    pub cash_variance: Option<Money>,
    pub notes: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashierSession {
    pub fn open(cashier_id: String, opening_cash: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            cashier_id,
            opening_cash,
            cash_sales: Money::ZERO,
            card_sales: Money::ZERO,
            online_sales: Money::ZERO,
            credit_sales: Money::ZERO,
            total_sales: Money::ZERO,
            order_count: 0,
            status: SessionStatus::Open,
            counted_cash: None,
            expected_cash: None,
            cash_variance: None,
            notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Cash that should be in the drawer right now.
    #[must_use]
    pub fn expected_cash(&self) -> Money {
        self.opening_cash + self.cash_sales
    }

    /// Adds a payment to the matching method accumulator.
    pub fn record_sale(&mut self, method: PaymentMethod, amount: Money) {
        match method {
            PaymentMethod::Cash => self.cash_sales += amount,
            PaymentMethod::Card => self.card_sales += amount,
            PaymentMethod::Online => self.online_sales += amount,
            PaymentMethod::Credit => self.credit_sales += amount,
        }
        self.total_sales += amount;
    }

    /// Reconciles the counted drawer. A variance of any sign or size never
    /// blocks closing.
    pub fn close(&mut self, counted_cash: Money, notes: Option<String>) {
        let expected = self.expected_cash();
        self.counted_cash = Some(counted_cash);
        self.expected_cash = Some(expected);
        self.cash_variance = Some(counted_cash - expected);
        self.notes = notes;
        self.status = SessionStatus::Closed;
        self.closed_at = Some(Utc::now());
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cashier_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub cashier_id: String,
    pub opening_cash_minor: i64,
    pub cash_sales_minor: i64,
    pub card_sales_minor: i64,
    pub online_sales_minor: i64,
    pub credit_sales_minor: i64,
    pub total_sales_minor: i64,
    pub order_count: i64,
    pub status: String,
    pub counted_cash_minor: Option<i64>,
    pub expected_cash_minor: Option<i64>,
    pub cash_variance_minor: Option<i64>,
    pub notes: Option<String>,
    pub opened_at: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CashierSession> for ActiveModel {
    fn from(value: &CashierSession) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            cashier_id: ActiveValue::Set(value.cashier_id.clone()),
            opening_cash_minor: ActiveValue::Set(value.opening_cash.minor()),
            cash_sales_minor: ActiveValue::Set(value.cash_sales.minor()),
            card_sales_minor: ActiveValue::Set(value.card_sales.minor()),
            online_sales_minor: ActiveValue::Set(value.online_sales.minor()),
            credit_sales_minor: ActiveValue::Set(value.credit_sales.minor()),
            total_sales_minor: ActiveValue::Set(value.total_sales.minor()),
            order_count: ActiveValue::Set(value.order_count),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            counted_cash_minor: ActiveValue::Set(value.counted_cash.map(Money::minor)),
            expected_cash_minor: ActiveValue::Set(value.expected_cash.map(Money::minor)),
            cash_variance_minor: ActiveValue::Set(value.cash_variance.map(Money::minor)),
            notes: ActiveValue::Set(value.notes.clone()),
            opened_at: ActiveValue::Set(value.opened_at),
            closed_at: ActiveValue::Set(value.closed_at),
        }
    }
}

impl TryFrom<Model> for CashierSession {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "session")?,
            cashier_id: model.cashier_id,
            opening_cash: Money::new(model.opening_cash_minor),
            cash_sales: Money::new(model.cash_sales_minor),
            card_sales: Money::new(model.card_sales_minor),
            online_sales: Money::new(model.online_sales_minor),
            credit_sales: Money::new(model.credit_sales_minor),
            total_sales: Money::new(model.total_sales_minor),
            order_count: model.order_count,
            status: SessionStatus::try_from(model.status.as_str())?,
            counted_cash: model.counted_cash_minor.map(Money::new),
            expected_cash: model.expected_cash_minor.map(Money::new),
            cash_variance: model.cash_variance_minor.map(Money::new),
            notes: model.notes,
            opened_at: model.opened_at,
            closed_at: model.closed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_records_negative_variance() {
        let mut session = CashierSession::open("cashier-1".to_string(), Money::major(1000));
        session.record_sale(PaymentMethod::Cash, Money::major(3000));
        session.record_sale(PaymentMethod::Card, Money::major(250));

        session.close(Money::major(3900), Some("short".to_string()));

        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.expected_cash, Some(Money::major(4000)));
        assert_eq!(session.cash_variance, Some(Money::major(-100)));
        assert_eq!(session.total_sales, Money::major(3250));
    }

    #[test]
    fn non_cash_sales_do_not_change_expected_cash() {
        let mut session = CashierSession::open("cashier-1".to_string(), Money::major(50));
        session.record_sale(PaymentMethod::Online, Money::major(20));
        session.record_sale(PaymentMethod::Credit, Money::major(5));
        assert_eq!(session.expected_cash(), Money::major(50));
        assert_eq!(session.credit_sales, Money::major(5));
    }
}
