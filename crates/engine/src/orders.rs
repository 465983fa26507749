//! Orders and their state machine.
//!
//! ```text
//! pending -> confirmed -> preparing -> ready -> served
//!    \__________\____________\__________\_________\--> completed
//!     \__________\____________\__________\_________\--> cancelled
//! ```
//!
//! Kitchen states advance one step at a time. `completed` is reachable from
//! any non-terminal state through the fulfillment path, `cancelled` through
//! cancellation. Both are terminal: nothing leaves them, so a fulfilled order
//! can never be cancelled and stock deductions never need reversing.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, OrderTotals,
    util::{parse_optional_uuid, parse_uuid, string_enum},
};

string_enum! {
    pub enum OrderType("order type") {
        DineIn => "dine_in",
        Takeaway => "takeaway",
        Delivery => "delivery",
    }
}

string_enum! {
    pub enum OrderStatus("order status") {
        Pending => "pending",
        Confirmed => "confirmed",
        Preparing => "preparing",
        Ready => "ready",
        Served => "served",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The transition table.
    #[must_use]
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Confirmed)
            | (Confirmed, Preparing)
            | (Preparing, Ready)
            | (Ready, Served) => true,
            (from, Completed | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

string_enum! {
    pub enum PaymentStatus("payment status") {
        Unpaid => "unpaid",
        Partial => "partial",
        Paid => "paid",
        /// Settled on the customer's account (receivable).
        Credit => "credit",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub order_type: OrderType,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub waiter_id: Option<String>,
    pub cashier_id: String,
    pub session_id: Option<Uuid>,
    pub discount_id: Option<Uuid>,
    /// Manual discount override; when set it wins over `discount_id`.
    pub manual_discount: Option<Money>,
    pub totals: OrderTotals,
    pub paid_amount: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Amount still due before the order is fully paid.
    #[must_use]
    pub fn outstanding(&self) -> Money {
        (self.totals.grand_total - self.paid_amount).max(Money::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub order_number: String,
    pub order_type: String,
    pub table_id: Option<String>,
    pub customer_id: Option<String>,
    pub waiter_id: Option<String>,
    pub cashier_id: String,
    pub session_id: Option<String>,
    pub discount_id: Option<String>,
    pub manual_discount_minor: Option<i64>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub service_charge_minor: i64,
    pub grand_total_minor: i64,
    pub paid_minor: i64,
    pub status: String,
    pub payment_status: String,
    pub notes: Option<String>,
    /// Optimistic concurrency token, bumped by every order write.
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for ActiveModel {
    fn from(value: &Order) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            order_number: ActiveValue::Set(value.order_number.clone()),
            order_type: ActiveValue::Set(value.order_type.as_str().to_string()),
            table_id: ActiveValue::Set(value.table_id.map(|id| id.to_string())),
            customer_id: ActiveValue::Set(value.customer_id.map(|id| id.to_string())),
            waiter_id: ActiveValue::Set(value.waiter_id.clone()),
            cashier_id: ActiveValue::Set(value.cashier_id.clone()),
            session_id: ActiveValue::Set(value.session_id.map(|id| id.to_string())),
            discount_id: ActiveValue::Set(value.discount_id.map(|id| id.to_string())),
            manual_discount_minor: ActiveValue::Set(value.manual_discount.map(Money::minor)),
            subtotal_minor: ActiveValue::Set(value.totals.subtotal.minor()),
            discount_minor: ActiveValue::Set(value.totals.discount_amount.minor()),
            tax_minor: ActiveValue::Set(value.totals.tax_amount.minor()),
            service_charge_minor: ActiveValue::Set(value.totals.service_charge.minor()),
            grand_total_minor: ActiveValue::Set(value.totals.grand_total.minor()),
            paid_minor: ActiveValue::Set(value.paid_amount.minor()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            payment_status: ActiveValue::Set(value.payment_status.as_str().to_string()),
            notes: ActiveValue::Set(value.notes.clone()),
            version: ActiveValue::Set(0),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
            completed_at: ActiveValue::Set(value.completed_at),
            cancelled_at: ActiveValue::Set(value.cancelled_at),
        }
    }
}

impl TryFrom<Model> for Order {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "order")?,
            order_number: model.order_number,
            order_type: OrderType::try_from(model.order_type.as_str())?,
            table_id: parse_optional_uuid(model.table_id.as_deref(), "table")?,
            customer_id: parse_optional_uuid(model.customer_id.as_deref(), "customer")?,
            waiter_id: model.waiter_id,
            cashier_id: model.cashier_id,
            session_id: parse_optional_uuid(model.session_id.as_deref(), "session")?,
            discount_id: parse_optional_uuid(model.discount_id.as_deref(), "discount")?,
            manual_discount: model.manual_discount_minor.map(Money::new),
            totals: OrderTotals {
                subtotal: Money::new(model.subtotal_minor),
                discount_amount: Money::new(model.discount_minor),
                tax_amount: Money::new(model.tax_minor),
                service_charge: Money::new(model.service_charge_minor),
                grand_total: Money::new(model.grand_total_minor),
            },
            paid_amount: Money::new(model.paid_minor),
            status: OrderStatus::try_from(model.status.as_str())?,
            payment_status: PaymentStatus::try_from(model.payment_status.as_str())?,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
            cancelled_at: model.cancelled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn kitchen_states_advance_one_step() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Served));

        assert!(!Pending.can_transition_to(Ready));
        assert!(!Served.can_transition_to(Preparing));
        assert!(!Ready.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_are_final() {
        for next in [Pending, Confirmed, Preparing, Ready, Served, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn any_open_state_can_complete_or_cancel() {
        for from in [Pending, Confirmed, Preparing, Ready, Served] {
            assert!(from.can_transition_to(Completed));
            assert!(from.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        assert_eq!(OrderStatus::try_from("preparing").unwrap(), Preparing);
        assert!(OrderStatus::try_from("shipped").is_err());
        assert_eq!(OrderType::DineIn.as_str(), "dine_in");
    }
}
