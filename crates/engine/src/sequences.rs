//! Monotonic counters, one row per scope.
//!
//! Scopes used by the engine:
//! - `order:{yyyymmdd}` daily order numbers
//! - `voucher:{financial_year_id}:{voucher_type}` voucher numbers
//! - `stock_movement` / `ledger` global insertion order

use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::VoucherType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub scope: String,
    /// Last value handed out.
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) const STOCK_MOVEMENT_SCOPE: &str = "stock_movement";
pub(crate) const LEDGER_SCOPE: &str = "ledger";

pub(crate) fn order_scope(business_day: chrono::NaiveDate) -> String {
    format!("order:{}", business_day.format("%Y%m%d"))
}

pub(crate) fn voucher_scope(financial_year_id: Uuid, voucher_type: VoucherType) -> String {
    format!("voucher:{financial_year_id}:{voucher_type}")
}

/// `ORD-20240131-000042`.
pub(crate) fn order_number(business_day: chrono::NaiveDate, sequence: i64) -> String {
    format!("ORD-{}-{sequence:06}", business_day.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn order_numbers_are_daily_and_padded() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(order_number(day, 42), "ORD-20240131-000042");
        assert_eq!(order_scope(day), "order:20240131");
    }

    #[test]
    fn voucher_scope_separates_types() {
        let year = Uuid::new_v4();
        assert_ne!(
            voucher_scope(year, VoucherType::Sales),
            voucher_scope(year, VoucherType::Journal)
        );
    }
}
