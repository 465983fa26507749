//! Order total calculation.
//!
//! [`calculate`] is a pure function of an order's line totals, its discount
//! and the active tax setting. The engine runs it after every item or
//! discount mutation and it is the only source of the stored totals, so
//! `grand_total == subtotal - discount_amount + tax_amount + service_charge`
//! holds for every persisted order.

use serde::{Deserialize, Serialize};

use crate::{Discount, DiscountKind, Money, ResultEngine, TaxSetting, util::too_large};

/// The discount attached to an order.
#[derive(Clone, Copy, Debug, Default)]
pub enum DiscountInput<'a> {
    #[default]
    None,
    /// A discount rule, applied by its own kind/value/cap.
    Rule(&'a Discount),
    /// A manual override amount; it wins over any rule.
    Manual(Money),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub service_charge: Money,
    pub grand_total: Money,
}

impl OrderTotals {
    /// Checks the grand total identity.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.grand_total
            == self.subtotal - self.discount_amount + self.tax_amount + self.service_charge
    }
}

/// Computes the discount amount for a subtotal, before clamping.
fn discount_amount(subtotal: Money, discount: DiscountInput<'_>) -> Money {
    match discount {
        DiscountInput::None => Money::ZERO,
        DiscountInput::Manual(amount) => amount,
        DiscountInput::Rule(rule) => match rule.kind {
            DiscountKind::Percentage => {
                let amount = subtotal.apply_rate(rule.value);
                match rule.max_discount_amount {
                    Some(cap) => amount.min(cap),
                    None => amount,
                }
            }
            DiscountKind::Flat => Money::new(rule.value),
        },
    }
}

/// Fails only when the totals leave the representable money range.
pub fn calculate(
    item_totals: impl IntoIterator<Item = Money>,
    discount: DiscountInput<'_>,
    tax: Option<&TaxSetting>,
) -> ResultEngine<OrderTotals> {
    let subtotal = Money::checked_sum(item_totals).ok_or_else(|| too_large("order subtotal"))?;
    let discount_amount = discount_amount(subtotal, discount)
        .max(Money::ZERO)
        .min(subtotal.max(Money::ZERO));
    let taxable = subtotal - discount_amount;

    let (tax_amount, service_charge) = match tax {
        Some(setting) => (
            taxable.apply_rate(setting.rate),
            taxable.apply_rate(setting.service_charge_rate),
        ),
        None => (Money::ZERO, Money::ZERO),
    };

    let grand_total = taxable
        .checked_add(tax_amount)
        .and_then(|total| total.checked_add(service_charge))
        .ok_or_else(|| too_large("order total"))?;

    Ok(OrderTotals {
        subtotal,
        discount_amount,
        tax_amount,
        service_charge,
        grand_total,
    })
}
