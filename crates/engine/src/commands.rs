//! Command structs for engine operations.
//!
//! These types group parameters for write operations (orders, payments,
//! stock, purchases, vouchers), keeping call sites readable and avoiding
//! long argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{EntryLine, Money, OrderType, PaymentMethod, Quantity, ReferenceType, VoucherType};

/// Open a new order.
#[derive(Clone, Debug)]
pub struct CreateOrderCmd {
    pub order_type: OrderType,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub waiter_id: Option<String>,
    pub notes: Option<String>,
    /// Cashier opening the order.
    pub actor: String,
}

impl CreateOrderCmd {
    #[must_use]
    pub fn new(order_type: OrderType, actor: impl Into<String>) -> Self {
        Self {
            order_type,
            table_id: None,
            customer_id: None,
            waiter_id: None,
            notes: None,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn dine_in(table_id: Uuid, actor: impl Into<String>) -> Self {
        Self::new(OrderType::DineIn, actor).table_id(table_id)
    }

    #[must_use]
    pub fn table_id(mut self, table_id: Uuid) -> Self {
        self.table_id = Some(table_id);
        self
    }

    #[must_use]
    pub fn customer_id(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    #[must_use]
    pub fn waiter_id(mut self, waiter_id: impl Into<String>) -> Self {
        self.waiter_id = Some(waiter_id.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Add a menu item to an order.
#[derive(Clone, Debug)]
pub struct AddItemCmd {
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: i64,
    /// Lines with notes are never merged.
    pub notes: Option<String>,
    pub actor: String,
}

impl AddItemCmd {
    #[must_use]
    pub fn new(
        order_id: Uuid,
        menu_item_id: Uuid,
        quantity: i64,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            menu_item_id,
            quantity,
            notes: None,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Take a payment against an order.
///
/// For [`crate::Engine::complete_payment`] the amount is always the
/// outstanding balance and `amount` is ignored.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub amount: Money,
    /// Cash handed over; defaults to the applied amount.
    pub tendered: Option<Money>,
    pub actor: String,
}

impl PaymentCmd {
    #[must_use]
    pub fn new(order_id: Uuid, method: PaymentMethod, actor: impl Into<String>) -> Self {
        Self {
            order_id,
            method,
            amount: Money::ZERO,
            tendered: None,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn tendered(mut self, tendered: Money) -> Self {
        self.tendered = Some(tendered);
        self
    }
}

/// A single stock-ledger call.
#[derive(Clone, Debug)]
pub struct StockCmd {
    pub ingredient_id: Uuid,
    /// Always positive; the operation decides the sign.
    pub quantity: Quantity,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub actor: String,
}

impl StockCmd {
    #[must_use]
    pub fn new(ingredient_id: Uuid, quantity: Quantity, actor: impl Into<String>) -> Self {
        Self {
            ingredient_id,
            quantity,
            reference_type: ReferenceType::Manual,
            reference_id: None,
            note: None,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn reference(mut self, reference_type: ReferenceType, reference_id: impl Into<String>) -> Self {
        self.reference_type = reference_type;
        self.reference_id = Some(reference_id.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Seed a new ingredient with its opening stock.
#[derive(Clone, Debug)]
pub struct NewIngredientCmd {
    pub name: String,
    pub unit: String,
    pub opening_stock: Quantity,
    pub reorder_level: Quantity,
    pub cost_per_unit: Money,
    pub actor: String,
}

impl NewIngredientCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, unit: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            opening_stock: Quantity::ZERO,
            reorder_level: Quantity::ZERO,
            cost_per_unit: Money::ZERO,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn opening_stock(mut self, quantity: Quantity) -> Self {
        self.opening_stock = quantity;
        self
    }

    #[must_use]
    pub fn reorder_level(mut self, quantity: Quantity) -> Self {
        self.reorder_level = quantity;
        self
    }

    #[must_use]
    pub fn cost_per_unit(mut self, cost: Money) -> Self {
        self.cost_per_unit = cost;
        self
    }
}

/// One requested purchase line.
#[derive(Clone, Debug)]
pub struct PurchaseLine {
    pub ingredient_id: Uuid,
    pub quantity: Quantity,
    pub unit_price: Money,
}

/// Create a draft purchase.
#[derive(Clone, Debug)]
pub struct CreatePurchaseCmd {
    pub supplier_id: Option<String>,
    pub supplier_name: String,
    pub invoice_number: Option<String>,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub actor: String,
}

impl CreatePurchaseCmd {
    #[must_use]
    pub fn new(
        supplier_name: impl Into<String>,
        purchase_date: NaiveDate,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            supplier_id: None,
            supplier_name: supplier_name.into(),
            invoice_number: None,
            purchase_date,
            notes: None,
            lines: Vec::new(),
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn supplier_id(mut self, supplier_id: impl Into<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self
    }

    #[must_use]
    pub fn invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn line(mut self, ingredient_id: Uuid, quantity: Quantity, unit_price: Money) -> Self {
        self.lines.push(PurchaseLine {
            ingredient_id,
            quantity,
            unit_price,
        });
        self
    }
}

/// Post a voucher to the general ledger.
#[derive(Clone, Debug)]
pub struct PostTransactionCmd {
    pub date: NaiveDate,
    pub voucher_type: VoucherType,
    pub description: String,
    pub entries: Vec<EntryLine>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub actor: String,
}

impl PostTransactionCmd {
    #[must_use]
    pub fn new(
        date: NaiveDate,
        voucher_type: VoucherType,
        description: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            date,
            voucher_type,
            description: description.into(),
            entries: Vec::new(),
            reference_type: None,
            reference_id: None,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn debit(mut self, account_id: Uuid, amount: Money) -> Self {
        self.entries.push(EntryLine::debit(account_id, amount));
        self
    }

    #[must_use]
    pub fn credit(mut self, account_id: Uuid, amount: Money) -> Self {
        self.entries.push(EntryLine::credit(account_id, amount));
        self
    }

    #[must_use]
    pub fn entry(mut self, entry: EntryLine) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }
}
