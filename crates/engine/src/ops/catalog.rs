use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Expr, Func},
};

use crate::{
    Account, AccountType, Customer, DiningTable, Discount, DiscountKind, EngineError,
    FinancialYear, Ingredient, MenuItem, Money, MovementType, NewIngredientCmd, PointerKey,
    RecipeLine, ReferenceType, ResultEngine, TaxSetting, accounts, customers,
    dining_tables, discounts, financial_years, ingredients, menu_items, recipes, tax_settings,
};

use super::{
    Engine, map_unique_violation, normalize_optional_text, normalize_required_name,
    require_actor, stock::MovementRequest, with_tx,
};

impl Engine {
    /// Adds an ingredient. A positive opening stock is written through the
    /// stock ledger as an `opening` movement, so the history replays to it.
    pub async fn create_ingredient(&self, cmd: NewIngredientCmd) -> ResultEngine<Ingredient> {
        let actor = require_actor(&cmd.actor)?;
        let name = normalize_required_name(&cmd.name, "ingredient")?;
        let unit = normalize_required_name(&cmd.unit, "unit")?;
        if cmd.opening_stock.is_negative() || cmd.reorder_level.is_negative() {
            return Err(EngineError::Validation(
                "stock quantities must be >= 0".to_string(),
            ));
        }
        if cmd.cost_per_unit.is_negative() {
            return Err(EngineError::Validation(
                "cost per unit must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let exists = ingredients::Entity::find()
                .filter(
                    Expr::expr(Func::lower(Expr::col(ingredients::Column::Name)))
                        .eq(name.to_lowercase()),
                )
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name.clone()));
            }

            let ingredient = Ingredient::new(
                name.clone(),
                unit.clone(),
                cmd.reorder_level,
                cmd.cost_per_unit,
            );
            ingredients::ActiveModel::from(&ingredient)
                .insert(&db_tx)
                .await?;

            if !cmd.opening_stock.is_positive() {
                return Ok(ingredient);
            }
            let (ingredient, _) = self
                .apply_movement(
                    &db_tx,
                    MovementRequest {
                        ingredient_id: ingredient.id,
                        movement_type: MovementType::Opening,
                        delta: cmd.opening_stock,
                        reference_type: ReferenceType::Manual,
                        reference_id: None,
                        note: Some("opening stock"),
                        actor: &actor,
                    },
                )
                .await?;
            Ok(ingredient)
        })
    }

    pub async fn ingredient(&self, ingredient_id: Uuid) -> ResultEngine<Ingredient> {
        with_tx!(self, |db_tx| {
            let model = ingredients::Entity::find_by_id(ingredient_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("ingredient not exists".to_string()))?;
            Ingredient::try_from(model)
        })
    }

    pub async fn ingredients(&self) -> ResultEngine<Vec<Ingredient>> {
        with_tx!(self, |db_tx| {
            ingredients::Entity::find()
                .order_by_asc(ingredients::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Ingredient::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    pub async fn create_menu_item(&self, name: &str, price: Money) -> ResultEngine<MenuItem> {
        let name = normalize_required_name(name, "menu item")?;
        if price.is_negative() {
            return Err(EngineError::Validation("price must be >= 0".to_string()));
        }
        with_tx!(self, |db_tx| {
            let item = MenuItem::new(name.clone(), price);
            menu_items::ActiveModel::from(&item).insert(&db_tx).await?;
            Ok(item)
        })
    }

    pub async fn menu_item(&self, menu_item_id: Uuid) -> ResultEngine<MenuItem> {
        with_tx!(self, |db_tx| {
            let model = self.require_menu_item(&db_tx, menu_item_id).await?;
            MenuItem::try_from(model)
        })
    }

    /// Unavailable items can no longer be added to orders.
    pub async fn set_menu_item_available(
        &self,
        menu_item_id: Uuid,
        available: bool,
    ) -> ResultEngine<MenuItem> {
        with_tx!(self, |db_tx| {
            let model = self.require_menu_item(&db_tx, menu_item_id).await?;
            let mut active: menu_items::ActiveModel = model.into();
            active.available = ActiveValue::Set(available);
            let model = active.update(&db_tx).await?;
            MenuItem::try_from(model)
        })
    }

    /// Replaces the recipe of a menu item. An empty list removes it.
    pub async fn set_recipe(
        &self,
        menu_item_id: Uuid,
        lines: Vec<RecipeLine>,
    ) -> ResultEngine<Vec<RecipeLine>> {
        let mut seen = HashSet::new();
        for line in &lines {
            if !line.quantity.is_positive() {
                return Err(EngineError::Validation(
                    "recipe quantity must be > 0".to_string(),
                ));
            }
            if !seen.insert(line.ingredient_id) {
                return Err(EngineError::Validation(format!(
                    "ingredient {} listed twice",
                    line.ingredient_id
                )));
            }
        }

        with_tx!(self, |db_tx| {
            self.require_menu_item(&db_tx, menu_item_id).await?;
            for line in &lines {
                let exists = ingredients::Entity::find_by_id(line.ingredient_id.to_string())
                    .one(&db_tx)
                    .await?
                    .is_some();
                if !exists {
                    return Err(EngineError::KeyNotFound(
                        "ingredient not exists".to_string(),
                    ));
                }
            }

            recipes::Entity::delete_many()
                .filter(recipes::Column::MenuItemId.eq(menu_item_id.to_string()))
                .exec(&db_tx)
                .await?;
            for line in &lines {
                recipes::ActiveModel::for_menu_item(menu_item_id, line)
                    .insert(&db_tx)
                    .await?;
            }
            Ok(lines.clone())
        })
    }

    pub async fn create_discount(
        &self,
        name: &str,
        kind: DiscountKind,
        value: i64,
        max_discount_amount: Option<Money>,
    ) -> ResultEngine<Discount> {
        let name = normalize_required_name(name, "discount")?;
        let discount = Discount::new(name, kind, value, max_discount_amount)?;
        with_tx!(self, |db_tx| {
            discounts::ActiveModel::from(&discount)
                .insert(&db_tx)
                .await?;
            Ok(discount.clone())
        })
    }

    /// Inactive discounts can't be applied to new orders; orders already
    /// carrying one keep it.
    pub async fn set_discount_active(
        &self,
        discount_id: Uuid,
        active: bool,
    ) -> ResultEngine<Discount> {
        with_tx!(self, |db_tx| {
            let model = discounts::Entity::find_by_id(discount_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("discount not exists".to_string()))?;
            let mut active_model: discounts::ActiveModel = model.into();
            active_model.active = ActiveValue::Set(active);
            let model = active_model.update(&db_tx).await?;
            Discount::try_from(model)
        })
    }

    pub async fn create_tax_setting(
        &self,
        name: &str,
        rate: i64,
        service_charge_rate: i64,
    ) -> ResultEngine<TaxSetting> {
        let name = normalize_required_name(name, "tax setting")?;
        let setting = TaxSetting::new(name, rate, service_charge_rate)?;
        with_tx!(self, |db_tx| {
            tax_settings::ActiveModel::from(&setting)
                .insert(&db_tx)
                .await?;
            Ok(setting.clone())
        })
    }

    /// Makes `tax_setting_id` the one active tax setting. Orders pick it up
    /// the next time their totals are recalculated.
    pub async fn activate_tax_setting(&self, tax_setting_id: Uuid) -> ResultEngine<TaxSetting> {
        with_tx!(self, |db_tx| {
            let model = tax_settings::Entity::find_by_id(tax_setting_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("tax setting not exists".to_string()))?;
            self.set_pointer(&db_tx, PointerKey::TaxSetting, tax_setting_id)
                .await?;
            TaxSetting::try_from(model)
        })
    }

    /// With no active tax setting, totals carry zero tax and service charge.
    pub async fn deactivate_tax_setting(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.clear_pointer(&db_tx, PointerKey::TaxSetting).await
        })
    }

    pub async fn active_tax_setting(&self) -> ResultEngine<Option<TaxSetting>> {
        with_tx!(self, |db_tx| { self.load_active_tax(&db_tx).await })
    }

    pub async fn create_table(&self, name: &str) -> ResultEngine<DiningTable> {
        let name = normalize_required_name(name, "table")?;
        with_tx!(self, |db_tx| {
            let table = DiningTable::new(name.clone());
            dining_tables::ActiveModel::from(&table)
                .insert(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, || EngineError::ExistingKey(name.clone())))?;
            Ok(table)
        })
    }

    pub async fn table(&self, table_id: Uuid) -> ResultEngine<DiningTable> {
        with_tx!(self, |db_tx| {
            let model = dining_tables::Entity::find_by_id(table_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("table not exists".to_string()))?;
            DiningTable::try_from(model)
        })
    }

    pub async fn create_customer(
        &self,
        name: &str,
        phone: Option<&str>,
        credit_limit: Money,
    ) -> ResultEngine<Customer> {
        let name = normalize_required_name(name, "customer")?;
        if credit_limit.is_negative() {
            return Err(EngineError::Validation(
                "credit limit must be >= 0".to_string(),
            ));
        }
        let phone = normalize_optional_text(phone);
        with_tx!(self, |db_tx| {
            let customer = Customer::new(name.clone(), phone.clone(), credit_limit);
            customers::ActiveModel::from(&customer)
                .insert(&db_tx)
                .await?;
            Ok(customer)
        })
    }

    pub async fn customer(&self, customer_id: Uuid) -> ResultEngine<Customer> {
        with_tx!(self, |db_tx| {
            let model = customers::Entity::find_by_id(customer_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("customer not exists".to_string()))?;
            Customer::try_from(model)
        })
    }

    /// Adds an account to the chart. Codes are unique.
    pub async fn create_account(
        &self,
        code: &str,
        name: &str,
        account_type: AccountType,
    ) -> ResultEngine<Account> {
        let code = normalize_required_name(code, "account code")?;
        let name = normalize_required_name(name, "account")?;
        with_tx!(self, |db_tx| {
            let account = Account::new(code.clone(), name.clone(), account_type);
            accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, || EngineError::ExistingKey(code.clone())))?;
            Ok(account)
        })
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            Account::try_from(model)
        })
    }

    /// The chart of accounts ordered by code.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            accounts::Entity::find()
                .order_by_asc(accounts::Column::Code)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Account::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    pub async fn create_financial_year(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ResultEngine<FinancialYear> {
        let name = normalize_required_name(name, "financial year")?;
        let year = FinancialYear::new(name, start_date, end_date)?;
        with_tx!(self, |db_tx| {
            financial_years::ActiveModel::from(&year)
                .insert(&db_tx)
                .await?;
            Ok(year.clone())
        })
    }

    /// Selects the year every posting is booked into.
    pub async fn set_current_financial_year(
        &self,
        financial_year_id: Uuid,
    ) -> ResultEngine<FinancialYear> {
        with_tx!(self, |db_tx| {
            let model = financial_years::Entity::find_by_id(financial_year_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("financial year not exists".to_string())
                })?;
            self.set_pointer(&db_tx, PointerKey::FinancialYear, financial_year_id)
                .await?;
            FinancialYear::try_from(model)
        })
    }

    pub async fn current_financial_year(&self) -> ResultEngine<Option<FinancialYear>> {
        with_tx!(self, |db_tx| { self.load_current_year(&db_tx).await })
    }

    /// Binds a posting role (cash, sales, inventory...) to an account.
    pub async fn set_posting_account(
        &self,
        role: PointerKey,
        account_id: Uuid,
    ) -> ResultEngine<Account> {
        if !role.is_posting_role() {
            return Err(EngineError::Validation(format!(
                "{role} is not a posting role"
            )));
        }
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            self.set_pointer(&db_tx, role, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Every configured posting role with its account.
    pub async fn posting_accounts(&self) -> ResultEngine<Vec<(PointerKey, Account)>> {
        with_tx!(self, |db_tx| {
            let mut bound = Vec::new();
            for role in PointerKey::POSTING_ROLES {
                if let Some(account) = self.posting_account(&db_tx, role).await? {
                    bound.push((role, account));
                }
            }
            Ok(bound)
        })
    }

    pub(super) async fn require_menu_item(
        &self,
        db_tx: &DatabaseTransaction,
        menu_item_id: Uuid,
    ) -> ResultEngine<menu_items::Model> {
        menu_items::Entity::find_by_id(menu_item_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("menu item not exists".to_string()))
    }

    pub(super) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    pub(super) async fn load_active_tax(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<Option<TaxSetting>> {
        let Some(tax_id) = self.pointer(db_tx, PointerKey::TaxSetting).await? else {
            return Ok(None);
        };
        tax_settings::Entity::find_by_id(tax_id.to_string())
            .one(db_tx)
            .await?
            .map(TaxSetting::try_from)
            .transpose()
    }

    pub(super) async fn load_current_year(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<Option<FinancialYear>> {
        let Some(year_id) = self.pointer(db_tx, PointerKey::FinancialYear).await? else {
            return Ok(None);
        };
        financial_years::Entity::find_by_id(year_id.to_string())
            .one(db_tx)
            .await?
            .map(FinancialYear::try_from)
            .transpose()
    }

    /// The account bound to a posting role, if any.
    pub(super) async fn posting_account(
        &self,
        db_tx: &DatabaseTransaction,
        role: PointerKey,
    ) -> ResultEngine<Option<Account>> {
        let Some(account_id) = self.pointer(db_tx, role).await? else {
            return Ok(None);
        };
        accounts::Entity::find_by_id(account_id.to_string())
            .one(db_tx)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}
