use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{non_negative, opt_string};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub price: Decimal,
    pub cost: Decimal,
    pub weight: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub min_stock: Decimal,
    pub max_stock: Decimal,
    pub reorder_point: Decimal,
    pub lead_time_days: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Case-insensitive substring match against name and SKU.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.sku.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[validate(custom = "non_negative")]
    pub cost: Decimal,
    #[validate(custom = "non_negative")]
    pub weight: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub length: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub width: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub height: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub min_stock: Decimal,
    #[validate(custom = "non_negative")]
    pub max_stock: Decimal,
    #[validate(custom = "non_negative")]
    pub reorder_point: Decimal,
    #[validate(range(min = 0))]
    pub lead_time_days: Option<i32>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            is_active: true,
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Self {
        self.sku = self.sku.trim().to_string();
        self.name = self.name.trim().to_string();
        self.description = opt_string(self.description);
        self.barcode = opt_string(self.barcode);
        self
    }
}

/// Partial update. `None` leaves a field untouched; for nullable columns
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductChanges {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub category_id: Option<Option<i64>>,
    pub unit_id: Option<Option<i64>>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub weight: Option<Option<Decimal>>,
    pub length: Option<Option<Decimal>>,
    pub width: Option<Option<Decimal>>,
    pub height: Option<Option<Decimal>>,
    pub min_stock: Option<Decimal>,
    pub max_stock: Option<Decimal>,
    pub reorder_point: Option<Decimal>,
    pub lead_time_days: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    /// Every field set from a complete form submission.
    pub fn replace_with(product: NewProduct) -> Self {
        Self {
            sku: Some(product.sku),
            name: Some(product.name),
            description: Some(product.description),
            barcode: Some(product.barcode),
            category_id: Some(product.category_id),
            unit_id: Some(product.unit_id),
            price: Some(product.price),
            cost: Some(product.cost),
            weight: Some(product.weight),
            length: Some(product.length),
            width: Some(product.width),
            height: Some(product.height),
            min_stock: Some(product.min_stock),
            max_stock: Some(product.max_stock),
            reorder_point: Some(product.reorder_point),
            lead_time_days: Some(product.lead_time_days),
            is_active: Some(product.is_active),
        }
    }

    pub fn check(&self) -> Result<(), String> {
        if matches!(&self.sku, Some(sku) if sku.trim().is_empty()) {
            return Err("SKU is required".to_string());
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err("name is required".to_string());
        }
        let amounts = [
            self.price,
            self.cost,
            self.min_stock,
            self.max_stock,
            self.reorder_point,
            self.weight.flatten(),
            self.length.flatten(),
            self.width.flatten(),
            self.height.flatten(),
        ];
        if amounts.iter().flatten().any(|value| *value < Decimal::ZERO) {
            return Err("amounts must not be negative".to_string());
        }
        Ok(())
    }

    pub fn apply_to(self, product: &mut Product) {
        if let Some(sku) = self.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(barcode) = self.barcode {
            product.barcode = barcode;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(unit_id) = self.unit_id {
            product.unit_id = unit_id;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(cost) = self.cost {
            product.cost = cost;
        }
        if let Some(weight) = self.weight {
            product.weight = weight;
        }
        if let Some(length) = self.length {
            product.length = length;
        }
        if let Some(width) = self.width {
            product.width = width;
        }
        if let Some(height) = self.height {
            product.height = height;
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = min_stock;
        }
        if let Some(max_stock) = self.max_stock {
            product.max_stock = max_stock;
        }
        if let Some(reorder_point) = self.reorder_point {
            product.reorder_point = reorder_point;
        }
        if let Some(lead_time_days) = self.lead_time_days {
            product.lead_time_days = lead_time_days;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        product.updated_at = Utc::now();
    }
}
