use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::opt_string;

/// Purchase orders bring stock in, sales orders send it out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderKind {
    Purchase,
    Sales,
}

impl TryFrom<String> for OrderKind {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    #[sqlx(try_from = "String")]
    pub kind: OrderKind,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.order_number.to_lowercase().contains(&needle)
            || self
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: Option<String>,
    pub kind: OrderKind,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn normalized(mut self) -> Self {
        self.order_number = opt_string(self.order_number).map(|n| n.to_uppercase());
        self.notes = opt_string(self.notes);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderChanges {
    pub kind: Option<OrderKind>,
    pub status: Option<OrderStatus>,
    pub order_date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

impl OrderChanges {
    pub fn apply_to(self, order: &mut Order) {
        if let Some(kind) = self.kind {
            order.kind = kind;
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(order_date) = self.order_date {
            order.order_date = order_date;
        }
        if let Some(notes) = self.notes {
            order.notes = notes;
        }
        order.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}
