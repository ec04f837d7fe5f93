use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::opt_string;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Warehouse {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.code.to_lowercase().contains(&needle)
    }
}

/// Creation input. The code is optional here; the warehouse service
/// generates one when it is left blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewWarehouse {
    #[validate(length(max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    pub location: Option<String>,
}

impl NewWarehouse {
    pub fn normalized(mut self) -> Self {
        self.code = opt_string(self.code).map(|code| code.to_uppercase());
        self.name = self.name.trim().to_string();
        self.location = opt_string(self.location);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseChanges {
    pub name: Option<String>,
    pub location: Option<Option<String>>,
}

impl WarehouseChanges {
    pub fn apply_to(self, warehouse: &mut Warehouse) {
        if let Some(name) = self.name {
            warehouse.name = name.trim().to_string();
        }
        if let Some(location) = self.location {
            warehouse.location = location;
        }
        warehouse.updated_at = Utc::now();
    }
}
