use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::opt_string;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = opt_string(self.description);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl CategoryChanges {
    pub fn apply_to(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        category.updated_at = Utc::now();
    }
}

impl From<NewCategory> for CategoryChanges {
    fn from(category: NewCategory) -> Self {
        Self {
            name: Some(category.name),
            description: Some(category.description),
        }
    }
}

/// Unit of measure. The abbreviation is the business key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Unit {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.abbreviation.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewUnit {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 16, message = "abbreviation is required"))]
    pub abbreviation: String,
}

impl NewUnit {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.abbreviation = self.abbreviation.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitChanges {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

impl UnitChanges {
    pub fn apply_to(self, unit: &mut Unit) {
        if let Some(name) = self.name {
            unit.name = name.trim().to_string();
        }
        if let Some(abbreviation) = self.abbreviation {
            unit.abbreviation = abbreviation.trim().to_string();
        }
        unit.updated_at = Utc::now();
    }
}

impl From<NewUnit> for UnitChanges {
    fn from(unit: NewUnit) -> Self {
        Self {
            name: Some(unit.name),
            abbreviation: Some(unit.abbreviation),
        }
    }
}
