use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::patch::{nullable, required};

/// Listing row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub date: OffsetDateTime,
    pub seller_id: i64,
    pub item_type: String,
    pub category: String,
    pub color: Option<String>,
    pub price: f64,
    pub condition: String,
    pub name: String,
    pub description: Option<String>,
    pub orders: i64,
    pub image_url: Option<String>,
    pub custom: bool,
}

/// Fields supplied when a listing is created. The seller comes from the
/// session, never from the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(rename = "type", alias = "item_type")]
    pub item_type: String,
    pub category: String,
    #[serde(default)]
    pub color: Option<String>,
    pub condition: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "image", alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(default, rename = "isCustom", alias = "custom")]
    pub custom: bool,
}

/// Allow-listed listing update. Keys missing from the body stay `None` and
/// leave the stored value untouched; unknown keys are dropped by serde.
/// `null` clears the nullable columns and is rejected for the others.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, deserialize_with = "required")]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "item_type", deserialize_with = "required")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "required")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "required")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "required")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, rename = "image", alias = "image_url", deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, rename = "isCustom", alias = "custom", deserialize_with = "required")]
    pub custom: Option<bool>,
}

/// Read-many filters; both optional.
#[derive(Debug, Default, Clone)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub seller_id: Option<i64>,
}

pub(crate) fn check_price(price: f64) -> Result<(), String> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err("price must be greater than 0".into())
    }
}

fn check_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

impl NewItem {
    pub fn validate(&self) -> Result<(), String> {
        check_price(self.price)?;
        check_required("name", &self.name)?;
        check_required("type", &self.item_type)?;
        check_required("category", &self.category)?;
        check_required("condition", &self.condition)
    }
}

impl ItemPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(price) = self.price {
            check_price(price)?;
        }
        for (field, value) in [
            ("name", &self.name),
            ("type", &self.item_type),
            ("category", &self.category),
            ("condition", &self.condition),
        ] {
            if let Some(v) = value {
                check_required(field, v)?;
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, item: &mut Item) {
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = &self.item_type {
            item.item_type = v.clone();
        }
        if let Some(v) = &self.category {
            item.category = v.clone();
        }
        if let Some(v) = &self.color {
            item.color = v.clone();
        }
        if let Some(v) = &self.condition {
            item.condition = v.clone();
        }
        if let Some(v) = self.price {
            item.price = v;
        }
        if let Some(v) = &self.description {
            item.description = v.clone();
        }
        if let Some(v) = &self.image_url {
            item.image_url = v.clone();
        }
        if let Some(v) = self.custom {
            item.custom = v;
        }
    }
}
