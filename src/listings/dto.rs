use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::listings::repo_types::Item;

/// Listing as the storefront consumes it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDto {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub seller_id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub category: String,
    pub color: Option<String>,
    pub condition: String,
    pub price: f64,
    pub name: String,
    pub description: Option<String>,
    pub orders: i64,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    #[serde(rename = "isCustom")]
    pub custom: bool,
}

impl From<Item> for ListingDto {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            date: i.date,
            seller_id: i.seller_id,
            item_type: i.item_type,
            category: i.category,
            color: i.color,
            condition: i.condition,
            price: i.price,
            name: i.name,
            description: i.description,
            orders: i.orders,
            image_url: i.image_url,
            custom: i.custom,
        }
    }
}

/// `?category=&sellerId=`; blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    #[serde(rename = "sellerId", alias = "seller_id")]
    pub seller_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteListingRequest {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatedListingResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteListingResponse {
    pub success: bool,
}
