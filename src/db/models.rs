use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use diesel::prelude::*;
use crate::db::schema::{price_history, products, templates};

#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub condition: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub images: String,
    pub sold: bool,
    pub share_count: i32,
    pub last_shared: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Product {
    /// Stored image filenames, in upload order.
    pub fn image_list(&self) -> Vec<String> {
        split_images(&self.images)
    }
}

pub fn split_images(images: &str) -> Vec<String> {
    images
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_images(images: &[String]) -> String {
    images
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub condition: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub images: String,
    pub created_at: NaiveDateTime,
}

/// `None` skips a column; `Some(None)` clears a nullable one.
#[derive(AsChangeset, Deserialize, Debug, Clone, Default)]
#[diesel(table_name = products)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub contact: Option<Option<String>>,
    pub images: Option<String>,
    pub sold: Option<bool>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.currency.is_none()
            && self.condition.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.contact.is_none()
            && self.images.is_none()
            && self.sold.is_none()
    }
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = price_history)]
pub struct PriceHistory {
    pub id: i32,
    pub product_id: i32,
    pub old_price: f64,
    pub new_price: f64,
    pub changed_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = price_history)]
pub struct NewPriceHistory {
    pub product_id: i32,
    pub old_price: f64,
    pub new_price: f64,
    pub changed_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = templates)]
pub struct Template {
    pub id: i32,
    pub name: String,
    pub platform: String,
    pub template: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = templates)]
pub struct NewTemplate {
    pub name: String,
    pub platform: String,
    pub template: String,
    pub created_at: NaiveDateTime,
}

/// Dashboard counters, computed over every product.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InventoryStats {
    pub total: i64,
    pub available: i64,
    pub sold: i64,
    pub inventory_value: f64,
    pub revenue: f64,
    pub total_shares: i64,
}

/// A removed product together with the image files nothing else references.
#[derive(Debug, Clone)]
pub struct DeletedProduct {
    pub product: Product,
    pub orphaned_images: Vec<String>,
}
