use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::models::{join_images, NewProduct, NewTemplate, Product as ProductRow, UpdateProduct};
use crate::error::AppError;
use crate::pricing::needs_repost;

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum!(
    /// Currency label; the symbol is the part before the space.
    Currency {
        #[default]
        Zar => "R ZAR",
        Usd => "$ USD",
        Gbp => "£ GBP",
        Eur => "€ EUR",
    }
);

labelled_enum!(Condition {
    New => "New",
    LikeNew => "Like New",
    #[default]
    Good => "Good",
    Fair => "Fair",
    ForParts => "For Parts",
});

labelled_enum!(Category {
    Electronics => "Electronics",
    Furniture => "Furniture",
    Kitchen => "Kitchen",
    Appliances => "Appliances",
    Garden => "Garden",
    Clothing => "Clothing",
    Sports => "Sports",
    Books => "Books",
    Toys => "Toys",
    Decor => "Decor",
    Tools => "Tools",
    Vehicles => "Vehicles",
    Beauty => "Beauty",
    Baby => "Baby",
    Music => "Music",
    Gaming => "Gaming",
    Collectibles => "Collectibles",
    Jewelry => "Jewelry",
    Art => "Art",
    Pets => "Pets",
    Office => "Office",
    Health => "Health",
    Food => "Food",
    #[default]
    Other => "Other",
});

labelled_enum!(
    /// Where a template is meant to be posted.
    Platform {
        #[default]
        Both => "Both",
        WhatsApp => "WhatsApp",
        Facebook => "Facebook",
    }
);

impl Currency {
    pub fn symbol(&self) -> &'static str {
        crate::listing::currency_symbol(self.as_str())
    }
}

/// Which built-in listing generator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    #[default]
    Whatsapp,
    Facebook,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
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
    pub images: Vec<String>,
    pub sold: bool,
    pub share_count: i32,
    pub last_shared: Option<NaiveDateTime>,
    pub needs_repost: bool,
    pub created_at: NaiveDateTime,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let images = row.image_list();
        let needs_repost = needs_repost(row.last_shared, Utc::now().naive_utc());
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            currency: row.currency,
            condition: row.condition,
            category: row.category,
            description: row.description,
            location: row.location,
            contact: row.contact,
            images,
            sold: row.sold,
            share_count: row.share_count,
            last_shared: row.last_shared,
            needs_repost,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub category: Category,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, AppError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        Ok(NewProduct {
            name: self.name.trim().to_string(),
            price: self.price,
            currency: self.currency.as_str().to_string(),
            condition: self.condition.as_str().to_string(),
            category: self.category.as_str().to_string(),
            description: non_blank(self.description),
            location: non_blank(self.location),
            contact: non_blank(self.contact),
            images: join_images(&self.images),
            created_at: Utc::now().naive_utc(),
        })
    }
}

/// Partial update; absent fields are left unchanged. `null` or blank text
/// clears description, location and contact.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub condition: Option<Condition>,
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub contact: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    pub sold: Option<bool>,
}

/// A present field, even `null`, becomes `Some`; an absent one stays `None`
/// through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateProductRequest {
    pub fn into_changes(self) -> Result<UpdateProduct, AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(UpdateProduct {
            name: self.name.map(|n| n.trim().to_string()),
            price: self.price,
            currency: self.currency.map(|c| c.as_str().to_string()),
            condition: self.condition.map(|c| c.as_str().to_string()),
            category: self.category.map(|c| c.as_str().to_string()),
            description: self.description.map(non_blank),
            location: self.location.map(non_blank),
            contact: self.contact.map(non_blank),
            images: self.images.as_deref().map(join_images),
            sold: self.sold,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Available,
    Sold,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub status: Option<StatusFilter>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub platform: Platform,
    pub template: String,
}

impl CreateTemplateRequest {
    pub fn into_new_template(self) -> Result<NewTemplate, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Template name cannot be empty".to_string()));
        }
        if self.template.trim().is_empty() {
            return Err(AppError::Validation("Template text cannot be empty".to_string()));
        }
        Ok(NewTemplate {
            name: self.name.trim().to_string(),
            platform: self.platform.as_str().to_string(),
            template: self.template,
            created_at: Utc::now().naive_utc(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ListingQuery {
    #[serde(default)]
    pub platform: ListingKind,
    pub template_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ListingResponse {
    pub product_id: i32,
    pub platform: ListingKind,
    pub message: String,
    pub share_count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceSuggestionQuery {
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OfferRequest {
    pub phone: String,
    pub item_name: String,
    pub offer_price: f64,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkShareRequest {
    pub phone: String,
    pub product_ids: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareOutcome {
    pub product_id: i32,
    pub sent: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub filenames: Vec<String>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Product name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation("Product price must be zero or more".to_string()));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, price: f64) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            price,
            currency: Currency::default(),
            condition: Condition::default(),
            category: Category::default(),
            description: Some("  ".to_string()),
            location: None,
            contact: None,
            images: vec!["a.jpg".to_string(), "b.png".to_string()],
        }
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert!(serde_json::from_value::<Category>(serde_json::json!("Spaceships")).is_err());
        assert!(serde_json::from_value::<Condition>(serde_json::json!("like new")).is_err());
        assert_eq!(Currency::default(), Currency::Zar);
        assert_eq!(Platform::default(), Platform::Both);
    }

    #[test]
    fn update_distinguishes_absent_from_cleared() {
        let parsed: UpdateProductRequest =
            serde_json::from_value(serde_json::json!({"description": null, "location": "  ", "price": 5})).unwrap();
        let changes = parsed.into_changes().unwrap();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.location, Some(None));
        assert_eq!(changes.contact, None);
        assert_eq!(changes.price, Some(5.0));
    }

    #[test]
    fn currency_symbol_is_the_first_token() {
        assert_eq!(Currency::Zar.symbol(), "R");
        assert_eq!(Currency::Eur.symbol(), "€");
    }

    #[test]
    fn create_request_fills_defaults_and_joins_images() {
        let new_product = request(" Drill ", 500.0).into_new_product().unwrap();
        assert_eq!(new_product.name, "Drill");
        assert_eq!(new_product.currency, "R ZAR");
        assert_eq!(new_product.condition, "Good");
        assert_eq!(new_product.category, "Other");
        assert_eq!(new_product.description, None);
        assert_eq!(new_product.images, "a.jpg,b.png");
    }

    #[test]
    fn create_request_rejects_blank_name_and_negative_price() {
        assert!(matches!(request("   ", 10.0).into_new_product(), Err(AppError::Validation(_))));
        assert!(matches!(request("Lamp", -1.0).into_new_product(), Err(AppError::Validation(_))));
        assert!(matches!(request("Lamp", f64::NAN).into_new_product(), Err(AppError::Validation(_))));
        assert!(request("Free lamp", 0.0).into_new_product().is_ok());
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::json!({"name": "Lamp", "price": 100, "currency": "$ USD", "condition": "For Parts"});
        let parsed: CreateProductRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.currency, Currency::Usd);
        assert_eq!(parsed.condition, Condition::ForParts);
        assert_eq!(parsed.category, Category::Other);
    }
}
