use std::collections::HashSet;

use chrono::Utc;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::models::*;
use crate::db::schema::{price_history, products, templates};

/// Conjunctive listing filter. `None` means "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub sold: Option<bool>,
    pub search: Option<String>,
}

pub fn create_product(conn: &mut SqliteConnection, new_product: &NewProduct) -> QueryResult<Product> {
    diesel::insert_into(products::table)
        .values(new_product)
        .get_result(conn)
}

pub fn get_product(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Product>> {
    products::table.find(id).first(conn).optional()
}

/// Newest first. Category and sold status are filtered in SQL; the text
/// search runs on the loaded rows so it is case-insensitive beyond ASCII.
pub fn list_products(conn: &mut SqliteConnection, filter: &ProductFilter) -> QueryResult<Vec<Product>> {
    let mut query = products::table.into_boxed();

    if let Some(category) = &filter.category {
        query = query.filter(products::category.eq(category));
    }

    if let Some(sold) = filter.sold {
        query = query.filter(products::sold.eq(sold));
    }

    let mut rows: Vec<Product> = query
        .order((products::created_at.desc(), products::id.desc()))
        .load(conn)?;

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let term = term.to_lowercase();
        rows.retain(|p| {
            p.name.to_lowercase().contains(&term)
                || p.description
                    .as_deref()
                    .map_or(false, |d| d.to_lowercase().contains(&term))
        });
    }

    Ok(rows)
}

/// Applies `changes` and audits a differing price in the same transaction.
/// Returns `None` when the product does not exist.
pub fn update_product(
    conn: &mut SqliteConnection,
    id: i32,
    changes: &UpdateProduct,
) -> QueryResult<Option<Product>> {
    conn.immediate_transaction(|conn| {
        let Some(current) = products::table.find(id).first::<Product>(conn).optional()? else {
            return Ok(None);
        };

        if let Some(new_price) = changes.price {
            if new_price != current.price {
                diesel::insert_into(price_history::table)
                    .values(&NewPriceHistory {
                        product_id: id,
                        old_price: current.price,
                        new_price,
                        changed_at: Utc::now().naive_utc(),
                    })
                    .execute(conn)?;
            }
        }

        if changes.is_empty() {
            return Ok(Some(current));
        }

        diesel::update(products::table.find(id))
            .set(changes)
            .get_result(conn)
            .map(Some)
    })
}

/// Removes the product and its price history. Image files are left to the
/// caller; `orphaned_images` lists the ones no remaining product uses.
pub fn delete_product(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<DeletedProduct>> {
    conn.immediate_transaction(|conn| {
        let Some(product) = products::table.find(id).first::<Product>(conn).optional()? else {
            return Ok(None);
        };

        diesel::delete(price_history::table.filter(price_history::product_id.eq(id))).execute(conn)?;
        diesel::delete(products::table.find(id)).execute(conn)?;

        let orphaned_images = unreferenced_images(conn, product.image_list())?;
        Ok(Some(DeletedProduct { product, orphaned_images }))
    })
}

/// Keeps the `candidates` that no stored product lists among its images.
pub fn unreferenced_images(conn: &mut SqliteConnection, candidates: Vec<String>) -> QueryResult<Vec<String>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }
    let stored: Vec<String> = products::table.select(products::images).load(conn)?;
    let in_use: HashSet<String> = stored.iter().flat_map(|s| split_images(s)).collect();
    Ok(candidates.into_iter().filter(|name| !in_use.contains(name)).collect())
}

pub fn duplicate_product(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Product>> {
    conn.immediate_transaction(|conn| {
        let Some(source) = products::table.find(id).first::<Product>(conn).optional()? else {
            return Ok(None);
        };

        let copy = NewProduct {
            name: format!("{} (Copy)", source.name),
            price: source.price,
            currency: source.currency,
            condition: source.condition,
            category: source.category,
            description: source.description,
            location: source.location,
            contact: source.contact,
            images: source.images,
            created_at: Utc::now().naive_utc(),
        };

        diesel::insert_into(products::table)
            .values(&copy)
            .get_result(conn)
            .map(Some)
    })
}

pub fn get_price_history(conn: &mut SqliteConnection, product_id: i32) -> QueryResult<Vec<PriceHistory>> {
    price_history::table
        .filter(price_history::product_id.eq(product_id))
        .order((price_history::changed_at.desc(), price_history::id.desc()))
        .load(conn)
}

pub fn record_share(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Product>> {
    diesel::update(products::table.find(id))
        .set((
            products::share_count.eq(products::share_count + 1),
            products::last_shared.eq(Utc::now().naive_utc()),
        ))
        .get_result(conn)
        .optional()
}

pub fn inventory_stats(conn: &mut SqliteConnection) -> QueryResult<InventoryStats> {
    conn.transaction(|conn| {
        let total: i64 = products::table.count().get_result(conn)?;
        let available: i64 = products::table
            .filter(products::sold.eq(false))
            .count()
            .get_result(conn)?;
        let sold: i64 = products::table
            .filter(products::sold.eq(true))
            .count()
            .get_result(conn)?;
        let inventory_value: Option<f64> = products::table
            .filter(products::sold.eq(false))
            .select(sum(products::price))
            .first(conn)?;
        let revenue: Option<f64> = products::table
            .filter(products::sold.eq(true))
            .select(sum(products::price))
            .first(conn)?;
        let total_shares: Option<i64> = products::table
            .select(sum(products::share_count))
            .first(conn)?;

        Ok(InventoryStats {
            total,
            available,
            sold,
            inventory_value: inventory_value.unwrap_or(0.0),
            revenue: revenue.unwrap_or(0.0),
            total_shares: total_shares.unwrap_or(0),
        })
    })
}

pub fn create_template(conn: &mut SqliteConnection, new_template: &NewTemplate) -> QueryResult<Template> {
    diesel::insert_into(templates::table)
        .values(new_template)
        .get_result(conn)
}

pub fn get_template(conn: &mut SqliteConnection, id: i32) -> QueryResult<Option<Template>> {
    templates::table.find(id).first(conn).optional()
}

pub fn list_templates(conn: &mut SqliteConnection) -> QueryResult<Vec<Template>> {
    templates::table
        .order((templates::created_at.desc(), templates::id.desc()))
        .load(conn)
}

pub fn delete_template(conn: &mut SqliteConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(templates::table.find(id)).execute(conn)
}
