use actix_multipart::Multipart;
use actix_web::http::header::ContentDisposition;
use actix_web::{web, HttpResponse};
use chrono::Local;
use futures::StreamExt;
use serde_json::json;

use crate::db::connection::DbPool;
use crate::db::models::Product as ProductRow;
use crate::db::repository::{self, ProductFilter};
use crate::error::{AppError, AppResult};
use crate::export;
use crate::listing;
use crate::messaging::{DispatchError, Dispatcher};
use crate::models::{
    BulkShareRequest, Category, Condition, CreateProductRequest, CreateTemplateRequest, Currency,
    ListingKind, ListingQuery, ListingResponse, OfferRequest, Platform, PriceSuggestionQuery,
    Product, ProductQuery, ShareOutcome, StatusFilter, UpdateProductRequest, UploadResponse,
};
use crate::pricing;
use crate::uploads::ImageStore;

pub struct AppState {
    pub pool: DbPool,
    pub images: ImageStore,
    pub dispatcher: Dispatcher,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/products", web::get().to(get_products))
        .route("/api/products", web::post().to(create_product))
        .route("/api/products/{id}", web::get().to(get_product))
        .route("/api/products/{id}", web::patch().to(update_product))
        .route("/api/products/{id}", web::delete().to(delete_product))
        .route("/api/products/{id}/duplicate", web::post().to(duplicate_product))
        .route("/api/products/{id}/price-history", web::get().to(get_price_history))
        .route("/api/products/{id}/listing", web::get().to(preview_listing))
        .route("/api/products/{id}/share", web::post().to(share_listing))
        .route("/api/stats", web::get().to(get_stats))
        .route("/api/options", web::get().to(get_options))
        .route("/api/price-suggestion", web::get().to(get_price_suggestion))
        .route("/api/templates", web::get().to(get_templates))
        .route("/api/templates", web::post().to(create_template))
        .route("/api/templates/{id}", web::delete().to(delete_template))
        .route("/api/uploads", web::post().to(upload_images))
        .route("/api/whatsapp/offer", web::post().to(send_offer))
        .route("/api/whatsapp/share", web::post().to(share_to_whatsapp))
        .route("/api/export.csv", web::get().to(export_csv));
}

fn product_not_found(id: i32) -> AppError {
    AppError::NotFound { entity: "Product", id }
}

fn load_product(data: &AppState, id: i32) -> AppResult<ProductRow> {
    let conn = &mut data.pool.get()?;
    repository::get_product(conn, id)?.ok_or_else(|| product_not_found(id))
}

async fn get_products(
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let filter = ProductFilter {
        category: query.category.map(|c| c.as_str().to_string()),
        sold: match query.status {
            Some(StatusFilter::Available) => Some(false),
            Some(StatusFilter::Sold) => Some(true),
            Some(StatusFilter::All) | None => None,
        },
        search: query.search,
    };

    let conn = &mut data.pool.get()?;
    let products: Vec<Product> = repository::list_products(conn, &filter)?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(HttpResponse::Ok().json(products))
}

async fn get_product(data: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let product = load_product(&data, id.into_inner())?;
    Ok(HttpResponse::Ok().json(Product::from(product)))
}

async fn create_product(
    data: web::Data<AppState>,
    product: web::Json<CreateProductRequest>,
) -> AppResult<HttpResponse> {
    let new_product = product.into_inner().into_new_product()?;
    let conn = &mut data.pool.get()?;
    let created = repository::create_product(conn, &new_product)?;
    tracing::info!(id = created.id, name = %created.name, "product added");
    Ok(HttpResponse::Created().json(Product::from(created)))
}

async fn update_product(
    data: web::Data<AppState>,
    id: web::Path<i32>,
    changes: web::Json<UpdateProductRequest>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let changes = changes.into_inner().into_changes()?;
    let conn = &mut data.pool.get()?;

    let replaced_images = match changes.images {
        Some(_) => repository::get_product(conn, id)?.map(|p| p.image_list()),
        None => None,
    };
    let updated = repository::update_product(conn, id, &changes)?.ok_or_else(|| product_not_found(id))?;

    if let Some(previous) = replaced_images {
        let orphaned = repository::unreferenced_images(conn, previous)?;
        if !orphaned.is_empty() {
            let removed = data.images.remove(&orphaned);
            tracing::info!(id, images_removed = removed, "replaced product images");
        }
    }

    Ok(HttpResponse::Ok().json(Product::from(updated)))
}

async fn delete_product(data: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let deleted = {
        let conn = &mut data.pool.get()?;
        repository::delete_product(conn, id)?.ok_or_else(|| product_not_found(id))?
    };

    let removed = data.images.remove(&deleted.orphaned_images);
    tracing::info!(id, images_removed = removed, "product deleted");
    Ok(HttpResponse::NoContent().finish())
}

async fn duplicate_product(data: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let conn = &mut data.pool.get()?;
    let copy = repository::duplicate_product(conn, id)?.ok_or_else(|| product_not_found(id))?;
    tracing::info!(source = id, id = copy.id, "product duplicated");
    Ok(HttpResponse::Created().json(Product::from(copy)))
}

async fn get_price_history(data: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let conn = &mut data.pool.get()?;
    if repository::get_product(conn, id)?.is_none() {
        return Err(product_not_found(id));
    }
    Ok(HttpResponse::Ok().json(repository::get_price_history(conn, id)?))
}

fn generate_listing(data: &AppState, product: &ProductRow, query: &ListingQuery) -> AppResult<String> {
    let template = match query.template_id {
        Some(template_id) => {
            let conn = &mut data.pool.get()?;
            let template = repository::get_template(conn, template_id)?
                .ok_or(AppError::NotFound { entity: "Template", id: template_id })?;
            Some(template.template)
        }
        None => None,
    };

    Ok(match query.platform {
        ListingKind::Whatsapp => listing::whatsapp_message(product, template.as_deref()),
        ListingKind::Facebook => listing::facebook_post(product, template.as_deref()),
    })
}

async fn preview_listing(
    data: web::Data<AppState>,
    id: web::Path<i32>,
    query: web::Query<ListingQuery>,
) -> AppResult<HttpResponse> {
    let product = load_product(&data, id.into_inner())?;
    let message = generate_listing(&data, &product, &query)?;
    Ok(HttpResponse::Ok().json(ListingResponse {
        product_id: product.id,
        platform: query.platform,
        message,
        share_count: product.share_count,
    }))
}

/// Generates the listing for copy-paste and counts it as a share.
async fn share_listing(
    data: web::Data<AppState>,
    id: web::Path<i32>,
    query: web::Query<ListingQuery>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let product = load_product(&data, id)?;
    let message = generate_listing(&data, &product, &query)?;

    let conn = &mut data.pool.get()?;
    let shared = repository::record_share(conn, id)?.ok_or_else(|| product_not_found(id))?;
    Ok(HttpResponse::Ok().json(ListingResponse {
        product_id: id,
        platform: query.platform,
        message,
        share_count: shared.share_count,
    }))
}

async fn get_stats(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let conn = &mut data.pool.get()?;
    Ok(HttpResponse::Ok().json(repository::inventory_stats(conn)?))
}

async fn get_options() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "currencies": Currency::ALL,
        "conditions": Condition::ALL,
        "categories": Category::ALL,
        "platforms": Platform::ALL,
        "placeholders": listing::PLACEHOLDERS,
    }))
}

async fn get_price_suggestion(query: web::Query<PriceSuggestionQuery>) -> HttpResponse {
    HttpResponse::Ok().json(pricing::suggest_price(query.category, query.condition))
}

async fn get_templates(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let conn = &mut data.pool.get()?;
    Ok(HttpResponse::Ok().json(repository::list_templates(conn)?))
}

async fn create_template(
    data: web::Data<AppState>,
    template: web::Json<CreateTemplateRequest>,
) -> AppResult<HttpResponse> {
    let new_template = template.into_inner().into_new_template()?;
    let conn = &mut data.pool.get()?;
    let created = repository::create_template(conn, &new_template)?;
    tracing::info!(id = created.id, name = %created.name, "template saved");
    Ok(HttpResponse::Created().json(created))
}

async fn delete_template(data: web::Data<AppState>, id: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    let conn = &mut data.pool.get()?;
    match repository::delete_template(conn, id)? {
        0 => Err(AppError::NotFound { entity: "Template", id }),
        _ => Ok(HttpResponse::NoContent().finish()),
    }
}

/// Stores every file part of a multipart body; other parts are ignored.
/// A failing part aborts the upload and removes the files already stored.
async fn upload_images(data: web::Data<AppState>, mut payload: Multipart) -> AppResult<HttpResponse> {
    let mut filenames = Vec::new();

    if let Err(err) = store_parts(&data.images, &mut payload, &mut filenames).await {
        let removed = data.images.remove(&filenames);
        tracing::warn!(error = %err, images_removed = removed, "upload aborted");
        return Err(err);
    }

    Ok(HttpResponse::Created().json(UploadResponse { filenames }))
}

async fn store_parts(
    images: &ImageStore,
    payload: &mut Multipart,
    filenames: &mut Vec<String>,
) -> AppResult<()> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|err| AppError::Validation(format!("Invalid upload: {err}")))?;
        let original_name = field.content_disposition().get_filename().map(str::to_string);

        let mut bytes = web::BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|err| AppError::Validation(format!("Invalid upload: {err}")))?;
            bytes.extend_from_slice(&chunk);
        }

        let Some(original_name) = original_name else {
            continue;
        };
        let store = images.clone();
        if let Some(name) = web::block(move || store.save(&original_name, &bytes)).await?? {
            filenames.push(name);
        }
    }

    Ok(())
}

async fn send_offer(data: web::Data<AppState>, offer: web::Json<OfferRequest>) -> AppResult<HttpResponse> {
    let offer = offer.into_inner();
    if !offer.offer_price.is_finite() || offer.offer_price <= 0.0 {
        return Err(AppError::Validation("Offer price must be greater than 0".to_string()));
    }

    let message = listing::offer_message(offer.item_name.trim(), offer.offer_price, offer.currency);
    let dispatcher = data.dispatcher.clone();
    let text = message.clone();
    web::block(move || dispatcher.send(&offer.phone, &text, dispatcher.min_delay(), true)).await??;

    Ok(HttpResponse::Ok().json(json!({ "sent": true, "message": message })))
}

/// Sends each selected product's WhatsApp listing to one contact. Sold or
/// missing products are skipped. A share is recorded only for sends the
/// client reported as successful.
async fn share_to_whatsapp(
    data: web::Data<AppState>,
    request: web::Json<BulkShareRequest>,
) -> AppResult<HttpResponse> {
    let request = request.into_inner();
    if request.product_ids.is_empty() {
        return Err(AppError::Validation("Select at least one product".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(DispatchError::MissingPhone.into());
    }

    let mut outcomes = Vec::with_capacity(request.product_ids.len());
    for product_id in request.product_ids {
        let product = {
            let conn = &mut data.pool.get()?;
            repository::get_product(conn, product_id)?
        };
        let Some(product) = product else {
            outcomes.push(ShareOutcome {
                product_id,
                sent: false,
                error: Some(product_not_found(product_id).to_string()),
            });
            continue;
        };
        if product.sold {
            outcomes.push(ShareOutcome {
                product_id,
                sent: false,
                error: Some(format!("Product {product_id} is already sold")),
            });
            continue;
        }

        let message = listing::whatsapp_message(&product, None);
        let dispatcher = data.dispatcher.clone();
        let phone = request.phone.clone();
        let result = web::block(move || dispatcher.send(&phone, &message, dispatcher.min_delay(), false)).await?;

        match result {
            Ok(()) => {
                let conn = &mut data.pool.get()?;
                repository::record_share(conn, product_id)?;
                outcomes.push(ShareOutcome { product_id, sent: true, error: None });
            }
            Err(err) => outcomes.push(ShareOutcome {
                product_id,
                sent: false,
                error: Some(err.to_string()),
            }),
        }
    }

    Ok(HttpResponse::Ok().json(outcomes))
}

async fn export_csv(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let products = {
        let conn = &mut data.pool.get()?;
        repository::list_products(conn, &ProductFilter::default())?
    };

    let mut body = Vec::new();
    export::write_csv(&products, &mut body)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition::attachment(export::export_filename(
            Local::now().date_naive(),
        )))
        .body(body))
}
