//! Second-hand goods inventory: products with price history, listing
//! templates, and WhatsApp dispatch through an injected messaging client.

pub mod db;
pub mod error;
pub mod export;
pub mod listing;
pub mod messaging;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod settings;
pub mod uploads;

use std::fs;

use crate::error::AppResult;
use crate::messaging::Dispatcher;
use crate::routes::AppState;
use crate::settings::Settings;
use crate::uploads::ImageStore;

/// Opens the database (running pending migrations), prepares the upload
/// directory and wires the messaging client chosen in `settings`.
pub fn init_state(settings: &Settings) -> AppResult<AppState> {
    let pool = db::connection::init_pool(&settings.database)?;
    let images = ImageStore::new(&settings.uploads);
    fs::create_dir_all(images.dir()).map_err(uploads::UploadError::from)?;

    Ok(AppState {
        pool,
        images,
        dispatcher: Dispatcher::from_settings(&settings.messaging),
    })
}
