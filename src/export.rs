use std::io::Write;

use chrono::NaiveDate;

use crate::db::models::Product;

pub const CSV_HEADER: [&str; 11] = [
    "Name",
    "Price",
    "Currency",
    "Condition",
    "Category",
    "Description",
    "Location",
    "WhatsApp",
    "Sold",
    "Shares",
    "Created",
];

pub fn export_filename(today: NaiveDate) -> String {
    format!("vinci_products_{}.csv", today.format("%Y%m%d"))
}

pub fn write_csv<W: Write>(products: &[Product], writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADER)?;

    for p in products {
        out.write_record([
            p.name.clone(),
            p.price.to_string(),
            p.currency.clone(),
            p.condition.clone(),
            p.category.clone(),
            p.description.clone().unwrap_or_default(),
            p.location.clone().unwrap_or_default(),
            p.contact.clone().unwrap_or_default(),
            if p.sold { "Yes" } else { "No" }.to_string(),
            p.share_count.to_string(),
            p.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ])?;
    }

    out.flush()?;
    Ok(())
}
