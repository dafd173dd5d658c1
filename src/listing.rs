//! Listing text generation: placeholder templates plus the two built-in
//! formats (a WhatsApp chat message and a Facebook marketplace post).

use crate::db::models::Product;
use crate::models::Currency;

/// Placeholders understood by [`render`].
pub const PLACEHOLDERS: [&str; 6] = [
    "{name}",
    "{price}",
    "{condition}",
    "{description}",
    "{location}",
    "{category}",
];

/// `"R ZAR"` -> `"R"`. A label without a space is its own symbol.
pub fn currency_symbol(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or(label)
}

/// Symbol glued to the price, e.g. `R100` or `$99.5`.
pub fn format_price(currency: &str, price: f64) -> String {
    format!("{}{}", currency_symbol(currency), price)
}

pub fn render(template: &str, product: &Product) -> String {
    template
        .replace("{name}", &product.name)
        .replace("{price}", &format_price(&product.currency, product.price))
        .replace("{condition}", &product.condition)
        .replace("{description}", product.description.as_deref().unwrap_or(""))
        .replace("{location}", product.location.as_deref().unwrap_or(""))
        .replace("{category}", &product.category)
}

pub fn whatsapp_message(product: &Product, template: Option<&str>) -> String {
    if let Some(template) = template {
        return render(template, product);
    }

    format!(
        "🔥 *{name}* - {condition}\n\
         \n\
         💰 *Price:* {price}\n\
         📍 *Location:* {location}\n\
         \n\
         {description}\n\
         \n\
         📱 WhatsApp me if interested!",
        name = product.name.to_uppercase(),
        condition = product.condition.to_uppercase(),
        price = format_price(&product.currency, product.price),
        location = product.location.as_deref().unwrap_or(""),
        description = product.description.as_deref().unwrap_or(""),
    )
}

pub fn facebook_post(product: &Product, template: Option<&str>) -> String {
    if let Some(template) = template {
        return render(template, product);
    }

    let price = format_price(&product.currency, product.price);
    format!(
        "🔥 {upper_name} - {upper_condition} - {price}\n\
         \n\
         Selling a {condition} {name}.\n\
         \n\
         {description}\n\
         \n\
         📍 Location: {location}\n\
         💰 Price: {price}\n\
         📩 Message me if interested! First come, first served.",
        upper_name = product.name.to_uppercase(),
        upper_condition = product.condition.to_uppercase(),
        condition = product.condition,
        name = product.name,
        description = product.description.as_deref().unwrap_or(""),
        location = product.location.as_deref().unwrap_or(""),
    )
}

/// Buy offer sent to another seller.
pub fn offer_message(item_name: &str, offer_price: f64, currency: Currency) -> String {
    format!(
        "Hi! I saw your listing for the {item_name} on Facebook. I'm interested. \
         Would you accept {}{offer_price} if I pick it up today?",
        currency.symbol()
    )
}
