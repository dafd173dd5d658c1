use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Condition};

/// Listings not shared for this long are due for a repost.
pub const REPOST_AFTER_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSuggestion {
    pub suggested: u32,
    pub low: u32,
    pub high: u32,
}

/// Base asking prices per condition: New, Like New, Good, Fair, For Parts.
fn base_prices(category: Category) -> [u32; 5] {
    match category {
        Category::Electronics => [5000, 4000, 3000, 2000, 500],
        Category::Furniture => [3000, 2500, 1800, 1000, 300],
        Category::Kitchen => [800, 600, 400, 250, 100],
        Category::Appliances => [2000, 1500, 1000, 600, 200],
        Category::Clothing => [500, 350, 200, 100, 30],
        _ => [500, 350, 250, 150, 50],
    }
}

pub fn suggest_price(category: Category, condition: Condition) -> PriceSuggestion {
    let prices = base_prices(category);
    let suggested = match condition {
        Condition::New => prices[0],
        Condition::LikeNew => prices[1],
        Condition::Good => prices[2],
        Condition::Fair => prices[3],
        Condition::ForParts => prices[4],
    };

    PriceSuggestion {
        suggested,
        low: suggested * 7 / 10,
        high: suggested * 13 / 10,
    }
}

pub fn needs_repost(last_shared: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    match last_shared {
        None => true,
        Some(last) => now - last >= Duration::days(REPOST_AFTER_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn known_category_uses_its_own_row() {
        let s = suggest_price(Category::Electronics, Condition::Good);
        assert_eq!(s, PriceSuggestion { suggested: 3000, low: 2100, high: 3900 });
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        assert_eq!(
            suggest_price(Category::Toys, Condition::Fair),
            suggest_price(Category::Other, Condition::Fair)
        );
        assert_eq!(suggest_price(Category::Other, Condition::ForParts).low, 35);
    }

    #[test]
    fn repost_is_due_after_seven_full_days() {
        assert!(needs_repost(None, at(10, 12)));
        assert!(!needs_repost(Some(at(3, 13)), at(10, 12)));
        assert!(needs_repost(Some(at(3, 12)), at(10, 12)));
    }
}
