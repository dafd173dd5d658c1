diesel::table! {
    products (id) {
        id -> Integer,
        name -> Text,
        price -> Double,
        currency -> Text,
        condition -> Text,
        category -> Text,
        description -> Nullable<Text>,
        location -> Nullable<Text>,
        contact -> Nullable<Text>,
        images -> Text,
        sold -> Bool,
        share_count -> Integer,
        last_shared -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    price_history (id) {
        id -> Integer,
        product_id -> Integer,
        old_price -> Double,
        new_price -> Double,
        changed_at -> Timestamp,
    }
}

diesel::table! {
    templates (id) {
        id -> Integer,
        name -> Text,
        platform -> Text,
        template -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(price_history -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(
    products,
    price_history,
    templates,
);
