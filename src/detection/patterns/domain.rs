//! Domain rules: what the content is about.

use std::sync::LazyLock;

use super::architecture::{CONTENT_TABLES, USER_TABLES};
use super::{exact, one_of, PatternRule, ScoringProfile};
use crate::detection::types::Domain;

const GEAR_TABLES: &[&str] = &["gear", "equipment", "gear_items"];

const TRIP_TABLES: &[&str] = &["trips", "adventures", "expeditions"];

static RULES: LazyLock<Vec<PatternRule<Domain>>> = LazyLock::new(|| {
    vec![
        PatternRule::new("outdoor_gear_catalog", "Outdoor gear catalog", 0.85)
            .indicates(Domain::Outdoor, 1.0)
            .table(one_of(GEAR_TABLES))
            .table(one_of(&["gear_categories", "equipment_categories"]))
            .table(one_of(&["gear_reviews", "equipment_reviews"]))
            .column(
                Some(one_of(GEAR_TABLES)),
                one_of(&["weight_grams", "brand", "condition"]),
            ),
        PatternRule::new("outdoor_trips", "Trips and trails", 0.8)
            .indicates(Domain::Outdoor, 1.0)
            .table(one_of(TRIP_TABLES))
            .table(one_of(&["trails", "routes", "campsites"]))
            .table(one_of(&["trip_gear", "packing_lists"]))
            .relationship(one_of(&["trip_gear", "packing_lists"]), one_of(GEAR_TABLES)),
        PatternRule::new("saas_billing", "Subscription billing", 0.8)
            .indicates(Domain::Saas, 1.0)
            .table(exact("subscriptions"))
            .table(one_of(&["billing_customers", "plans"]))
            .table(one_of(&["invoices", "subscription_items"]))
            .min_matches(2),
        PatternRule::new("saas_workspace", "Workspace tooling", 0.7)
            .indicates(Domain::Saas, 1.0)
            .table(one_of(&["projects", "workspaces"]))
            .table(one_of(&["tasks", "issues"]))
            .table(one_of(&["api_keys", "integrations", "webhooks"]))
            .table(one_of(&["audit_logs", "activity_logs"]))
            .min_matches(2),
        PatternRule::new("ecommerce_catalog", "Product catalog and orders", 0.9)
            .indicates(Domain::Ecommerce, 1.0)
            .table(exact("products"))
            .table(exact("orders"))
            .table(one_of(&["order_items", "line_items"]))
            .table(one_of(&["carts", "cart_items"]))
            .table(one_of(&["inventory", "product_variants"]))
            .relationship(one_of(&["order_items", "line_items"]), exact("products"))
            .min_matches(2)
            .scoring(ScoringProfile::structural(0.7, 0.3)),
        PatternRule::new("ecommerce_payments", "Payments and shipping", 0.6)
            .indicates(Domain::Ecommerce, 1.0)
            .table(one_of(&["payments", "transactions"]))
            .table(one_of(&["shipping_addresses", "shipments"]))
            .table(one_of(&["coupons", "discounts"]))
            .column(Some(exact("products")), one_of(&["price", "sku"]))
            .min_matches(2),
        PatternRule::new("social_graph", "Follows and reactions", 0.85)
            .indicates(Domain::Social, 1.0)
            .table(one_of(&["follows", "followers", "friendships", "connections"]))
            .table(one_of(&["likes", "reactions"]))
            .table(one_of(&["feeds", "activity_feed"]))
            .min_matches(2),
        PatternRule::new("social_content", "Posts and comments", 0.5)
            .indicates(Domain::Social, 0.7)
            .indicates(Domain::Generic, 0.3)
            .table(exact("posts"))
            .table(exact("comments"))
            .relationship(exact("comments"), exact("posts"))
            .min_matches(2),
        PatternRule::new("social_messaging", "Messaging", 0.6)
            .indicates(Domain::Social, 1.0)
            .table(one_of(&["messages", "direct_messages"]))
            .table(exact("conversations"))
            .min_matches(2),
        PatternRule::new("generic_crud", "Users with content", 0.2)
            .indicates(Domain::Generic, 1.0)
            .table(one_of(USER_TABLES))
            .table(one_of(CONTENT_TABLES)),
    ]
});

/// Rules answering "what kind of content?".
pub fn domain_rules() -> &'static [PatternRule<Domain>] {
    &RULES
}
