//! MakerKit feature rules.
//!
//! Each rule detects one feature. The version ladder in
//! [`framework`](crate::detection::framework) decides the version from the
//! set of matched feature ids; the rules only say which versions a feature
//! supports.

use std::sync::LazyLock;

use super::{exact, one_of, ConstraintMatcher, NamePattern, PatternRule};
use crate::detection::types::FrameworkVersion;
use crate::introspect::ConstraintKind;

const V1_AND_UP: &[FrameworkVersion] = &[
    FrameworkVersion::V1,
    FrameworkVersion::V2,
    FrameworkVersion::V3,
];
const V2_AND_UP: &[FrameworkVersion] = &[FrameworkVersion::V2, FrameworkVersion::V3];
const V3_ONLY: &[FrameworkVersion] = &[FrameworkVersion::V3];

/// Account-level fields introduced with the latest layout.
pub const ACCOUNT_FIELD_FEATURES: &[&str] = &[
    "personal_account_field",
    "primary_owner_field",
    "account_slug_field",
];

/// Supporting feature that raises confidence but is never required.
pub const FRAMEWORK_FUNCTIONS_FEATURE: &str = "makerkit_functions";

/// Supporting feature: the check that clears slugs on personal accounts
/// (`accounts_slug_null_if_personal_account_true`).
pub const PERSONAL_SLUG_CHECK_FEATURE: &str = "personal_slug_check";

fn feature(
    id: &'static str,
    name: &'static str,
    weight: f64,
    versions: &[FrameworkVersion],
) -> PatternRule<FrameworkVersion> {
    versions
        .iter()
        .fold(PatternRule::new(id, name, weight), |rule, version| {
            rule.indicates(*version, 1.0)
        })
}

static FEATURES: LazyLock<Vec<PatternRule<FrameworkVersion>>> = LazyLock::new(|| {
    vec![
        feature("accounts_table", "accounts table", 1.0, V1_AND_UP).table(exact("accounts")),
        feature("memberships_table", "account memberships table", 0.9, V1_AND_UP)
            .table(one_of(&["accounts_memberships", "memberships"])),
        feature("subscriptions_table", "subscriptions table", 0.8, V2_AND_UP)
            .table(exact("subscriptions")),
        feature("roles_table", "roles table", 0.7, V2_AND_UP).table(exact("roles")),
        feature("invitations_table", "invitations table", 0.7, V2_AND_UP)
            .table(exact("invitations")),
        feature("notifications_table", "notifications table", 0.6, V3_ONLY)
            .table(exact("notifications")),
        feature("role_permissions_table", "role permissions table", 0.6, V3_ONLY)
            .table(exact("role_permissions")),
        feature("billing_customers_table", "billing customers table", 0.6, V3_ONLY)
            .table(exact("billing_customers")),
        feature("personal_account_field", "accounts.is_personal_account", 0.5, V3_ONLY)
            .column(Some(exact("accounts")), exact("is_personal_account")),
        feature("primary_owner_field", "accounts.primary_owner_user_id", 0.5, V3_ONLY)
            .column(Some(exact("accounts")), exact("primary_owner_user_id")),
        feature("account_slug_field", "accounts.slug", 0.4, V3_ONLY)
            .column(Some(exact("accounts")), exact("slug")),
        feature(FRAMEWORK_FUNCTIONS_FEATURE, "account helper functions", 0.5, V3_ONLY)
            .function(one_of(&[
                "has_role_on_account",
                "is_account_owner",
                "create_team_account",
                "has_permission",
            ])),
        feature(PERSONAL_SLUG_CHECK_FEATURE, "personal account slug check", 0.5, V3_ONLY)
            .constraint(
                ConstraintMatcher::of_kind(ConstraintKind::Check)
                    .on(exact("accounts"))
                    .defined_as(NamePattern::Contains("is_personal_account")),
            ),
    ]
});

/// One rule per framework feature.
pub fn framework_features() -> &'static [PatternRule<FrameworkVersion>] {
    &FEATURES
}

/// Feature ids a schema of this version is expected to have.
pub fn expected_features(version: FrameworkVersion) -> Vec<&'static str> {
    match version {
        FrameworkVersion::V1 => vec!["accounts_table", "memberships_table"],
        FrameworkVersion::V2 => vec![
            "accounts_table",
            "memberships_table",
            "subscriptions_table",
            "roles_table",
            "invitations_table",
        ],
        FrameworkVersion::V3 => {
            let mut features = expected_features(FrameworkVersion::V2);
            features.extend([
                "notifications_table",
                "role_permissions_table",
                "billing_customers_table",
            ]);
            features.extend(ACCOUNT_FIELD_FEATURES.iter().copied());
            features
        }
        FrameworkVersion::Custom => vec!["accounts_table", "memberships_table"],
        FrameworkVersion::Absent => vec![],
    }
}
