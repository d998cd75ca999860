//! Architecture rules: who owns the content.

use std::sync::LazyLock;

use regex::Regex;

use super::{exact, one_of, ConstraintMatcher, NamePattern, PatternRule, ScoringProfile};
use crate::detection::types::Architecture;
use crate::introspect::ConstraintKind;

pub const USER_TABLES: &[&str] = &["users", "profiles", "user_profiles", "members"];

pub(super) const CONTENT_TABLES: &[&str] = &[
    "posts",
    "articles",
    "items",
    "gear",
    "equipment",
    "trips",
    "products",
    "projects",
    "documents",
    "notes",
    "photos",
    "listings",
];

const TEAM_TABLES: &[&str] = &["teams", "organizations", "orgs", "workspaces", "accounts"];

const MEMBERSHIP_TABLES: &[&str] = &[
    "accounts_memberships",
    "memberships",
    "team_members",
    "organization_members",
    "workspace_members",
];

const OWNER_COLUMNS: &[&str] = &["user_id", "owner_id", "author_id", "created_by", "profile_id"];

const TENANT_COLUMNS: &[&str] = &["team_id", "organization_id", "org_id", "workspace_id", "account_id"];

/// `FOREIGN KEY (account_id) ...` and friends.
static TENANT_FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"foreign key \(\s*(team|organization|org|workspace|account)_id\s*\)").unwrap()
});

/// A key over the tenant column and `user_id`, in either order.
static TENANT_USER_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\(\s*(team|organization|org|workspace|account)_id\s*,\s*user_id\s*\)|\(\s*user_id\s*,\s*(team|organization|org|workspace|account)_id\s*\)",
    )
    .unwrap()
});

static RULES: LazyLock<Vec<PatternRule<Architecture>>> = LazyLock::new(|| {
    vec![
        PatternRule::new("individual_user_content", "User-owned content", 0.9)
            .indicates(Architecture::Individual, 1.0)
            .table(one_of(USER_TABLES))
            .table(one_of(CONTENT_TABLES))
            .relationship(one_of(CONTENT_TABLES), one_of(USER_TABLES))
            .excluding(one_of(MEMBERSHIP_TABLES))
            .excluding(exact("teams"))
            .excluding(exact("organizations"))
            .min_matches(2)
            .scoring(ScoringProfile::structural(0.6, 0.4)),
        PatternRule::new("individual_profile_ownership", "Owner columns on content", 0.7)
            .indicates(Architecture::Individual, 0.9)
            .table(one_of(USER_TABLES))
            .column(Some(one_of(CONTENT_TABLES)), one_of(OWNER_COLUMNS))
            .excluding(one_of(MEMBERSHIP_TABLES)),
        PatternRule::new("team_membership", "Team membership tables", 0.9)
            .indicates(Architecture::Team, 1.0)
            .table(one_of(TEAM_TABLES))
            .table(one_of(MEMBERSHIP_TABLES))
            .relationship(one_of(MEMBERSHIP_TABLES), one_of(TEAM_TABLES))
            .min_matches(2)
            .priority(10)
            .scoring(ScoringProfile::structural(0.7, 0.3)),
        PatternRule::new("team_invitations_roles", "Invitations and roles", 0.7)
            .indicates(Architecture::Team, 0.8)
            .indicates(Architecture::Hybrid, 0.2)
            .table(one_of(&["invitations", "team_invitations"]))
            .table(one_of(&["roles", "team_roles"]))
            .table(exact("role_permissions"))
            .min_matches(2),
        PatternRule::new("tenant_scoped_content", "Content scoped by tenant", 0.8)
            .indicates(Architecture::Team, 1.0)
            .column(Some(one_of(CONTENT_TABLES)), one_of(TENANT_COLUMNS))
            .relationship(one_of(CONTENT_TABLES), one_of(TEAM_TABLES)),
        PatternRule::new("personal_and_team_accounts", "Personal and team accounts", 0.95)
            .indicates(Architecture::Hybrid, 1.0)
            .table(exact("accounts"))
            .table(one_of(MEMBERSHIP_TABLES))
            .column(Some(exact("accounts")), exact("is_personal_account"))
            .min_matches(3)
            .priority(30)
            .exclusive(),
        PatternRule::new("dual_ownership_columns", "Personal and tenant ownership", 0.6)
            .indicates(Architecture::Hybrid, 0.8)
            .indicates(Architecture::Team, 0.2)
            .column(Some(one_of(CONTENT_TABLES)), one_of(OWNER_COLUMNS))
            .column(Some(one_of(CONTENT_TABLES)), one_of(TENANT_COLUMNS))
            .min_matches(2)
            .priority(5),
        PatternRule::new("personal_account_slug_check", "Slug rule split by account kind", 0.85)
            .indicates(Architecture::Hybrid, 1.0)
            .constraint(
                ConstraintMatcher::of_kind(ConstraintKind::Check)
                    .on(exact("accounts"))
                    .defined_as(NamePattern::Contains("is_personal_account")),
            )
            .priority(25),
        PatternRule::new("tenant_foreign_keys", "Foreign keys to a tenant", 0.7)
            .indicates(Architecture::Team, 0.9)
            .indicates(Architecture::Hybrid, 0.1)
            .constraint(
                ConstraintMatcher::of_kind(ConstraintKind::ForeignKey)
                    .defined_as(NamePattern::Regex(TENANT_FOREIGN_KEY.clone())),
            ),
        PatternRule::new("membership_key_pair", "Membership keyed by tenant and user", 0.8)
            .indicates(Architecture::Team, 1.0)
            .constraint(
                ConstraintMatcher::any()
                    .on(one_of(MEMBERSHIP_TABLES))
                    .defined_as(NamePattern::Regex(TENANT_USER_PAIR.clone())),
            )
            .priority(10),
    ]
});

/// Rules answering "individual, team or hybrid?".
pub fn architecture_rules() -> &'static [PatternRule<Architecture>] {
    &RULES
}
