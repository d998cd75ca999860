//! Per-architecture and per-domain default layers and volume tables.

use super::types::ConfigOverrides;
use crate::detection::{Architecture, Domain};

fn strings(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

/// Account layout defaults for an architecture.
pub fn architecture_defaults(architecture: Architecture) -> ConfigOverrides {
    let (users, content, teams, members, team_accounts, personal) = match architecture {
        Architecture::Individual => (10, 8, 0, 0, false, true),
        Architecture::Team => (20, 5, 4, 5, true, false),
        Architecture::Hybrid => (15, 6, 3, 4, true, true),
    };
    ConfigOverrides {
        architecture: Some(architecture),
        user_count: Some(users),
        content_per_user: Some(content),
        teams_count: Some(teams),
        members_per_team: Some(members),
        create_team_accounts: Some(team_accounts),
        create_personal_accounts: Some(personal),
        ..ConfigOverrides::default()
    }
}

/// Content defaults for a domain.
pub fn domain_defaults(domain: Domain) -> ConfigOverrides {
    let base = ConfigOverrides {
        domain: Some(domain),
        ..ConfigOverrides::default()
    };
    match domain {
        Domain::Outdoor => ConfigOverrides {
            content_types: strings(&["gear", "trips", "reviews"]),
            categories: strings(&["camping", "hiking", "climbing", "water-sports"]),
            images_per_content: Some(3),
            enable_real_images: Some(true),
            public_content_ratio: Some(0.8),
            ..base
        },
        Domain::Saas => ConfigOverrides {
            content_types: strings(&["projects", "documents", "tasks"]),
            categories: strings(&["productivity", "analytics", "collaboration"]),
            images_per_content: Some(0),
            enable_real_images: Some(false),
            enable_billing_data: Some(true),
            enable_notifications: Some(true),
            public_content_ratio: Some(0.1),
            ..base
        },
        Domain::Ecommerce => ConfigOverrides {
            content_types: strings(&["products", "reviews", "orders"]),
            categories: strings(&["electronics", "clothing", "home", "sports"]),
            images_per_content: Some(4),
            enable_real_images: Some(true),
            enable_billing_data: Some(true),
            public_content_ratio: Some(1.0),
            ..base
        },
        Domain::Social => ConfigOverrides {
            content_types: strings(&["posts", "comments", "follows"]),
            categories: strings(&["lifestyle", "technology", "travel"]),
            images_per_content: Some(2),
            enable_real_images: Some(false),
            enable_social_features: Some(true),
            enable_notifications: Some(true),
            public_content_ratio: Some(0.9),
            ..base
        },
        Domain::Generic => ConfigOverrides {
            content_types: strings(&["items"]),
            categories: strings(&["general"]),
            images_per_content: Some(1),
            enable_real_images: Some(false),
            public_content_ratio: Some(0.5),
            ..base
        },
    }
}

/// Small, image-free layer used when detection cannot be trusted.
pub fn safe_defaults() -> ConfigOverrides {
    ConfigOverrides {
        user_count: Some(5),
        content_per_user: Some(3),
        images_per_content: Some(0),
        enable_real_images: Some(false),
        create_team_accounts: Some(false),
        create_personal_accounts: Some(true),
        content_types: strings(&["items"]),
        categories: strings(&["general"]),
        ..ConfigOverrides::default()
    }
}

/// Base user count per architecture for optimized runs.
pub fn optimized_user_base(architecture: Architecture) -> u32 {
    match architecture {
        Architecture::Individual => 25,
        Architecture::Team => 40,
        Architecture::Hybrid => 30,
    }
}

/// User count multiplier per domain for optimized runs.
pub fn optimized_user_multiplier(domain: Domain) -> f64 {
    match domain {
        Domain::Social => 1.5,
        Domain::Ecommerce => 1.2,
        Domain::Outdoor | Domain::Saas | Domain::Generic => 1.0,
    }
}

/// Content items per user for optimized runs.
pub fn optimized_content_volume(domain: Domain) -> u32 {
    match domain {
        Domain::Outdoor => 12,
        Domain::Saas => 6,
        Domain::Ecommerce => 15,
        Domain::Social => 20,
        Domain::Generic => 5,
    }
}

/// Volume layer for an optimized run.
pub fn optimized_volumes(architecture: Architecture, domain: Domain) -> ConfigOverrides {
    let users = f64::from(optimized_user_base(architecture)) * optimized_user_multiplier(domain);
    ConfigOverrides {
        user_count: Some(users.round() as u32),
        content_per_user: Some(optimized_content_volume(domain)),
        ..ConfigOverrides::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure::SeedConfiguration;
    use crate::detection::ClassLabel;

    #[test]
    fn test_every_default_layer_is_valid() {
        for architecture in Architecture::ALL {
            for domain in Domain::ALL {
                let config = SeedConfiguration::default()
                    .apply(&architecture_defaults(*architecture))
                    .apply(&domain_defaults(*domain));
                assert!(config.validate().is_ok(), "{} / {}", architecture, domain);
            }
        }
    }

    #[test]
    fn test_optimized_volumes() {
        let volumes = optimized_volumes(Architecture::Team, Domain::Social);
        assert_eq!(volumes.user_count, Some(60));
        assert_eq!(volumes.content_per_user, Some(20));
    }
}
