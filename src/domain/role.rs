use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role. The four `User*` variants are membership tiers; `Trainer`
/// and `Admin` are staff roles outside the tier ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    UserBronze,
    UserGold,
    UserPlatinum,
    Trainer,
    Admin,
}

/// Membership tiers from least to most privileged. Position is the rank.
pub const TIER_ORDER: [Role; 4] = [
    Role::User,
    Role::UserBronze,
    Role::UserGold,
    Role::UserPlatinum,
];

pub const ALL_ROLES: [Role; 6] = [
    Role::User,
    Role::UserBronze,
    Role::UserGold,
    Role::UserPlatinum,
    Role::Trainer,
    Role::Admin,
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::UserBronze => "USER_BRONZE",
            Role::UserGold => "USER_GOLD",
            Role::UserPlatinum => "USER_PLATINUM",
            Role::Trainer => "TRAINER",
            Role::Admin => "ADMIN",
        }
    }

    /// Rank within the membership tiers, `None` for staff roles.
    pub fn tier_rank(&self) -> Option<usize> {
        TIER_ORDER.iter().position(|tier| tier == self)
    }

    pub fn is_tier(&self) -> bool {
        self.tier_rank().is_some()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_ROLES
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Whether a user holding `actual` meets a class gated on `required`.
///
/// Only tier roles are comparable. Staff roles never satisfy a tier
/// requirement and are never a valid requirement themselves.
pub fn role_satisfies(actual: Role, required: Role) -> bool {
    match (actual.tier_rank(), required.tier_rank()) {
        (Some(have), Some(need)) => have >= need,
        _ => false,
    }
}

pub fn tier_list() -> String {
    TIER_ORDER
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a `requiredRole` value for a class. Rejects staff roles and
/// unknown tokens.
pub fn parse_required_role(raw: &str) -> Result<Role, String> {
    match raw.parse::<Role>() {
        Ok(role) if role.is_tier() => Ok(role),
        _ => Err(format!("requiredRole must be one of {}.", tier_list())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_tiers_satisfy_lower_requirements() {
        assert!(role_satisfies(Role::UserPlatinum, Role::UserGold));
        assert!(role_satisfies(Role::UserGold, Role::UserGold));
        assert!(role_satisfies(Role::UserGold, Role::UserBronze));
        assert!(!role_satisfies(Role::UserBronze, Role::UserGold));
        assert!(!role_satisfies(Role::User, Role::UserGold));
    }

    #[test]
    fn every_tier_satisfies_plain_user() {
        for tier in TIER_ORDER {
            assert!(role_satisfies(tier, Role::User));
        }
    }

    #[test]
    fn staff_roles_are_outside_the_ordering() {
        assert!(!role_satisfies(Role::Admin, Role::User));
        assert!(!role_satisfies(Role::Trainer, Role::UserBronze));
        assert!(!role_satisfies(Role::UserPlatinum, Role::Admin));
        assert_eq!(Role::Trainer.tier_rank(), None);
    }

    #[test]
    fn required_role_rejects_staff_and_unknown_tokens() {
        assert_eq!(parse_required_role("USER_GOLD"), Ok(Role::UserGold));
        for bad in ["ADMIN", "TRAINER", "user_gold", "DIAMOND", ""] {
            let err = parse_required_role(bad).unwrap_err();
            assert!(err.contains("must be one of"), "{bad}: {err}");
        }
    }

    #[test]
    fn roles_round_trip_through_strings() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(
            serde_json::to_string(&Role::UserPlatinum).unwrap(),
            "\"USER_PLATINUM\""
        );
    }
}
