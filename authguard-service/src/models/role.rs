//! Role model - the total order the RBAC evaluator compares against.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization-scoped role, ordered from least to most privileged.
///
/// The derived `Ord` follows declaration order, so `Role::Viewer <
/// Role::SuperAdmin` holds and the evaluator can compare roles directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    User,
    Auditor,
    RiskManager,
    ComplianceOfficer,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Roles that bypass the ordered comparison entirely.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Viewer => "viewer",
            Role::User => "user",
            Role::Auditor => "auditor",
            Role::RiskManager => "risk_manager",
            Role::ComplianceOfficer => "compliance_officer",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "user" => Ok(Role::User),
            "auditor" => Ok(Role::Auditor),
            "risk_manager" => Ok(Role::RiskManager),
            "compliance_officer" => Ok(Role::ComplianceOfficer),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Role held by an actor within one organization. Owned by the identity
/// store; this core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub actor_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
}

/// Per-resource/action requirement that replaces the caller-supplied
/// required role when present. Most specific wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub organization_id: Uuid,
    pub resource_type: String,
    pub action: String,
    pub required_role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_total_order() {
        assert!(Role::Viewer < Role::User);
        assert!(Role::User < Role::Auditor);
        assert!(Role::Auditor < Role::RiskManager);
        assert!(Role::RiskManager < Role::ComplianceOfficer);
        assert!(Role::ComplianceOfficer < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [
            Role::Viewer,
            Role::User,
            Role::Auditor,
            Role::RiskManager,
            Role::ComplianceOfficer,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_only_admin_roles_bypass() {
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::ComplianceOfficer.is_admin());
    }
}
