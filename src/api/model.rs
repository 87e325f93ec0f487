use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account roles known to the backend. The wire format is the
/// `ROLE_`-prefixed string used by the authorization layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_HR")]
    Hr,
    #[serde(rename = "ROLE_MANAGER")]
    Manager,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_SUPER_ADMIN")]
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Hr => "ROLE_HR",
            Role::Manager => "ROLE_MANAGER",
            Role::Admin => "ROLE_ADMIN",
            Role::SuperAdmin => "ROLE_SUPER_ADMIN",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ROLE_USER" | "USER" => Some(Role::User),
            "ROLE_HR" | "HR" => Some(Role::Hr),
            "ROLE_MANAGER" | "MANAGER" => Some(Role::Manager),
            "ROLE_ADMIN" | "ADMIN" => Some(Role::Admin),
            "ROLE_SUPER_ADMIN" | "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a role is allowed to do in the directory. Derived in exactly one
/// place so visibility rules never drift between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

pub fn capabilities_for(role: Role) -> Capabilities {
    Capabilities {
        can_read: true,
        can_create: matches!(role, Role::Admin | Role::SuperAdmin),
        can_update: matches!(role, Role::Manager | Role::Admin | Role::SuperAdmin),
        can_delete: matches!(role, Role::SuperAdmin),
    }
}

impl Role {
    pub fn is_admin(self) -> bool {
        capabilities_for(self).can_create
    }

    pub fn is_manager(self) -> bool {
        capabilities_for(self).can_update
    }

    pub fn is_user(self) -> bool {
        capabilities_for(self).can_read
    }
}

/// A user account as returned by the backend. Wire format is camelCase;
/// the lock flag was renamed from `isNotLocked` to `notLocked` between
/// backend versions, so the old name is still accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub join_date: Option<DateTime<Utc>>,
    #[serde(alias = "lastLoginDateDisplay")]
    pub login_date_display: Option<DateTime<Utc>>,
    pub profile_image_url: Option<String>,
    pub enabled: bool,
    #[serde(rename = "notLocked", alias = "isNotLocked")]
    pub not_locked: bool,
    pub role: Role,
    pub authorities: Vec<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        capabilities_for(self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_name() {
        for role in [
            Role::User,
            Role::Hr,
            Role::Manager,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            assert_eq!(Role::from_name(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_name("manager"), Some(Role::Manager));
        assert_eq!(Role::from_name("ROLE_WIZARD"), None);
    }

    #[test]
    fn capabilities_are_cumulative() {
        assert!(!capabilities_for(Role::User).can_update);
        assert!(!capabilities_for(Role::Hr).can_create);
        assert!(capabilities_for(Role::Manager).can_update);
        assert!(!capabilities_for(Role::Manager).can_create);
        assert!(capabilities_for(Role::Admin).can_create);
        assert!(!capabilities_for(Role::Admin).can_delete);
        assert!(capabilities_for(Role::SuperAdmin).can_delete);
    }

    #[test]
    fn admin_counts_as_manager_and_user() {
        assert!(Role::Admin.is_admin());
        assert!(Role::Admin.is_manager());
        assert!(Role::Admin.is_user());
        assert!(!Role::Hr.is_manager());
    }

    #[test]
    fn user_accepts_both_lock_flag_spellings() {
        let new_style: User =
            serde_json::from_str(r#"{"username":"jo","notLocked":true,"role":"ROLE_USER"}"#)
                .unwrap();
        assert!(new_style.not_locked);

        let old_style: User =
            serde_json::from_str(r#"{"username":"jo","isNotLocked":true,"role":"ROLE_USER"}"#)
                .unwrap();
        assert!(old_style.not_locked);
    }

    #[test]
    fn user_serializes_canonical_lock_flag_name() {
        let user = User {
            username: "jo".to_string(),
            not_locked: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"notLocked\":true"));
        assert!(!json.contains("isNotLocked"));
    }

    #[test]
    fn login_date_parses_from_either_wire_name() {
        let current: User = serde_json::from_str(
            r#"{"username":"jo","loginDateDisplay":"2026-01-02T03:04:05Z","role":"ROLE_USER"}"#,
        )
        .unwrap();
        assert!(current.login_date_display.is_some());

        let legacy: User = serde_json::from_str(
            r#"{"username":"jo","lastLoginDateDisplay":"2026-01-02T03:04:05Z","role":"ROLE_USER"}"#,
        )
        .unwrap();
        assert_eq!(legacy.login_date_display, current.login_date_display);

        let json = serde_json::to_string(&current).unwrap();
        assert!(json.contains("\"loginDateDisplay\""));
        assert!(!json.contains("lastLoginDateDisplay"));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let user = User {
            username: "jdoe".to_string(),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "jdoe");

        let named = User {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            username: "jdoe".to_string(),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "Jane Doe");
    }
}
