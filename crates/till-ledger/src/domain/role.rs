//! Session roles handed over by the authentication collaborator.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::errors::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Cashier,
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Sell,
    RecordCash,
    ManageProducts,
    ViewReports,
    Reconcile,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Sell => "sell",
            Action::RecordCash => "record cash movements",
            Action::ManageProducts => "manage products",
            Action::ViewReports => "view reports",
            Action::Reconcile => "reconcile inventory",
        }
    }
}

impl Role {
    pub fn allows(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Cashier => matches!(action, Action::Sell | Action::RecordCash),
        }
    }

    pub fn authorize(&self, action: Action) -> LedgerResult<()> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(LedgerError::PermissionDenied {
                role: *self,
                action: action.as_str(),
            })
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Cashier => write!(f, "cashier"),
        }
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            other => Err(LedgerError::InvalidField {
                field: "role",
                reason: format!("expected admin or cashier, got {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cashier_permissions() {
        assert!(Role::Cashier.authorize(Action::Sell).is_ok());
        assert!(Role::Cashier.authorize(Action::RecordCash).is_ok());
        assert!(matches!(
            Role::Cashier.authorize(Action::ManageProducts),
            Err(LedgerError::PermissionDenied { .. })
        ));
        assert!(Role::Cashier.authorize(Action::ViewReports).is_err());
    }

    #[test]
    fn test_admin_allows_everything() {
        for action in [
            Action::Sell,
            Action::RecordCash,
            Action::ManageProducts,
            Action::ViewReports,
            Action::Reconcile,
        ] {
            assert!(Role::Admin.allows(action));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}
