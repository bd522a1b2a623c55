#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::common::validate_id;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for PrincipalId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("principal_id", &self.0, 64)
    }
}

/// Role labels supplied by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn parse(label: &str) -> Option<Role> {
        match label {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// The authenticated actor for one request. Resolved by the adapter from
/// the identity collaborator and passed explicitly into every operation;
/// the core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub name: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn v1(
        id: PrincipalId,
        email: impl Into<String>,
        name: impl Into<String>,
        roles: BTreeSet<Role>,
    ) -> Result<Self, ContractViolation> {
        let v = Self {
            id,
            email: email.into(),
            name: name.into(),
            roles,
        };
        v.validate()?;
        Ok(v)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

impl Validate for Principal {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        validate_id("principal.email", &self.email, 256)?;
        if !self.email.contains('@') {
            return Err(ContractViolation::InvalidValue {
                field: "principal.email",
                reason: "must contain '@'",
            });
        }
        validate_id("principal.name", &self.name, 128)?;
        if self.roles.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "principal.roles",
                reason: "must carry at least one role",
            });
        }
        Ok(())
    }
}
