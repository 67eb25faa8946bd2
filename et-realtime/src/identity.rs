//! Caller identity sent in the authentication frame.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use et_core::constants::roles;

/// Marketplace role of the connected user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Shipper,
    Carrier,
    Broker,
    Driver,
    Dispatch,
    Escort,
    TerminalManager,
    ComplianceOfficer,
    SafetyManager,
    Admin,
    SuperAdmin,
    /// A role this client has no subscription rules for.
    Other(String),
}

impl Role {
    /// Parse a role identifier, case-insensitively.
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            roles::SHIPPER => Role::Shipper,
            roles::CARRIER => Role::Carrier,
            roles::BROKER => Role::Broker,
            roles::DRIVER => Role::Driver,
            roles::DISPATCH => Role::Dispatch,
            roles::ESCORT => Role::Escort,
            roles::TERMINAL_MANAGER => Role::TerminalManager,
            roles::COMPLIANCE_OFFICER => Role::ComplianceOfficer,
            roles::SAFETY_MANAGER => Role::SafetyManager,
            roles::ADMIN => Role::Admin,
            roles::SUPER_ADMIN => Role::SuperAdmin,
            _ => Role::Other(s.trim().to_string()),
        }
    }

    /// Identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Shipper => roles::SHIPPER,
            Role::Carrier => roles::CARRIER,
            Role::Broker => roles::BROKER,
            Role::Driver => roles::DRIVER,
            Role::Dispatch => roles::DISPATCH,
            Role::Escort => roles::ESCORT,
            Role::TerminalManager => roles::TERMINAL_MANAGER,
            Role::ComplianceOfficer => roles::COMPLIANCE_OFFICER,
            Role::SafetyManager => roles::SAFETY_MANAGER,
            Role::Admin => roles::ADMIN,
            Role::SuperAdmin => roles::SUPER_ADMIN,
            Role::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Role::from_name(&name))
    }
}

/// Who the client authenticates as.
///
/// Stored by the client on `connect` and replayed on every reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            company_id: None,
        }
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.company_id {
            Some(company) => write!(f, "{} ({}, company {company})", self.user_id, self.role),
            None => write!(f, "{} ({})", self.user_id, self.role),
        }
    }
}
