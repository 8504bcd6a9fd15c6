//! Agent roles
//!
//! A role is a fixed named viewpoint (prosecution, defense, bench, ...) used
//! to produce one independent analysis of the same query. Roles are static
//! data; only the provider a role calls can be overridden by configuration.

mod personas;

use cocounsel_common::config::OrchestrationConfig;
use cocounsel_common::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider every built-in role prefers
pub const DEFAULT_ROLE_PROVIDER: &str = "cerebras";

/// Role identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Prosecutor,
    Defense,
    Judge,
    JuryAnalyst,
    Appellate,
    Scholar,
    Scribe,
    Analyst,
}

impl RoleId {
    pub const ALL: [RoleId; 8] = [
        RoleId::Prosecutor,
        RoleId::Defense,
        RoleId::Judge,
        RoleId::JuryAnalyst,
        RoleId::Appellate,
        RoleId::Scholar,
        RoleId::Scribe,
        RoleId::Analyst,
    ];

    /// Roles used when a caller names none
    pub const DEFAULT_SET: [RoleId; 4] = [
        RoleId::Prosecutor,
        RoleId::Defense,
        RoleId::Judge,
        RoleId::Analyst,
    ];

    /// Roles that attack a defense plan
    pub const RED_TEAM: [RoleId; 3] = [RoleId::Prosecutor, RoleId::Judge, RoleId::JuryAnalyst];

    /// Roles behind a quick analysis
    pub const QUICK: [RoleId; 3] = [RoleId::Prosecutor, RoleId::Defense, RoleId::Judge];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::Prosecutor => "prosecutor",
            RoleId::Defense => "defense",
            RoleId::Judge => "judge",
            RoleId::JuryAnalyst => "jury_analyst",
            RoleId::Appellate => "appellate",
            RoleId::Scholar => "scholar",
            RoleId::Scribe => "scribe",
            RoleId::Analyst => "analyst",
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleId::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::Validation {
                message: format!("unknown role '{s}'"),
                field: Some("roles".to_string()),
            })
    }
}

/// A role with its persona and the provider it calls
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRole {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub system_prompt: String,
    pub provider_id: String,
}

/// All roles, in declaration order
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<AgentRole>,
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self {
            roles: personas::PERSONAS
                .iter()
                .map(|p| AgentRole {
                    id: p.id,
                    name: p.name.to_string(),
                    description: p.description.to_string(),
                    system_prompt: p.system_prompt.to_string(),
                    provider_id: DEFAULT_ROLE_PROVIDER.to_string(),
                })
                .collect(),
        }
    }
}

impl RoleRegistry {
    /// Built-in roles with `role_providers` overrides applied
    pub fn from_config(config: &OrchestrationConfig) -> Self {
        let mut registry = Self::default();
        for role in &mut registry.roles {
            if let Some(provider) = config.role_providers.get(role.id.as_str()) {
                role.provider_id = provider.clone();
            }
        }
        registry
    }

    pub fn with_provider(mut self, id: RoleId, provider_id: impl Into<String>) -> Self {
        let provider_id = provider_id.into();
        for role in self.roles.iter_mut().filter(|r| r.id == id) {
            role.provider_id = provider_id.clone();
        }
        self
    }

    pub fn list(&self) -> &[AgentRole] {
        &self.roles
    }

    pub fn get(&self, id: RoleId) -> Option<&AgentRole> {
        self.roles.iter().find(|r| r.id == id)
    }
}
