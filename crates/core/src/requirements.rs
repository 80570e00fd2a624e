use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentModel {
    Iaas,
    Paas,
    Saas,
    Containers,
    Serverless,
}

impl DeploymentModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iaas => "IaaS",
            Self::Paas => "PaaS",
            Self::Saas => "SaaS",
            Self::Containers => "containers",
            Self::Serverless => "serverless",
        }
    }
}

impl std::fmt::Display for DeploymentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentModel {
    type Err = SessionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "iaas" => Ok(Self::Iaas),
            "paas" => Ok(Self::Paas),
            "saas" => Ok(Self::Saas),
            "containers" | "container" => Ok(Self::Containers),
            "serverless" => Ok(Self::Serverless),
            other => Err(SessionError::InvalidRequest(format!(
                "unsupported deployment model `{other}` (expected iaas|paas|saas|containers|serverless)"
            ))),
        }
    }
}

/// Structured extraction of a user's migration requirements.
///
/// Produced once per session and refined across turns; a `merge` applies
/// last-write-wins per field, so a later extraction overwrites only the
/// fields it actually set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsRecord {
    pub workload_type: Option<String>,
    pub architecture_layers: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub data_stores: BTreeSet<String>,
    pub deployment_model: Option<DeploymentModel>,
}

impl RequirementsRecord {
    /// True while any of the five fields is still unset.
    pub fn is_partial(&self) -> bool {
        !self.missing_fields().is_empty()
    }

    /// Unset fields, in a stable order usable for clarification prompts.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.workload_type.is_none() {
            missing.push("workload type");
        }
        if self.architecture_layers.is_empty() {
            missing.push("architecture layers");
        }
        if self.languages.is_empty() {
            missing.push("languages and frameworks");
        }
        if self.data_stores.is_empty() {
            missing.push("database and storage types");
        }
        if self.deployment_model.is_none() {
            missing.push("deployment model");
        }
        missing
    }

    /// Last-write-wins per field: `newer` overwrites a field only when it
    /// set that field.
    pub fn merge(&mut self, newer: RequirementsRecord) {
        if newer.workload_type.is_some() {
            self.workload_type = newer.workload_type;
        }
        if !newer.architecture_layers.is_empty() {
            self.architecture_layers = newer.architecture_layers;
        }
        if !newer.languages.is_empty() {
            self.languages = newer.languages;
        }
        if !newer.data_stores.is_empty() {
            self.data_stores = newer.data_stores;
        }
        if newer.deployment_model.is_some() {
            self.deployment_model = newer.deployment_model;
        }
    }
}
