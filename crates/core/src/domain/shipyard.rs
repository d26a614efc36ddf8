//! Shipyard decoding.
//!
//! A shipyard arrives base64-encoded (padding optional) and contains YAML in
//! either the nested `spec.stages` layout or the legacy top-level `stages`
//! layout. Only the structure is interpreted here; execution semantics live
//! elsewhere.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CoreError;

pub const SHIPYARD_KIND: &str = "Shipyard";

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShipyardMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sequence {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipyardStage {
    pub name: String,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShipyardSpec {
    #[serde(default)]
    pub stages: Vec<ShipyardStage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Shipyard {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ShipyardMetadata,
    #[serde(default)]
    pub spec: ShipyardSpec,
}

/// Wire layout accepted on input; folds the legacy top-level `stages` into `spec`.
#[derive(Deserialize)]
struct RawShipyard {
    #[serde(rename = "apiVersion", default)]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: ShipyardMetadata,
    #[serde(default)]
    spec: Option<ShipyardSpec>,
    #[serde(default)]
    stages: Vec<ShipyardStage>,
}

impl From<RawShipyard> for Shipyard {
    fn from(raw: RawShipyard) -> Self {
        let spec = match raw.spec {
            Some(spec) if !spec.stages.is_empty() => spec,
            _ => ShipyardSpec { stages: raw.stages },
        };
        Self {
            api_version: raw.api_version,
            kind: raw.kind,
            metadata: raw.metadata,
            spec,
        }
    }
}

impl Shipyard {
    /// Decode and validate a base64-encoded shipyard.
    pub fn decode(encoded: &str) -> Result<Self, CoreError> {
        let bytes = LENIENT_STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::InvalidShipyard(format!("payload is not valid base64: {}", e)))?;
        let yaml = String::from_utf8(bytes)
            .map_err(|e| CoreError::InvalidShipyard(format!("payload is not UTF-8: {}", e)))?;
        Self::parse_yaml(&yaml)
    }

    /// Parse and validate shipyard YAML.
    pub fn parse_yaml(yaml: &str) -> Result<Self, CoreError> {
        let raw: RawShipyard = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::InvalidShipyard(format!("payload is not valid YAML: {}", e)))?;
        let shipyard = Shipyard::from(raw);
        shipyard.validate()?;
        Ok(shipyard)
    }

    pub fn encode_yaml(yaml: &str) -> String {
        LENIENT_STANDARD.encode(yaml.as_bytes())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.kind.is_empty() && self.kind != SHIPYARD_KIND {
            return Err(CoreError::InvalidShipyard(format!(
                "unexpected kind '{}'",
                self.kind
            )));
        }

        if self.spec.stages.is_empty() {
            return Err(CoreError::InvalidShipyard(
                "at least one stage is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for stage in &self.spec.stages {
            if stage.name.trim().is_empty() {
                return Err(CoreError::InvalidShipyard(
                    "stage name must not be empty".to_string(),
                ));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(CoreError::InvalidShipyard(format!(
                    "duplicate stage '{}'",
                    stage.name
                )));
            }
        }

        Ok(())
    }

    pub fn stages(&self) -> &[ShipyardStage] {
        &self.spec.stages
    }

    /// Stage names in declaration order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.spec.stages.iter().map(|s| s.name.as_str())
    }
}
