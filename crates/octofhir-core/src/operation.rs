//! Operation requests built from a tester submission.

use serde::Serialize;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::fhir::{ResourceType, ResourceTypeRegistry};
use crate::fields::{ID_FIELD, METHOD_FIELD, RESOURCE_NAME_FIELD, RawFieldSet, VERSION_ID_FIELD};
use crate::params::{ParameterMap, extract_parameters};

/// The FHIR REST interaction selected by the `method` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    VRead,
    #[serde(rename = "searchType")]
    Search,
}

impl OperationKind {
    /// Parse the submitted discriminator. Matching is exact.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "read" => Some(Self::Read),
            "vread" => Some(Self::VRead),
            "searchType" => Some(Self::Search),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::VRead => "vread",
            Self::Search => "searchType",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated read, vread or type-level search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    kind: OperationKind,
    resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<ParameterMap>,
}

impl OperationRequest {
    pub fn read(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Read,
            resource_type,
            id: Some(id.into()),
            version_id: None,
            params: None,
        }
    }

    pub fn vread(
        resource_type: ResourceType,
        id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: OperationKind::VRead,
            resource_type,
            id: Some(id.into()),
            version_id: Some(version_id.into()),
            params: None,
        }
    }

    pub fn search(resource_type: ResourceType, params: ParameterMap) -> Self {
        Self {
            kind: OperationKind::Search,
            resource_type,
            id: None,
            version_id: None,
            params: Some(params),
        }
    }

    /// Validate a submission and build the request it describes.
    ///
    /// The first failed check is returned; nothing is built for a rejected
    /// submission.
    pub fn from_fields(fields: &RawFieldSet, registry: &ResourceTypeRegistry) -> Result<Self> {
        let method = fields
            .non_blank(METHOD_FIELD)
            .ok_or(CoreError::MissingMethod)?;
        let kind = OperationKind::parse(method).ok_or_else(|| CoreError::invalid_method(method))?;

        match kind {
            OperationKind::Read => {
                let resource_type = resolve_resource_type(fields, registry)?;
                let id = required(fields, ID_FIELD, "ID")?;
                Ok(Self::read(resource_type, id))
            }
            OperationKind::VRead => {
                let resource_type = resolve_resource_type(fields, registry)?;
                let id = required(fields, ID_FIELD, "ID")?;
                let version_id = required(fields, VERSION_ID_FIELD, "Version ID")?;
                Ok(Self::vread(resource_type, id, version_id))
            }
            OperationKind::Search => {
                let resource_type = resolve_resource_type(fields, registry)?;
                Ok(Self::search(resource_type, extract_parameters(fields)))
            }
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    pub fn params(&self) -> Option<&ParameterMap> {
        self.params.as_ref()
    }

    /// Path segments below the server base, e.g. `["Patient", "1", "_history", "2"]`.
    pub fn path_segments(&self) -> Vec<&str> {
        let mut segments = vec![self.resource_type.as_str()];
        if let Some(id) = self.id.as_deref() {
            segments.push(id);
            if let Some(version_id) = self.version_id.as_deref() {
                segments.push("_history");
                segments.push(version_id);
            }
        }
        segments
    }

    /// Search query pairs in parameter order. Empty for read and vread.
    pub fn query_pairs(&self) -> Vec<(&str, String)> {
        self.params
            .iter()
            .flatten()
            .flat_map(|(name, values)| {
                values
                    .iter()
                    .map(move |value| (name.as_str(), value.to_query_value()))
            })
            .collect()
    }
}

fn resolve_resource_type(
    fields: &RawFieldSet,
    registry: &ResourceTypeRegistry,
) -> Result<ResourceType> {
    let name = required(fields, RESOURCE_NAME_FIELD, "resource type")?;
    registry.resolve(name)
}

fn required<'a>(
    fields: &'a RawFieldSet,
    field: &'static str,
    label: &'static str,
) -> Result<&'a str> {
    fields
        .non_blank(field)
        .map(str::trim)
        .ok_or_else(|| CoreError::missing_field(field, label))
}
