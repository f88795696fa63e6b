pub mod error;
pub mod fhir;
pub mod fields;
pub mod highlight;
pub mod operation;
pub mod params;

pub use error::{CoreError, ErrorCategory, Result};
pub use fhir::{ResourceType, ResourceTypeRegistry, is_valid_resource_type_name};
pub use fields::RawFieldSet;
pub use highlight::HighlightClass;
pub use operation::{OperationKind, OperationRequest};
pub use params::{FieldKey, ParameterExtractor, ParameterMap, QueryParameter, extract_parameters};
