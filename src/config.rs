//! Per service configuration of capability names
use serde::{Deserialize, Serialize};

/// Default name of the instance level marshal capability
pub const DEFAULT_MARSHAL: &str = "marshal";

/// Default name of the type level unmarshal capability
pub const DEFAULT_UNMARSHAL: &str = "unmarshal";

/// Names under which message types must provide their marshal and unmarshal
/// capabilities.
///
/// Transports that speak in terms of `encode`/`decode` can use
/// [MarshalNames::new] to select those instead of the defaults. Missing fields
/// fall back to the defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalNames {
    /// Name of the instance level serialization function
    pub marshal_instance_method: String,
    /// Name of the type level deserialization function
    pub unmarshal_class_method: String,
}

impl MarshalNames {
    /// Use custom capability names
    pub fn new(marshal: impl Into<String>, unmarshal: impl Into<String>) -> Self {
        Self {
            marshal_instance_method: marshal.into(),
            unmarshal_class_method: unmarshal.into(),
        }
    }
}

impl Default for MarshalNames {
    fn default() -> Self {
        Self::new(DEFAULT_MARSHAL, DEFAULT_UNMARSHAL)
    }
}
