//! Errors for service definition, dispatch and client calls
use std::{error, fmt};

use crate::{desc::MethodKind, validate::Role};

/// Which half of the capability pair is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Instance level serialization, `&T -> bytes`
    Marshal,
    /// Type level deserialization, `bytes -> T`
    Unmarshal,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Marshal => write!(f, "marshal"),
            Capability::Unmarshal => write!(f, "unmarshal"),
        }
    }
}

/// Error when registering an rpc on a service.
///
/// All variants are raised synchronously by [crate::ServiceBuilder::rpc]. A
/// failed registration never leaves a descriptor behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The rpc was not given exactly a request and a response type
    Arity {
        /// Name of the rpc
        rpc: String,
        /// Number of type arguments that were given
        got: usize,
    },
    /// A message type lacks a marshal or unmarshal capability under the configured name
    MissingCapability {
        /// Name of the rpc
        rpc: String,
        /// Whether the request or the response type is at fault
        role: Role,
        /// Rust name of the message type
        type_name: &'static str,
        /// The missing half of the pair
        capability: Capability,
        /// The name that was looked up
        method: String,
    },
    /// The rpc name was already registered on this builder
    DuplicateRpc {
        /// Name of the rpc
        rpc: String,
    },
    /// The rpc name maps to the same method name as another rpc of the service
    MethodNameCollision {
        /// Name of the rpc being registered
        rpc: String,
        /// Name of the already registered rpc
        existing: String,
        /// The shared method name
        method: String,
    },
    /// The rpc name is empty
    EmptyName,
}

impl ServiceError {
    /// True for errors caused by malformed rpc arguments, as opposed to
    /// naming conflicts.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Arity { .. } | ServiceError::MissingCapability { .. }
        )
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Arity { rpc, got } => write!(
                f,
                "rpc {rpc} needs a request and a response type, got {got} type argument(s)"
            ),
            ServiceError::MissingCapability {
                rpc,
                role,
                type_name,
                capability,
                method,
            } => write!(
                f,
                "{role} type {type_name} of rpc {rpc} has no {capability} method named `{method}`"
            ),
            ServiceError::DuplicateRpc { rpc } => write!(f, "rpc {rpc} is already registered"),
            ServiceError::MethodNameCollision {
                rpc,
                existing,
                method,
            } => write!(f, "rpc {rpc} and rpc {existing} both map to method {method}"),
            ServiceError::EmptyName => write!(f, "rpc name cannot be empty"),
        }
    }
}

impl error::Error for ServiceError {}

/// A service does not define a method for some of its rpcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteService {
    /// Name of the service
    pub service: String,
    /// Rpc names without a method, sorted
    pub missing: Vec<String>,
}

impl fmt::Display for IncompleteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service {} does not implement rpc(s): {}",
            self.service,
            self.missing.join(", ")
        )
    }
}

impl error::Error for IncompleteService {}

/// Error from a marshal or unmarshal function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value handed to a marshaller is not of the type it was built for
    TypeMismatch {
        /// Type the marshaller expects
        expected: &'static str,
    },
    /// The marshal function failed
    Marshal(String),
    /// The unmarshal function failed
    Unmarshal(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TypeMismatch { expected } => {
                write!(f, "value is not of the expected type {expected}")
            }
            CodecError::Marshal(cause) => write!(f, "marshal failed: {cause}"),
            CodecError::Unmarshal(cause) => write!(f, "unmarshal failed: {cause}"),
        }
    }
}

impl error::Error for CodecError {}

/// Status code of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The request could not be read or was of the wrong shape
    InvalidArgument,
    /// No method for the rpc on the server
    Unimplemented,
    /// No transport to reach the server
    Unavailable,
    /// Failure inside the handler
    Internal,
}

/// Status returned by handlers and channels when a call fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    /// Create a status with the given code and message
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Request could not be read
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// No handler for the rpc
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    /// Server can not be reached
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// Handler failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// The status code
    pub fn code(&self) -> Code {
        self.code
    }

    /// The status message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl error::Error for Status {}

impl From<CodecError> for Status {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Unmarshal(_) | CodecError::TypeMismatch { .. } => {
                Status::invalid_argument(err.to_string())
            }
            CodecError::Marshal(_) => Status::internal(err.to_string()),
        }
    }
}

/// Client error. All typed [crate::Stub] calls return a `Result` with this error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The stub has no method of this name
    UnknownMethod(String),
    /// The method exists but has a different interaction pattern
    KindMismatch {
        /// Name of the method
        method: String,
        /// Kind of the rpc
        expected: MethodKind,
        /// Kind of the attempted call
        actual: MethodKind,
    },
    /// The request or response type of the call does not match the rpc
    TypeMismatch {
        /// Name of the method
        method: String,
        /// Rust type from the descriptor
        expected: &'static str,
        /// Rust type used for the call
        actual: &'static str,
    },
    /// Marshalling the request or unmarshalling the response failed
    Codec(CodecError),
    /// The server or channel reported a failure
    Status(Status),
    /// Server closed the stream before sending a response
    EarlyClose,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::UnknownMethod(method) => write!(f, "no method {method} on this stub"),
            ClientError::KindMismatch {
                method,
                expected,
                actual,
            } => write!(f, "{method} is a {expected} rpc, called as {actual}"),
            ClientError::TypeMismatch {
                method,
                expected,
                actual,
            } => write!(f, "{method} expects {expected}, got {actual}"),
            ClientError::Codec(err) => write!(f, "{err}"),
            ClientError::Status(status) => write!(f, "{status}"),
            ClientError::EarlyClose => write!(f, "server closed the call before responding"),
        }
    }
}

impl error::Error for ClientError {}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        ClientError::Codec(err)
    }
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        ClientError::Status(status)
    }
}
