//! Registration time validation of rpc type arguments
use std::{
    any::{type_name, Any},
    fmt,
};

use bytes::Bytes;

use crate::{
    config::MarshalNames,
    error::{Capability, CodecError, ServiceError},
    message::{AnyMessage, MarshalFn, MessageType, TypeRef, UnmarshalFn},
};

/// Position of a type argument within an rpc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The type sent by the client
    Request,
    /// The type sent by the server
    Response,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Request => write!(f, "request"),
            Role::Response => write!(f, "response"),
        }
    }
}

/// The marshal and unmarshal functions resolved for one message type.
///
/// This is the adapter that everything downstream of registration uses, so the
/// configured names are only looked up once.
#[derive(Clone)]
pub struct Marshaller {
    message: MessageType,
    marshal: MarshalFn,
    unmarshal: UnmarshalFn,
}

impl Marshaller {
    /// The message type this marshaller is for
    pub fn message(&self) -> &MessageType {
        &self.message
    }

    /// Serialize a value
    ///
    /// Fails with [CodecError::TypeMismatch] if `value` is not of the message type.
    pub fn marshal<T: Any>(&self, value: &T) -> Result<Bytes, CodecError> {
        (self.marshal)(value)
    }

    /// Serialize a type erased value
    pub fn marshal_any(&self, value: &dyn Any) -> Result<Bytes, CodecError> {
        (self.marshal)(value)
    }

    /// Deserialize into a type erased value
    pub fn unmarshal_any(&self, bytes: &[u8]) -> Result<AnyMessage, CodecError> {
        (self.unmarshal)(bytes)
    }

    /// Deserialize into a `T`
    pub fn unmarshal<T: Any>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let value = self.unmarshal_any(bytes)?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| CodecError::TypeMismatch {
                expected: self.message.name(),
            })
    }
}

impl fmt::Debug for Marshaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Marshaller").field(&self.message).finish()
    }
}

/// A validated type argument
#[derive(Debug, Clone)]
pub struct MessageSpec {
    marshaller: Marshaller,
    streamed: bool,
}

impl MessageSpec {
    /// The resolved marshal/unmarshal functions
    pub fn marshaller(&self) -> &Marshaller {
        &self.marshaller
    }

    /// The message type
    pub fn message(&self) -> &MessageType {
        self.marshaller.message()
    }

    /// True if this side of the rpc is a stream
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    /// True if the message type is `T`
    pub fn is<T: Any>(&self) -> bool {
        self.message().is::<T>()
    }

    pub(crate) fn check_type<T: Any>(&self, method: &str) -> Result<(), crate::ClientError> {
        if self.is::<T>() {
            Ok(())
        } else {
            Err(crate::ClientError::TypeMismatch {
                method: method.to_string(),
                expected: self.message().name(),
                actual: type_name::<T>(),
            })
        }
    }
}

/// Check that a type argument provides both capabilities under the configured names.
///
/// The stream marker is transparent: a streamed type is validated like the
/// type it wraps. `rpc` is only used to label errors.
pub fn validate(
    rpc: &str,
    ty: &TypeRef,
    role: Role,
    names: &MarshalNames,
) -> Result<MessageSpec, ServiceError> {
    let message = ty.message();
    tracing::trace!(rpc, %role, ty = message.name(), "validating type argument");
    let missing = |capability, method: &str| ServiceError::MissingCapability {
        rpc: rpc.to_string(),
        role,
        type_name: message.name(),
        capability,
        method: method.to_string(),
    };
    let caps = message.capabilities();
    let marshal = caps
        .marshal_fn(&names.marshal_instance_method)
        .ok_or_else(|| missing(Capability::Marshal, &names.marshal_instance_method))?;
    let unmarshal = caps
        .unmarshal_fn(&names.unmarshal_class_method)
        .ok_or_else(|| missing(Capability::Unmarshal, &names.unmarshal_class_method))?;
    Ok(MessageSpec {
        marshaller: Marshaller {
            message: message.clone(),
            marshal,
            unmarshal,
        },
        streamed: ty.is_streamed(),
    })
}
