//! Message types and their marshal/unmarshal capabilities
//!
//! A message type advertises what it can do through a [Capabilities] table:
//! named instance level marshal functions and named type level unmarshal
//! functions. Which names a service looks for is configured per service, see
//! [crate::MarshalNames]. The table is probed once, when an rpc using the type
//! is registered.
use std::{
    any::{type_name, Any, TypeId},
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use bytes::Bytes;

use crate::error::CodecError;

/// A type erased message, as produced by an unmarshal function
pub type AnyMessage = Box<dyn Any + Send>;

pub(crate) type MarshalFn = Arc<dyn Fn(&dyn Any) -> Result<Bytes, CodecError> + Send + Sync>;
pub(crate) type UnmarshalFn = Arc<dyn Fn(&[u8]) -> Result<AnyMessage, CodecError> + Send + Sync>;

/// Named marshal and unmarshal functions of a message type.
#[derive(Clone, Default)]
pub struct Capabilities {
    marshal: BTreeMap<String, MarshalFn>,
    unmarshal: BTreeMap<String, UnmarshalFn>,
}

impl Capabilities {
    /// An empty table. A type with an empty table can not be used in any rpc.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an infallible instance level marshal function under `name`
    pub fn marshal<T, F, B>(self, name: impl Into<String>, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> B + Send + Sync + 'static,
        B: Into<Bytes>,
    {
        self.try_marshal(name, move |value: &T| {
            Ok::<_, std::convert::Infallible>(f(value))
        })
    }

    /// Add a fallible instance level marshal function under `name`
    pub fn try_marshal<T, F, B, E>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<B, E> + Send + Sync + 'static,
        B: Into<Bytes>,
        E: fmt::Display,
    {
        let erased: MarshalFn = Arc::new(move |value: &dyn Any| -> Result<Bytes, CodecError> {
            let value = value
                .downcast_ref::<T>()
                .ok_or(CodecError::TypeMismatch {
                    expected: type_name::<T>(),
                })?;
            f(value)
                .map(Into::into)
                .map_err(|cause| CodecError::Marshal(cause.to_string()))
        });
        self.marshal.insert(name.into(), erased);
        self
    }

    /// Add a type level unmarshal function under `name`
    pub fn unmarshal<T, F, E>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Any + Send,
        F: Fn(&[u8]) -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let erased: UnmarshalFn = Arc::new(move |bytes: &[u8]| -> Result<AnyMessage, CodecError> {
            f(bytes)
                .map(|value| Box::new(value) as AnyMessage)
                .map_err(|cause| CodecError::Unmarshal(cause.to_string()))
        });
        self.unmarshal.insert(name.into(), erased);
        self
    }

    /// Capabilities under the default names, using postcard on the serde impls of `T`
    #[cfg(feature = "postcard")]
    #[cfg_attr(rpcservice_docsrs, doc(cfg(feature = "postcard")))]
    pub fn postcard<T>() -> Self
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Any + Send,
    {
        Self::new()
            .try_marshal(crate::config::DEFAULT_MARSHAL, |value: &T| {
                postcard::to_stdvec(value)
            })
            .unmarshal(crate::config::DEFAULT_UNMARSHAL, |bytes: &[u8]| {
                postcard::from_bytes::<T>(bytes)
            })
    }

    /// True if there is a marshal function called `name`
    pub fn has_marshal(&self, name: &str) -> bool {
        self.marshal.contains_key(name)
    }

    /// True if there is an unmarshal function called `name`
    pub fn has_unmarshal(&self, name: &str) -> bool {
        self.unmarshal.contains_key(name)
    }

    pub(crate) fn marshal_fn(&self, name: &str) -> Option<MarshalFn> {
        self.marshal.get(name).cloned()
    }

    pub(crate) fn unmarshal_fn(&self, name: &str) -> Option<UnmarshalFn> {
        self.unmarshal.get(name).cloned()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("marshal", &self.marshal.keys().collect::<Vec<_>>())
            .field("unmarshal", &self.unmarshal.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A type that can be named in an rpc.
///
/// The default implementation advertises no capabilities, which makes the type
/// usable as a type argument but rejected at registration.
pub trait Message: Any + Send + Sized {
    /// The capabilities of this type
    fn capabilities() -> Capabilities {
        Capabilities::new()
    }
}

/// Reference to a message type together with its probed capabilities
#[derive(Clone)]
pub struct MessageType {
    name: &'static str,
    id: TypeId,
    capabilities: Arc<Capabilities>,
}

impl MessageType {
    /// Probe the capabilities of `T`
    pub fn of<T: Message>() -> Self {
        Self::with_capabilities::<T>(T::capabilities())
    }

    /// A reference to a type that does not implement [Message], with an
    /// explicitly given capability table
    pub fn with_capabilities<T: Any>(capabilities: Capabilities) -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            capabilities: Arc::new(capabilities),
        }
    }

    /// A reference to an arbitrary type without any capabilities
    pub fn opaque<T: Any>() -> Self {
        Self::with_capabilities::<T>(Capabilities::new())
    }

    /// Rust name of the type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type id of the type
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// True if this refers to `T`
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// The probed capabilities
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

/// A type argument of an rpc: a message type, possibly marked as streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    message: MessageType,
    streamed: bool,
}

impl TypeRef {
    /// The referenced message type
    pub fn message(&self) -> &MessageType {
        &self.message
    }

    /// True if a sequence of messages is transmitted instead of a single one
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }
}

impl From<MessageType> for TypeRef {
    fn from(message: MessageType) -> Self {
        Self {
            message,
            streamed: false,
        }
    }
}

/// Type argument for a single message of type `T`
pub fn msg<T: Message>() -> TypeRef {
    MessageType::of::<T>().into()
}

/// Mark a type argument as a stream of messages
pub fn stream(ty: impl Into<TypeRef>) -> TypeRef {
    TypeRef {
        streamed: true,
        ..ty.into()
    }
}
