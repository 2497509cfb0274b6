//! Rpc descriptors
use std::fmt;

use crate::{
    config::MarshalNames,
    error::ServiceError,
    message::TypeRef,
    naming::to_snake_case,
    validate::{validate, MessageSpec, Role},
};

/// Interaction pattern of an rpc, determined by which sides are streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// 1 request, 1 response
    Unary,
    /// stream of requests, 1 response
    ClientStreaming,
    /// 1 request, stream of responses
    ServerStreaming,
    /// stream of requests, stream of responses
    BidiStreaming,
}

impl MethodKind {
    /// Kind for the given stream flags
    pub fn from_streams(request_streamed: bool, response_streamed: bool) -> Self {
        match (request_streamed, response_streamed) {
            (false, false) => MethodKind::Unary,
            (true, false) => MethodKind::ClientStreaming,
            (false, true) => MethodKind::ServerStreaming,
            (true, true) => MethodKind::BidiStreaming,
        }
    }

    /// True if the client sends a stream
    pub fn client_streams(self) -> bool {
        matches!(self, MethodKind::ClientStreaming | MethodKind::BidiStreaming)
    }

    /// True if the server sends a stream
    pub fn server_streams(self) -> bool {
        matches!(self, MethodKind::ServerStreaming | MethodKind::BidiStreaming)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Unary => write!(f, "unary"),
            MethodKind::ClientStreaming => write!(f, "client streaming"),
            MethodKind::ServerStreaming => write!(f, "server streaming"),
            MethodKind::BidiStreaming => write!(f, "bidi streaming"),
        }
    }
}

/// Type arguments of an rpc registration.
///
/// Implemented for tuples and vectors so that a registration can be written as
/// `(request, response)`. Anything other than exactly two types is rejected
/// when the rpc is registered.
pub trait RpcArgs {
    /// The type arguments in order
    fn into_types(self) -> Vec<TypeRef>;
}

impl RpcArgs for () {
    fn into_types(self) -> Vec<TypeRef> {
        Vec::new()
    }
}

impl<A: Into<TypeRef>> RpcArgs for (A,) {
    fn into_types(self) -> Vec<TypeRef> {
        vec![self.0.into()]
    }
}

impl<A: Into<TypeRef>, B: Into<TypeRef>> RpcArgs for (A, B) {
    fn into_types(self) -> Vec<TypeRef> {
        vec![self.0.into(), self.1.into()]
    }
}

impl RpcArgs for Vec<TypeRef> {
    fn into_types(self) -> Vec<TypeRef> {
        self
    }
}

/// Description of one rpc: its name and its validated request and response types.
///
/// Descriptors are created by [crate::ServiceBuilder::rpc] and never change
/// afterwards.
#[derive(Debug, Clone)]
pub struct RpcDesc {
    name: String,
    method_name: String,
    request: MessageSpec,
    response: MessageSpec,
}

impl RpcDesc {
    /// Validate the type arguments and create a descriptor
    pub fn new(
        name: impl Into<String>,
        args: impl RpcArgs,
        names: &MarshalNames,
    ) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ServiceError::EmptyName);
        }
        let types = args.into_types();
        let [request, response] = <[TypeRef; 2]>::try_from(types).map_err(|types| {
            ServiceError::Arity {
                rpc: name.clone(),
                got: types.len(),
            }
        })?;
        let request = validate(&name, &request, Role::Request, names)?;
        let response = validate(&name, &response, Role::Response, names)?;
        Ok(Self {
            method_name: to_snake_case(&name),
            name,
            request,
            response,
        })
    }

    /// Name of the rpc as declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the method implementing or calling this rpc
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The request side
    pub fn request(&self) -> &MessageSpec {
        &self.request
    }

    /// The response side
    pub fn response(&self) -> &MessageSpec {
        &self.response
    }

    /// The interaction pattern
    pub fn kind(&self) -> MethodKind {
        MethodKind::from_streams(self.request.is_streamed(), self.response.is_streamed())
    }
}
