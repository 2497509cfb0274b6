//! Declarative rpc service definitions
//!
//! A service is declared as a set of named rpcs. Each rpc names a request and a
//! response message type, either of which can be wrapped in [stream] to mark a
//! sequence of messages instead of a single one. This gives the four familiar
//! interaction patterns:
//!
//! - unary: 1 request, 1 response
//! - client streaming: stream of requests, 1 response
//! - server streaming: 1 request, stream of responses
//! - bidi streaming: stream of requests, stream of responses
//!
//! Every message type has to provide a marshal capability (instance to bytes)
//! and an unmarshal capability (bytes to instance) under the names configured
//! for the service. This is checked when the rpc is registered, not when it is
//! first called.
//!
//! From a finished [ServiceDef] you can derive a client [StubClass] with one
//! call method per rpc, and check that a server side [Handlers] table
//! implements every rpc.
//!
//! # Example
//! ```
//! # fn example() -> Result<(), rpc_service::ServiceError> {
//! use rpc_service::{msg, stream, Capabilities, Message, ServiceBuilder};
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! impl Message for Ping {
//!     fn capabilities() -> Capabilities {
//!         Capabilities::new()
//!             .marshal("marshal", |_: &Ping| Vec::new())
//!             .unmarshal("unmarshal", |_: &[u8]| Ok::<_, std::convert::Infallible>(Ping))
//!     }
//! }
//!
//! let mut builder = ServiceBuilder::new("PingService");
//! builder
//!     .rpc("Ping", (msg::<Ping>(), msg::<Ping>()))?
//!     .rpc("PingMany", (msg::<Ping>(), stream(msg::<Ping>())))?;
//! let service = builder.build();
//!
//! let stubs = service.rpc_stub_class();
//! assert!(stubs.has_method("ping"));
//! assert!(stubs.has_method("ping_many"));
//! let _client = stubs.new_stub("localhost:4242");
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(rpcservice_docsrs, feature(doc_cfg))]
pub mod channel;
pub mod config;
pub mod desc;
pub mod error;
pub mod handler;
mod macros;
pub mod message;
pub mod naming;
pub mod server;
pub mod service;
pub mod stub;
pub mod validate;

pub use channel::{Channel, Disconnected, LocalChannel};
pub use config::MarshalNames;
pub use desc::{MethodKind, RpcArgs, RpcDesc};
pub use error::{Capability, ClientError, Code, CodecError, IncompleteService, ServiceError, Status};
pub use handler::Handlers;
pub use message::{msg, stream, AnyMessage, Capabilities, Message, MessageType, TypeRef};
pub use naming::to_snake_case;
pub use server::Server;
pub use service::{ServiceBuilder, ServiceDef};
pub use stub::{Stub, StubClass, StubMethod};
pub use validate::{validate, Marshaller, MessageSpec, Role};

/// Boxed, sendable stream of items, as used on both sides of a call.
pub type BoxStream<T> = futures_util::stream::BoxStream<'static, T>;
