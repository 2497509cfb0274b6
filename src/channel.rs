//! Channels carry marshalled frames from a [crate::Stub] to a server
//!
//! A [Channel] is the only thing a stub needs from a transport: given an rpc
//! and a stream of request frames, produce the stream of response frames.
//! Real network transports live outside this crate. Two channels are built in:
//! [Disconnected], which every stub starts out with, and [LocalChannel], which
//! dispatches to a [Server] in the same process.
use std::{fmt::Debug, sync::Arc};

use bytes::Bytes;
use futures_lite::StreamExt;

use crate::{desc::RpcDesc, error::Status, server::Server, BoxStream};

/// Transport for stub calls
pub trait Channel: Debug + Send + Sync + 'static {
    /// Start a call of `rpc`, sending `requests` and returning the responses
    fn call(&self, rpc: Arc<RpcDesc>, requests: BoxStream<Bytes>)
        -> BoxStream<Result<Bytes, Status>>;
}

/// Channel of a stub that only knows its host. Every call fails as unavailable.
#[derive(Debug, Clone)]
pub struct Disconnected {
    host: String,
}

impl Disconnected {
    /// A channel for `host` without a transport
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// The host this channel was created for
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Channel for Disconnected {
    fn call(
        &self,
        rpc: Arc<RpcDesc>,
        _requests: BoxStream<Bytes>,
    ) -> BoxStream<Result<Bytes, Status>> {
        tracing::debug!(host = %self.host, rpc = rpc.name(), "call without transport");
        let status = Status::unavailable(format!(
            "no transport to {} for rpc {}",
            self.host,
            rpc.name()
        ));
        futures_lite::stream::once(Err(status)).boxed()
    }
}

/// In process channel dispatching straight into a [Server]
#[derive(Debug, Clone)]
pub struct LocalChannel {
    server: Server,
}

impl LocalChannel {
    /// Channel to `server`
    pub fn new(server: Server) -> Self {
        Self { server }
    }
}

impl Channel for LocalChannel {
    fn call(
        &self,
        rpc: Arc<RpcDesc>,
        requests: BoxStream<Bytes>,
    ) -> BoxStream<Result<Bytes, Status>> {
        self.server.dispatch(rpc.name(), requests)
    }
}
