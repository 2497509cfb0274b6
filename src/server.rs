//! Server side dispatch
//!
//! The main entry point is [Server]. A server pairs a [ServiceDef] with a
//! complete [Handlers] table and turns marshalled request frames into
//! marshalled response frames.
use std::{fmt, sync::Arc};

use bytes::Bytes;
use futures_util::{future, stream, StreamExt};

use crate::{
    desc::RpcDesc,
    error::{IncompleteService, Status},
    handler::{Handler, Handlers},
    message::AnyMessage,
    service::ServiceDef,
    BoxStream,
};

/// A service definition together with the methods implementing it
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    service: ServiceDef,
    handlers: Handlers,
}

impl Server {
    /// Create a server, checking that every rpc has a method
    pub fn new(service: ServiceDef, handlers: Handlers) -> Result<Self, IncompleteService> {
        service.assert_rpc_descs_have_methods(&handlers)?;
        tracing::debug!(
            service = service.name(),
            rpcs = service.rpc_descs().len(),
            "server ready"
        );
        Ok(Self {
            inner: Arc::new(ServerInner { service, handlers }),
        })
    }

    /// The service definition
    pub fn service(&self) -> &ServiceDef {
        &self.inner.service
    }

    /// Handle one call of the rpc `rpc`.
    ///
    /// `requests` are the marshalled request frames. For single request rpcs only
    /// the first frame is read. The result is the stream of marshalled response
    /// frames; it ends after the first error.
    pub fn dispatch(
        &self,
        rpc: &str,
        requests: BoxStream<Bytes>,
    ) -> BoxStream<Result<Bytes, Status>> {
        let Some(desc) = self.inner.service.rpc_desc(rpc).cloned() else {
            return fail(Status::unimplemented(format!(
                "service {} has no rpc {rpc}",
                self.inner.service.name()
            )));
        };
        let Some(handler) = self.inner.handlers.lookup(desc.method_name()).cloned() else {
            return fail(Status::unimplemented(format!(
                "no method {}",
                desc.method_name()
            )));
        };
        if handler.kind() != desc.kind() {
            return fail(Status::internal(format!(
                "method {} is {}, rpc {} is {}",
                desc.method_name(),
                handler.kind(),
                desc.name(),
                desc.kind()
            )));
        }
        tracing::trace!(rpc = desc.name(), kind = %desc.kind(), "dispatching");
        let responses = match handler {
            Handler::Unary(f) => {
                let d = desc.clone();
                stream::once(async move {
                    let req = first_request(&d, requests).await?;
                    f(req).await
                })
                .boxed()
            }
            Handler::ClientStreaming(f) => stream::once(f(requests_of(&desc, requests))).boxed(),
            Handler::ServerStreaming(f) => {
                let d = desc.clone();
                stream::once(async move { first_request(&d, requests).await.map(|req| f(req)) })
                    .map(|res| match res {
                        Ok(responses) => responses,
                        Err(status) => fail(status),
                    })
                    .flatten()
                    .boxed()
            }
            Handler::BidiStreaming(f) => f(requests_of(&desc, requests)),
        };
        marshal_responses(desc, responses)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("service", &self.inner.service)
            .field("handlers", &self.inner.handlers)
            .finish()
    }
}

fn fail<T: Send + 'static>(status: Status) -> BoxStream<Result<T, Status>> {
    stream::once(future::ready(Err(status))).boxed()
}

async fn first_request(
    desc: &RpcDesc,
    mut requests: BoxStream<Bytes>,
) -> Result<AnyMessage, Status> {
    let frame = requests.next().await.ok_or_else(|| {
        Status::invalid_argument(format!("{} called without a request", desc.name()))
    })?;
    Ok(desc.request().marshaller().unmarshal_any(&frame)?)
}

/// Frames that fail to unmarshal end the request stream.
fn requests_of(desc: &Arc<RpcDesc>, requests: BoxStream<Bytes>) -> BoxStream<AnyMessage> {
    let desc = desc.clone();
    requests
        .map(move |frame| desc.request().marshaller().unmarshal_any(&frame))
        .take_while(|req| {
            if let Err(cause) = req {
                tracing::warn!(%cause, "dropping request stream");
            }
            future::ready(req.is_ok())
        })
        .filter_map(|req| future::ready(req.ok()))
        .boxed()
}

/// Ends after the first error, whether from the handler or from marshalling.
fn marshal_responses(
    desc: Arc<RpcDesc>,
    responses: BoxStream<Result<AnyMessage, Status>>,
) -> BoxStream<Result<Bytes, Status>> {
    responses
        .map(move |res| {
            res.and_then(|res| {
                desc.response()
                    .marshaller()
                    .marshal_any(&*res)
                    .map_err(Status::from)
            })
        })
        .scan(false, |failed, res| {
            if *failed {
                return future::ready(None);
            }
            *failed = res.is_err();
            future::ready(Some(res))
        })
        .boxed()
}
