//! Client stubs
//!
//! A [StubClass] is generated from a [ServiceDef] with
//! [ServiceDef::rpc_stub_class]. It has one [StubMethod] per rpc, named after
//! the rpc in lowercase underscore form. Instances ([Stub]) are created from a
//! host name alone; a [Channel] can be attached to actually perform calls.
use std::{
    any::{type_name, Any},
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use bytes::Bytes;
use futures_lite::{Stream, StreamExt};

use crate::{
    channel::{Channel, Disconnected},
    desc::{MethodKind, RpcDesc},
    error::{ClientError, Status},
    service::ServiceDef,
    BoxStream,
};

/// One call method of a stub class
#[derive(Debug, Clone)]
pub struct StubMethod {
    desc: Arc<RpcDesc>,
}

impl StubMethod {
    /// Name of the method
    pub fn name(&self) -> &str {
        self.desc.method_name()
    }

    /// The rpc this method calls
    pub fn rpc(&self) -> &Arc<RpcDesc> {
        &self.desc
    }

    /// Interaction pattern of the call
    pub fn kind(&self) -> MethodKind {
        self.desc.kind()
    }
}

/// A generated client class.
///
/// This is a snapshot of the rpcs of a service at the time it was generated.
#[derive(Debug, Clone)]
pub struct StubClass {
    inner: Arc<StubClassInner>,
}

#[derive(Debug)]
struct StubClassInner {
    service: String,
    methods: BTreeMap<String, StubMethod>,
}

impl StubClass {
    pub(crate) fn new(service: &ServiceDef) -> Self {
        let methods = service
            .rpc_descs()
            .values()
            .map(|desc| {
                let method = StubMethod { desc: desc.clone() };
                (method.name().to_string(), method)
            })
            .collect();
        Self {
            inner: Arc::new(StubClassInner {
                service: service.name().to_string(),
                methods,
            }),
        }
    }

    /// Name of the service the class was generated from
    pub fn service_name(&self) -> &str {
        &self.inner.service
    }

    /// Names of all call methods, sorted
    pub fn instance_methods(&self) -> impl Iterator<Item = &str> {
        self.inner.methods.keys().map(String::as_str)
    }

    /// True if the class has a call method called `name`
    pub fn has_method(&self, name: &str) -> bool {
        self.inner.methods.contains_key(name)
    }

    /// The call method called `name`
    pub fn method(&self, name: &str) -> Option<&StubMethod> {
        self.inner.methods.get(name)
    }

    /// Create an instance for `host`. This never fails.
    ///
    /// The instance has no transport until one is attached with [Stub::with_channel].
    pub fn new_stub(&self, host: impl Into<String>) -> Stub {
        let host = host.into();
        Stub {
            class: self.clone(),
            channel: Arc::new(Disconnected::new(host.clone())),
            host,
        }
    }
}

/// An instance of a [StubClass]
#[derive(Clone)]
pub struct Stub {
    class: StubClass,
    host: String,
    channel: Arc<dyn Channel>,
}

impl Stub {
    /// Use `channel` for all calls
    pub fn with_channel(self, channel: impl Channel) -> Self {
        Self {
            channel: Arc::new(channel),
            ..self
        }
    }

    /// The host this stub was created for
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The class of this stub
    pub fn class(&self) -> &StubClass {
        &self.class
    }

    /// Names of all call methods, sorted
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.class.instance_methods()
    }

    /// True if the stub has a call method called `name`
    pub fn responds_to(&self, name: &str) -> bool {
        self.class.has_method(name)
    }

    /// Call a unary method
    pub async fn unary<Req, Res>(&self, method: &str, req: Req) -> Result<Res, ClientError>
    where
        Req: Any + Send,
        Res: Any + Send,
    {
        let desc = self.resolve::<Req, Res>(method, MethodKind::Unary)?;
        let frame = desc.request().marshaller().marshal(&req)?;
        let requests = futures_lite::stream::once(frame).boxed();
        let mut responses = self.channel.call(desc.clone(), requests);
        let frame = responses.next().await.ok_or(ClientError::EarlyClose)??;
        Ok(desc.response().marshaller().unmarshal::<Res>(&frame)?)
    }

    /// Call a client streaming method
    pub async fn client_streaming<Req, Res>(
        &self,
        method: &str,
        reqs: impl Stream<Item = Req> + Send + 'static,
    ) -> Result<Res, ClientError>
    where
        Req: Any + Send,
        Res: Any + Send,
    {
        let desc = self.resolve::<Req, Res>(method, MethodKind::ClientStreaming)?;
        let mut responses = self
            .channel
            .call(desc.clone(), marshal_requests(&desc, reqs));
        let frame = responses.next().await.ok_or(ClientError::EarlyClose)??;
        Ok(desc.response().marshaller().unmarshal::<Res>(&frame)?)
    }

    /// Call a server streaming method
    pub fn server_streaming<Req, Res>(
        &self,
        method: &str,
        req: Req,
    ) -> Result<BoxStream<Result<Res, ClientError>>, ClientError>
    where
        Req: Any + Send,
        Res: Any + Send,
    {
        let desc = self.resolve::<Req, Res>(method, MethodKind::ServerStreaming)?;
        let frame = desc.request().marshaller().marshal(&req)?;
        let requests = futures_lite::stream::once(frame).boxed();
        let responses = self.channel.call(desc.clone(), requests);
        Ok(unmarshal_responses(desc, responses))
    }

    /// Call a bidi streaming method
    pub fn bidi_streaming<Req, Res>(
        &self,
        method: &str,
        reqs: impl Stream<Item = Req> + Send + 'static,
    ) -> Result<BoxStream<Result<Res, ClientError>>, ClientError>
    where
        Req: Any + Send,
        Res: Any + Send,
    {
        let desc = self.resolve::<Req, Res>(method, MethodKind::BidiStreaming)?;
        let responses = self
            .channel
            .call(desc.clone(), marshal_requests(&desc, reqs));
        Ok(unmarshal_responses(desc, responses))
    }

    fn resolve<Req: Any, Res: Any>(
        &self,
        method: &str,
        kind: MethodKind,
    ) -> Result<Arc<RpcDesc>, ClientError> {
        let desc = self
            .class
            .method(method)
            .ok_or_else(|| ClientError::UnknownMethod(method.to_string()))?
            .rpc();
        if desc.kind() != kind {
            return Err(ClientError::KindMismatch {
                method: method.to_string(),
                expected: desc.kind(),
                actual: kind,
            });
        }
        desc.request().check_type::<Req>(method)?;
        desc.response().check_type::<Res>(method)?;
        tracing::trace!(host = %self.host, method, "calling");
        Ok(desc.clone())
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("service", &self.class.service_name())
            .field("host", &self.host)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Requests that fail to marshal end the request stream.
fn marshal_requests<Req: Any + Send>(
    desc: &Arc<RpcDesc>,
    reqs: impl Stream<Item = Req> + Send + 'static,
) -> BoxStream<Bytes> {
    let desc = desc.clone();
    reqs.map(move |req| desc.request().marshaller().marshal(&req))
        .take_while(|frame| {
            if let Err(cause) = frame {
                tracing::warn!(%cause, request = type_name::<Req>(), "ending request stream");
            }
            frame.is_ok()
        })
        .filter_map(Result::ok)
        .boxed()
}

fn unmarshal_responses<Res: Any + Send>(
    desc: Arc<RpcDesc>,
    responses: BoxStream<Result<Bytes, Status>>,
) -> BoxStream<Result<Res, ClientError>> {
    responses
        .map(move |frame| -> Result<Res, ClientError> {
            let frame = frame?;
            Ok(desc.response().marshaller().unmarshal::<Res>(&frame)?)
        })
        .boxed()
}
