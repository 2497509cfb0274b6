//! Server side method tables
//!
//! A [Handlers] table maps method names to functions. There is one way to
//! register a method for each interaction pattern, mirroring the shape of the
//! call: single request methods get the request, streaming request methods get
//! a stream of requests. Tables can inherit methods from a parent table.
use std::{any::type_name, collections::BTreeMap, fmt, future::Future, sync::Arc};

use futures_lite::{Stream, StreamExt};
use futures_util::{future::BoxFuture, FutureExt};

use crate::{desc::MethodKind, error::Status, message::AnyMessage, BoxStream};

type UnaryFn =
    Arc<dyn Fn(AnyMessage) -> BoxFuture<'static, Result<AnyMessage, Status>> + Send + Sync>;
type ClientStreamingFn = Arc<
    dyn Fn(BoxStream<AnyMessage>) -> BoxFuture<'static, Result<AnyMessage, Status>> + Send + Sync,
>;
type ServerStreamingFn =
    Arc<dyn Fn(AnyMessage) -> BoxStream<Result<AnyMessage, Status>> + Send + Sync>;
type BidiStreamingFn =
    Arc<dyn Fn(BoxStream<AnyMessage>) -> BoxStream<Result<AnyMessage, Status>> + Send + Sync>;

/// A type erased method
#[derive(Clone)]
pub(crate) enum Handler {
    Unary(UnaryFn),
    ClientStreaming(ClientStreamingFn),
    ServerStreaming(ServerStreamingFn),
    BidiStreaming(BidiStreamingFn),
}

impl Handler {
    pub(crate) fn kind(&self) -> MethodKind {
        match self {
            Handler::Unary(_) => MethodKind::Unary,
            Handler::ClientStreaming(_) => MethodKind::ClientStreaming,
            Handler::ServerStreaming(_) => MethodKind::ServerStreaming,
            Handler::BidiStreaming(_) => MethodKind::BidiStreaming,
        }
    }
}

/// Method table of a service implementation
#[derive(Clone, Default)]
pub struct Handlers {
    methods: BTreeMap<String, Handler>,
    parent: Option<Arc<Handlers>>,
}

impl Handlers {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table that falls back to the methods of `parent`
    pub fn inherit(parent: &Handlers) -> Self {
        Self {
            methods: BTreeMap::new(),
            parent: Some(Arc::new(parent.clone())),
        }
    }

    /// Define a method taking one request and returning one response
    pub fn unary<Req, Res, F, Fut>(mut self, method: impl Into<String>, f: F) -> Self
    where
        Req: Send + 'static,
        Res: Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, Status>> + Send + 'static,
    {
        let handler: UnaryFn = Arc::new(move |req: AnyMessage| match downcast::<Req>(req) {
            Ok(req) => f(req).map(box_response).boxed(),
            Err(status) => futures_util::future::ready(Err(status)).boxed(),
        });
        self.methods.insert(method.into(), Handler::Unary(handler));
        self
    }

    /// Define a method taking a stream of requests and returning one response
    pub fn client_streaming<Req, Res, F, Fut>(mut self, method: impl Into<String>, f: F) -> Self
    where
        Req: Send + 'static,
        Res: Send + 'static,
        F: Fn(BoxStream<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, Status>> + Send + 'static,
    {
        let handler: ClientStreamingFn = Arc::new(move |reqs: BoxStream<AnyMessage>| {
            f(typed_requests::<Req>(reqs)).map(box_response).boxed()
        });
        self.methods
            .insert(method.into(), Handler::ClientStreaming(handler));
        self
    }

    /// Define a method taking one request and returning a stream of responses
    pub fn server_streaming<Req, Res, F, Str>(mut self, method: impl Into<String>, f: F) -> Self
    where
        Req: Send + 'static,
        Res: Send + 'static,
        F: Fn(Req) -> Str + Send + Sync + 'static,
        Str: Stream<Item = Result<Res, Status>> + Send + 'static,
    {
        let handler: ServerStreamingFn = Arc::new(move |req: AnyMessage| match downcast::<Req>(req)
        {
            Ok(req) => f(req).map(box_response).boxed(),
            Err(status) => futures_lite::stream::once(Err(status)).boxed(),
        });
        self.methods
            .insert(method.into(), Handler::ServerStreaming(handler));
        self
    }

    /// Define a method taking a stream of requests and returning a stream of responses
    pub fn bidi_streaming<Req, Res, F, Str>(mut self, method: impl Into<String>, f: F) -> Self
    where
        Req: Send + 'static,
        Res: Send + 'static,
        F: Fn(BoxStream<Req>) -> Str + Send + Sync + 'static,
        Str: Stream<Item = Result<Res, Status>> + Send + 'static,
    {
        let handler: BidiStreamingFn = Arc::new(move |reqs: BoxStream<AnyMessage>| {
            f(typed_requests::<Req>(reqs)).map(box_response).boxed()
        });
        self.methods
            .insert(method.into(), Handler::BidiStreaming(handler));
        self
    }

    /// True if `method` is defined here or in a parent table
    pub fn has_method(&self, method: &str) -> bool {
        self.lookup(method).is_some()
    }

    /// Interaction pattern of `method`, if defined
    pub fn kind_of(&self, method: &str) -> Option<MethodKind> {
        self.lookup(method).map(Handler::kind)
    }

    /// All method names, own and inherited
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .parent
            .as_ref()
            .map(|parent| parent.method_names())
            .unwrap_or_default();
        names.extend(self.methods.keys().cloned());
        names.sort();
        names.dedup();
        names
    }

    pub(crate) fn lookup(&self, method: &str) -> Option<&Handler> {
        match self.methods.get(method) {
            Some(handler) => Some(handler),
            None => self.parent.as_deref().and_then(|parent| parent.lookup(method)),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("methods", &self.method_names())
            .finish()
    }
}

fn downcast<T: Send + 'static>(msg: AnyMessage) -> Result<T, Status> {
    msg.downcast::<T>().map(|msg| *msg).map_err(|_| {
        Status::invalid_argument(format!("request is not a {}", type_name::<T>()))
    })
}

fn box_response<T: Send + 'static>(res: Result<T, Status>) -> Result<AnyMessage, Status> {
    res.map(|res| Box::new(res) as AnyMessage)
}

/// Requests of the wrong type end the stream.
fn typed_requests<T: Send + 'static>(reqs: BoxStream<AnyMessage>) -> BoxStream<T> {
    reqs.map(downcast::<T>)
        .take_while(|req| {
            if let Err(status) = req {
                tracing::warn!(%status, "dropping request stream");
            }
            req.is_ok()
        })
        .filter_map(Result::ok)
        .boxed()
}
