//! Request-lifecycle binding as a tower middleware.

use crate::manager::SessionManager;
use crate::session::Session;
use http::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

type SessionFactory = Arc<dyn Fn() -> Session + Send + Sync>;

/// Tower layer that wires sessions into a request pipeline.
///
/// For each request the layer asks its [`SessionManager`] to load the
/// session identified by the request headers; on a miss it fabricates one
/// with the configured factory (default: [`Session::new`]). The session
/// handle is attached to the request extensions for handlers to pick up
/// via [`session_from`]. After the inner service responds, the session is
/// saved back iff it was [`changed`](Session::changed). The save is
/// fire-and-forget: persistence failures never surface to the handler.
///
/// # Examples
///
/// ```
/// use portico_session::{MemoryStore, SessionLayer, SessionManager, session_from};
/// use std::convert::Infallible;
/// use std::sync::Arc;
/// use tower::{Layer, Service, ServiceExt, service_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = Arc::new(SessionManager::cookie(Arc::new(MemoryStore::new())));
///
/// let handler = service_fn(|req: http::Request<()>| async move {
///     let session = session_from(&req).unwrap();
///     session.set("visits", 1);
///     Ok::<_, Infallible>(http::Response::new(()))
/// });
///
/// let mut service = SessionLayer::new(manager).layer(handler);
/// let response = service
///     .ready()
///     .await
///     .unwrap()
///     .call(http::Request::new(()))
///     .await
///     .unwrap();
/// assert!(response.headers().contains_key(http::header::SET_COOKIE));
/// # }
/// ```
#[derive(Clone)]
pub struct SessionLayer {
    manager: Arc<SessionManager>,
    factory: SessionFactory,
}

impl SessionLayer {
    /// Create a layer over a manager, fabricating default sessions on a
    /// miss.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            factory: Arc::new(Session::new),
        }
    }

    /// Replace the factory used to fabricate a session when the request
    /// carries none.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Session + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            manager: self.manager.clone(),
            factory: self.factory.clone(),
        }
    }
}

/// Service produced by [`SessionLayer`].
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    manager: Arc<SessionManager>,
    factory: SessionFactory,
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for SessionService<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send,
    ReqB: Send + 'static,
    ResB: Send + 'static,
{
    type Response = Response<ResB>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqB>) -> Self::Future {
        let manager = self.manager.clone();
        let factory = self.factory.clone();
        // Take the service that was driven to readiness; leave the clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let session = match manager.load(req.headers()).await {
                Some(session) => session,
                None => (factory)(),
            };
            req.extensions_mut().insert(session.clone());

            let mut response = inner.call(req).await?;

            if session.changed() {
                manager.save(&session, response.headers_mut()).await;
            }

            Ok(response)
        })
    }
}

/// Get the session attached to a request by [`SessionLayer`].
pub fn session_from<B>(req: &Request<B>) -> Option<Session> {
    req.extensions().get::<Session>().cloned()
}
