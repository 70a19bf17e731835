/* src/middleware.rs */

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use std::{
    borrow::Cow,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::error::{FilterError, Result};
use crate::filter::IpFilter;

/// Raw transport-level peer address in `host:port` form.
///
/// Servers that do not hand out [`ConnectInfo<SocketAddr>`] can insert this
/// extension instead. It takes precedence over `ConnectInfo` when both are
/// present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// Layer that rejects requests whose client IP is outside the allowlist.
///
/// Malformed client address data yields `500 Internal Server Error`, an
/// address outside every configured range yields `403 Forbidden`, and
/// everything else reaches the inner service untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use ipgate::{IpFilter, IpFilterConfig, IpFilterLayer};
///
/// let config = IpFilterConfig::parse(["10.0.0.0/8"]).unwrap();
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .layer(IpFilterLayer::new(IpFilter::new(config)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IpFilterLayer {
    filter: Arc<IpFilter>,
}

impl IpFilterLayer {
    pub fn new(filter: IpFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }
}

impl From<IpFilter> for IpFilterLayer {
    fn from(filter: IpFilter) -> Self {
        Self::new(filter)
    }
}

impl<S> Layer<S> for IpFilterLayer {
    type Service = IpFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpFilterService {
            inner,
            filter: Arc::clone(&self.filter),
        }
    }
}

impl IpFilter {
    /// Wrap `next` so it only sees requests this filter admits.
    pub fn decorate<S>(&self, next: S) -> IpFilterService<S> {
        IpFilterLayer::new(self.clone()).layer(next)
    }
}

/// Service produced by [`IpFilterLayer`].
#[derive(Debug, Clone)]
pub struct IpFilterService<S> {
    inner: S,
    filter: Arc<IpFilter>,
}

impl<S> Service<Request> for IpFilterService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        if let Err(err) = check_request(&self.filter, &req) {
            return Box::pin(async move { Ok::<_, S::Error>(err.into_response()) });
        }

        let future = self.inner.call(req);
        Box::pin(future)
    }
}

fn check_request(filter: &IpFilter, req: &Request) -> Result<IpAddr> {
    // Header bytes outside visible ASCII are kept lossily; only the first
    // comma-separated entry has to be an address.
    let forwarded = req
        .headers()
        .get(filter.extractor().header.as_str())
        .map(|value| String::from_utf8_lossy(value.as_bytes()));

    let remote_addr: Option<Cow<'_, str>> = match req.extensions().get::<RemoteAddr>() {
        Some(RemoteAddr(addr)) => Some(Cow::Borrowed(addr.as_str())),
        // Formatted and parsed again so a scoped IPv6 peer fails the same way
        // a raw `RemoteAddr` would.
        None => req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Cow::Owned(addr.to_string())),
    };

    filter.check(forwarded.as_deref(), remote_addr.as_deref())
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        let status = if self.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::FORBIDDEN
        };
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}
