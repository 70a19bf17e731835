#![cfg(feature = "axum")]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use ipgate::{IpExtractor, IpFilter, IpFilterConfig, IpFilterLayer, RemoteAddr};
use tower::ServiceExt; // for .oneshot()

fn app(filter: IpFilter, called: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(
            "/",
            get(move || {
                let called = called.clone();
                async move {
                    called.store(true, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        )
        .layer(IpFilterLayer::new(filter))
}

fn request(forwarded: Option<&str>, remote_addr: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/");
    if let Some(forwarded) = forwarded {
        builder = builder.header("X-FORWARDED-FOR", forwarded);
    }
    let mut req = builder.body(Body::empty()).unwrap();
    if let Some(remote_addr) = remote_addr {
        req.extensions_mut().insert(RemoteAddr(remote_addr.to_string()));
    }
    req
}

struct TestCase {
    name: &'static str,
    ranges: &'static [&'static str],
    forwarded: Option<&'static str>,
    remote_addr: Option<&'static str>,
    status: StatusCode,
    handler_called: bool,
}

#[tokio::test]
async fn test_ip_filter() {
    let cases = [
        TestCase {
            name: "no forwarded header, invalid remote address",
            ranges: &[],
            forwarded: None,
            remote_addr: Some("foo"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            handler_called: false,
        },
        TestCase {
            name: "no forwarded header, no remote address",
            ranges: &[],
            forwarded: None,
            remote_addr: None,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            handler_called: false,
        },
        TestCase {
            name: "invalid forwarded ip",
            ranges: &[],
            forwarded: Some("foo"),
            remote_addr: Some("192.168.1.1:5000"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            handler_called: false,
        },
        TestCase {
            name: "invalid forwarded ip with allowlist",
            ranges: &["192.168.1.0/24"],
            forwarded: Some("foo"),
            remote_addr: Some("192.168.1.1:5000"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            handler_called: false,
        },
        TestCase {
            name: "empty first forwarded entry",
            ranges: &["10.0.0.0/8"],
            forwarded: Some(", 203.0.113.5"),
            remote_addr: Some("10.0.0.1:80"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            handler_called: false,
        },
        TestCase {
            name: "valid, disallowed forwarded ip",
            ranges: &["192.168.1.0/24"],
            forwarded: Some("192.168.2.125"),
            remote_addr: None,
            status: StatusCode::FORBIDDEN,
            handler_called: false,
        },
        TestCase {
            name: "valid, allowed forwarded ip",
            ranges: &["192.168.1.0/24"],
            forwarded: Some("192.168.1.125"),
            remote_addr: None,
            status: StatusCode::OK,
            handler_called: true,
        },
        TestCase {
            name: "forwarded ip decides over remote address",
            ranges: &["192.168.1.0/24"],
            forwarded: Some("192.168.2.125, 192.168.1.1"),
            remote_addr: Some("192.168.1.1:5000"),
            status: StatusCode::FORBIDDEN,
            handler_called: false,
        },
        TestCase {
            name: "remote address inside a range",
            ranges: &["10.0.0.0/8", "192.168.1.0/24"],
            forwarded: None,
            remote_addr: Some("10.1.2.3:5000"),
            status: StatusCode::OK,
            handler_called: true,
        },
        TestCase {
            name: "empty allowlist admits any address",
            ranges: &[],
            forwarded: Some("203.0.113.9"),
            remote_addr: None,
            status: StatusCode::OK,
            handler_called: true,
        },
    ];

    for case in cases {
        let called = Arc::new(AtomicBool::new(false));
        let filter = IpFilter::new(IpFilterConfig::parse(case.ranges).unwrap());

        let resp = app(filter, called.clone())
            .oneshot(request(case.forwarded, case.remote_addr))
            .await
            .unwrap();

        assert_eq!(resp.status(), case.status, "{}", case.name);
        assert_eq!(called.load(Ordering::SeqCst), case.handler_called, "{}", case.name);
    }
}

#[tokio::test]
async fn test_connect_info_remote_address() {
    let called = Arc::new(AtomicBool::new(false));
    let filter = IpFilter::new(IpFilterConfig::parse(["2001:db8::/32"]).unwrap());

    let mut req = request(None, None);
    let addr: SocketAddr = "[2001:db8::7]:443".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));

    let resp = app(filter, called.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_custom_forwarded_header() {
    let called = Arc::new(AtomicBool::new(false));
    let filter = IpFilter::new(IpFilterConfig::parse(["192.168.1.0/24"]).unwrap())
        .with_extractor(IpExtractor::new().with_header("X-Real-IP"));

    // X-Forwarded-For is ignored once another header is configured
    let mut req = request(Some("192.168.1.125"), Some("10.0.0.1:80"));
    req.headers_mut()
        .insert("x-real-ip", "192.168.1.50".parse().unwrap());
    let resp = app(filter.clone(), called.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = request(Some("192.168.1.125"), Some("10.0.0.1:80"));
    let resp = app(filter, called.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_decorate_passes_response_through() {
    let called = Arc::new(AtomicBool::new(false));
    let filter = IpFilter::new(IpFilterConfig::parse(["192.168.1.0/24"]).unwrap());

    let handler_called = called.clone();
    let service = filter.decorate(tower::service_fn(move |_req: Request<Body>| {
        let called = handler_called.clone();
        async move {
            called.store(true, Ordering::SeqCst);
            Ok::<Response, Infallible>((StatusCode::IM_A_TEAPOT, "short and stout").into_response())
        }
    }));

    let resp = service
        .clone()
        .oneshot(request(Some("192.168.1.125"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert!(called.load(Ordering::SeqCst));

    called.store(false, Ordering::SeqCst);
    let resp = service
        .oneshot(request(Some("192.168.2.125"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(!called.load(Ordering::SeqCst));
}
