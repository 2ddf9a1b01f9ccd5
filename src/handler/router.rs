//! Request routing module
//!
//! Entry point for HTTP request processing: method validation, static file
//! serving, and the `link` preload header for served scripts.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, HOST, LINK, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::handler::static_files::{self, Lookup, StaticFile};
use crate::http::{self, cache};
use crate::logger::{self, AccessLogEntry};
use crate::preload;

/// Request context: what the handlers need from the request
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    /// `scheme://host[:port]` the client used to reach the server
    pub origin: String,
    pub if_none_match: Option<&'a str>,
}

/// Main entry point for HTTP request handling
///
/// Generic over the request body, which is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (response, entry) = respond(&req, &state, peer_addr).await;

    if state.config.logging.access_log {
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Build the response for `req` along with its access log entry
async fn respond<B>(
    req: &Request<B>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> (Response<Full<Bytes>>, AccessLogEntry) {
    let started = Instant::now();
    let method = req.method();

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let (mut response, preload_count) = match check_http_method(method, state.config.http.enable_cors) {
        Some(resp) => (resp, 0),
        None => {
            let ctx = RequestContext {
                path: req.uri().path(),
                is_head: *method == Method::HEAD,
                origin: request_origin(req, &state.fallback_origin),
                if_none_match: req
                    .headers()
                    .get("if-none-match")
                    .and_then(|v| v.to_str().ok()),
            };
            let (mut resp, count) = serve(&ctx, state).await;
            // Every retrieval response is readable cross-origin, whatever its status
            resp.headers_mut()
                .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            (resp, count)
        }
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    let entry = access_entry(req, &response, peer_addr, started, preload_count);
    (response, entry)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Serve a retrieval request, returning the response and the number of
/// preload entries attached to it
async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> (Response<Full<Bytes>>, usize) {
    let lookup = static_files::load(
        &state.static_root,
        ctx.path,
        &state.config.static_files.index_files,
    )
    .await;

    let file = match lookup {
        Lookup::File(file) => file,
        Lookup::Redirect(location) => return (http::build_301_response(&location), 0),
        Lookup::NotFound => return (http::build_404_response(), 0),
    };

    let mut response = build_static_file_response(&file, ctx);

    let mut preload_count = 0;
    if state.config.preload.applies_to(file.extension()) {
        if let Some((value, count)) = preload_link(ctx, &file, state).await {
            preload_count = count;
            response.headers_mut().insert(LINK, value);
        }
    }

    (response, preload_count)
}

/// Resolve the script's module graph into a `link` header value and its
/// entry count
///
/// Any failure is logged and yields `None`: the file is still served, only
/// without preload hints.
async fn preload_link(
    ctx: &RequestContext<'_>,
    file: &StaticFile,
    state: &AppState,
) -> Option<(HeaderValue, usize)> {
    let header = preload::preload_header(
        &state.static_root,
        &state.config.preload,
        &file.url,
        ctx.path,
        &ctx.origin,
    )
    .await;

    match header {
        Ok(Some(value)) => {
            let count = value.matches("rel=\"modulepreload\"").count();
            match HeaderValue::from_str(&value) {
                Ok(v) => Some((v, count)),
                Err(e) => {
                    logger::log_error(&format!("Invalid link header for {}: {e}", ctx.path));
                    None
                }
            }
        }
        Ok(None) => None,
        Err(e) => {
            logger::log_preload_failed(ctx.path, &e);
            None
        }
    }
}

/// Build 200 or 304 response for a served file
fn build_static_file_response(file: &StaticFile, ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&file.content);

    if cache::check_etag_match(ctx.if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_file_response(file.content.clone(), file.content_type, &etag, ctx.is_head)
}

/// Origin of the request: `http://` plus the Host header, or the listening
/// address when the client sent no usable Host header
fn request_origin<B>(req: &Request<B>, fallback: &str) -> String {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|host| !host.is_empty())
        .or_else(|| req.uri().authority().map(hyper::http::uri::Authority::as_str))
        .map_or_else(|| fallback.to_string(), |host| format!("http://{host}"))
}

fn access_entry<B>(
    req: &Request<B>,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    preload_count: usize,
) -> AccessLogEntry {
    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry.preload_count = preload_count;
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::default_config;
    use crate::config::StaticRoot;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;

    const PEER: &str = "127.0.0.1:50000";

    fn setup() -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        let p = dir.path();
        fs::write(p.join("a.js"), "import { b } from './b.js';\nconsole.log(b);").unwrap();
        fs::write(p.join("b.js"), "import './c.js';\nexport const b = 2;").unwrap();
        fs::write(p.join("c.js"), "export const c = 3;").unwrap();
        fs::write(p.join("broken.js"), "import './gone.js';").unwrap();
        fs::write(p.join("notes.txt"), "import x from './a.js';").unwrap();

        let mut config = default_config();
        config.logging.access_log = false;
        let root = StaticRoot::new(p).unwrap();
        let state = AppState::new(config, root, "127.0.0.1:8000".parse().unwrap());
        (dir, Arc::new(state))
    }

    async fn send(state: &Arc<AppState>, method: Method, path: &str) -> Response<Full<Bytes>> {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "host")
            .body(())
            .unwrap();
        handle_request(req, Arc::clone(state), PEER.parse().unwrap())
            .await
            .unwrap()
    }

    async fn body(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_script_gets_link_header() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/a.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()[LINK],
            "<http://host/b.js>; rel=\"modulepreload\", <http://host/c.js>; rel=\"modulepreload\""
        );
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            &body(resp).await[..],
            b"import { b } from './b.js';\nconsole.log(b);"
        );
    }

    #[tokio::test]
    async fn test_leaf_script_has_no_link_header() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/c.js").await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LINK).is_none());
    }

    #[tokio::test]
    async fn test_non_script_never_gets_link_header() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/notes.txt").await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LINK).is_none());
    }

    #[tokio::test]
    async fn test_failed_resolution_still_serves_file() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/broken.js").await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LINK).is_none());
        assert_eq!(&body(resp).await[..], b"import './gone.js';");
    }

    #[tokio::test]
    async fn test_dependency_deleted_after_first_request() {
        let (dir, state) = setup();
        assert!(send(&state, Method::GET, "/a.js").await.headers().get(LINK).is_some());

        fs::remove_file(dir.path().join("c.js")).unwrap();
        let resp = send(&state, Method::GET, "/a.js").await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LINK).is_none());
    }

    #[tokio::test]
    async fn test_not_found_keeps_cors_header() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/missing.js").await;
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(resp.headers().get(LINK).is_none());
    }

    #[tokio::test]
    async fn test_head_request_has_link_and_empty_body() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::HEAD, "/b.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[LINK], "<http://host/c.js>; rel=\"modulepreload\"");
        assert!(body(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_retrieval_methods() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::POST, "/a.js").await;
        assert_eq!(resp.status(), 405);
        assert!(resp.headers().get(LINK).is_none());

        let resp = send(&state, Method::OPTIONS, "/a.js").await;
        assert_eq!(resp.status(), 204);
    }

    #[tokio::test]
    async fn test_not_modified_keeps_link_header() {
        let (_dir, state) = setup();
        let first = send(&state, Method::GET, "/b.js").await;
        let etag = first.headers()["etag"].to_str().unwrap().to_string();

        let req = Request::builder()
            .uri("/b.js")
            .header("host", "host")
            .header("if-none-match", etag)
            .body(())
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), PEER.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 304);
        assert!(resp.headers().get(LINK).is_some());
    }

    #[tokio::test]
    async fn test_preload_disabled() {
        let (dir, _) = setup();
        let mut config = default_config();
        config.logging.access_log = false;
        config.preload.enabled = false;
        let root = StaticRoot::new(dir.path()).unwrap();
        let state = Arc::new(AppState::new(config, root, "127.0.0.1:8000".parse().unwrap()));

        let resp = send(&state, Method::GET, "/a.js").await;
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get(LINK).is_none());
    }

    #[tokio::test]
    async fn test_access_entry_records_preload_count() {
        let (_dir, state) = setup();
        let req = Request::builder()
            .uri("/a.js?v=1")
            .header("host", "host")
            .header("user-agent", "test-agent")
            .body(())
            .unwrap();
        let (resp, entry) = respond(&req, &state, PEER.parse().unwrap()).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(entry.preload_count, 2);
        assert_eq!(entry.status, 200);
        assert_eq!(entry.path, "/a.js");
        assert_eq!(entry.query.as_deref(), Some("v=1"));
        assert_eq!(entry.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(entry.remote_addr, "127.0.0.1");

        let req = Request::builder().uri("/c.js").body(()).unwrap();
        let (_, entry) = respond(&req, &state, PEER.parse().unwrap()).await;
        assert_eq!(entry.preload_count, 0);
    }

    #[tokio::test]
    async fn test_directory_redirects_then_resolves_from_slash_path() {
        let (dir, state) = setup();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/index.js"), "import './x.js';").unwrap();
        fs::write(dir.path().join("app/x.js"), "").unwrap();

        let resp = send(&state, Method::GET, "/app").await;
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers()["location"], "/app/");
        assert!(resp.headers().get(LINK).is_none());

        let resp = send(&state, Method::GET, "/app/").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[LINK], "<http://host/app/x.js>; rel=\"modulepreload\"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_script_resolves_from_requested_location() {
        let (dir, state) = setup();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/entry.js"), "import './c.js';").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/entry.js"), dir.path().join("alias.js"))
            .unwrap();

        let resp = send(&state, Method::GET, "/alias.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[LINK], "<http://host/c.js>; rel=\"modulepreload\"");
    }

    #[test]
    fn test_origin_falls_back_to_listen_address() {
        let req = Request::builder().uri("/a.js").body(()).unwrap();
        assert_eq!(request_origin(&req, "http://127.0.0.1:8000"), "http://127.0.0.1:8000");

        let req = Request::builder()
            .uri("/a.js")
            .header("host", "example.com:8080")
            .body(())
            .unwrap();
        assert_eq!(request_origin(&req, "http://127.0.0.1:8000"), "http://example.com:8080");
    }
}
