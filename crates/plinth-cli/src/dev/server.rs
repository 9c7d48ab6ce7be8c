//! The development HTTP server.
//!
//! Request resolution order, per path:
//!   1. proxy rules (longest matching prefix wins), forwarded verbatim
//!   2. artifacts from the current snapshot, served from memory
//!   3. extension-less paths fall back to the HTML shell (SPA routing)
//!   4. everything else is a 404
//!
//! The shell is always served with the reload client injected. When no
//! pass has succeeded yet, every page request gets the error overlay.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use indexmap::IndexMap;
use plinth_config::ProxyRule;
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};

use std::sync::Arc;

use crate::dev::overlay::{inject_reload, overlay_page};
use crate::dev::state::DevState;
use crate::error::{CliError, Result};
use crate::ui;

const RELOAD_CLIENT: &str = include_str!("../../assets/reload-client.js");

/// Proxied request bodies are buffered; anything this large is not a
/// playground API call.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerContext {
    pub state: Arc<DevState>,
    pub proxy: IndexMap<String, ProxyRule>,
    pub client: reqwest::Client,
}

/// Bind and serve until the process exits.
pub async fn serve(host: &str, port: u16, ctx: ServerContext, open: bool) -> Result<()> {
    let (listener, addr) = bind_with_fallback(host, port).await?;
    let url = format!("http://{addr}");

    ui::success(&format!("dev server running at {url}"));
    if open {
        open_browser(&url);
    }

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        ui::info("shutting down");
    }
}

/// Bind the requested port, walking forward when it is taken.
async fn bind_with_fallback(host: &str, port: u16) -> Result<(TcpListener, SocketAddr)> {
    const ATTEMPTS: u16 = 10;
    for offset in 0..ATTEMPTS {
        let candidate = port.saturating_add(offset);
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => {
                if candidate != port {
                    ui::warning(&format!("port {port} is taken, using {candidate}"));
                }
                let addr = listener.local_addr()?;
                return Ok((listener, addr));
            }
            Err(error) if error.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(error) => return Err(CliError::Server(error.to_string())),
        }
    }
    Err(CliError::Server(format!(
        "no free port in {port}..{}",
        port.saturating_add(ATTEMPTS)
    )))
}

pub fn router(ctx: ServerContext) -> Router {
    Router::new()
        .route("/__plinth_sse__", get(handle_sse))
        .route("/__plinth_reload__.js", get(handle_reload_script))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx)
}

async fn handle_sse(
    State(ctx): State<ServerContext>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = ctx.state.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|message| message.ok())
        .map(|data| Ok(Event::default().data(data)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_CLIENT,
    )
}

async fn handle_request(State(ctx): State<ServerContext>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    if let Some(rule) = longest_prefix_match(&ctx.proxy, &path) {
        return forward(&ctx, &rule, request).await;
    }

    serve_from_snapshot(&ctx, &path)
}

/// Longest matching prefix wins so `/api/internal` can override `/api`.
fn longest_prefix_match(proxy: &IndexMap<String, ProxyRule>, path: &str) -> Option<ProxyRule> {
    proxy
        .iter()
        .filter(|(prefix, _)| {
            path.starts_with(prefix.as_str())
                && (path.len() == prefix.len() || path.as_bytes()[prefix.len()] == b'/')
        })
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, rule)| rule.clone())
}

/// Forward a request to the upstream origin, preserving method, headers,
/// query string, and body. Upstream failures surface as 502 with the
/// reason in the body; the dev server itself stays healthy.
async fn forward(ctx: &ServerContext, rule: &ProxyRule, request: Request) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let url = format!("{}{}", rule.target.trim_end_matches('/'), path_and_query);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("proxy body error: {error}"),
            )
                .into_response()
        }
    };

    tracing::debug!(method = %parts.method, %url, "proxying request");

    let upstream = ctx
        .client
        .request(parts.method, &url)
        .headers(forwardable_headers(&parts.headers))
        .body(body)
        .send()
        .await;

    match upstream {
        Ok(response) => {
            let status = response.status();
            let headers = forwardable_headers(response.headers());
            match response.bytes().await {
                Ok(bytes) => {
                    let mut reply = (status, bytes.to_vec()).into_response();
                    *reply.headers_mut() = headers;
                    reply
                }
                Err(error) => bad_gateway(&url, &error.to_string()),
            }
        }
        Err(error) => bad_gateway(&url, &error.to_string()),
    }
}

fn bad_gateway(url: &str, reason: &str) -> Response {
    tracing::warn!(%url, "upstream unreachable: {reason}");
    (
        StatusCode::BAD_GATEWAY,
        format!("upstream {url} unreachable: {reason}"),
    )
        .into_response()
}

/// Hop-by-hop headers must not be forwarded in either direction.
/// Repeated names (several `Set-Cookie` lines from a login endpoint)
/// are appended, not collapsed.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let skip = matches!(
            name.as_str(),
            "host" | "connection" | "transfer-encoding" | "content-length" | "keep-alive" | "upgrade"
        );
        if !skip {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn serve_from_snapshot(ctx: &ServerContext, path: &str) -> Response {
    let Some(snapshot) = ctx.state.snapshot() else {
        // Nothing has ever built: the overlay is the whole site.
        let status = ctx.state.status();
        let message = status
            .error()
            .unwrap_or("The first build has not finished yet. This page reloads automatically.");
        return Html(overlay_page(message)).into_response();
    };

    let trimmed = path.trim_start_matches('/');

    if trimmed.is_empty() || trimmed == "index.html" {
        return shell_response(&snapshot.shell);
    }

    if let Some(bytes) = snapshot.files.get(trimmed) {
        return (
            [
                (header::CONTENT_TYPE, plinth_graph::content_type(trimmed)),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            bytes.clone(),
        )
            .into_response();
    }

    // Client-side routes have no extension; hand them the shell.
    let last_segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if !last_segment.contains('.') {
        return shell_response(&snapshot.shell);
    }

    (StatusCode::NOT_FOUND, Body::from("not found")).into_response()
}

fn shell_response(shell: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        inject_reload(shell),
    )
        .into_response()
}

fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let command = "open";
    #[cfg(not(target_os = "macos"))]
    let command = "xdg-open";

    if let Err(error) = std::process::Command::new(command).arg(url).spawn() {
        tracing::debug!("could not open browser: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> IndexMap<String, ProxyRule> {
        pairs
            .iter()
            .map(|(prefix, target)| {
                (
                    prefix.to_string(),
                    ProxyRule {
                        target: target.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn prefix_match_requires_segment_boundary() {
        let proxy = rules(&[("/api", "http://backend")]);
        assert!(longest_prefix_match(&proxy, "/api").is_some());
        assert!(longest_prefix_match(&proxy, "/api/contract").is_some());
        assert!(longest_prefix_match(&proxy, "/apiary").is_none());
        assert!(longest_prefix_match(&proxy, "/app.js").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let proxy = rules(&[("/api", "http://a"), ("/api/internal", "http://b")]);
        let rule = longest_prefix_match(&proxy, "/api/internal/x").unwrap();
        assert_eq!(rule.target, "http://b");
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "localhost:8009".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::ACCEPT, "application/json".parse().unwrap());

        let forwarded = forwardable_headers(&headers);
        assert!(forwarded.get(header::HOST).is_none());
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert_eq!(forwarded.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn repeated_headers_are_relayed_in_full() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, "session=a1".parse().unwrap());
        headers.append(header::SET_COOKIE, "csrf=b2".parse().unwrap());

        let forwarded = forwardable_headers(&headers);
        let cookies: Vec<_> = forwarded.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0], "session=a1");
        assert_eq!(cookies[1], "csrf=b2");
    }
}
