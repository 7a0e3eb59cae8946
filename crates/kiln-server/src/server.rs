//! Development server implementation.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use kiln_config::ServerOptions;

use crate::error::ServerError;
use crate::reload::{
    inject_reload_script, reload_client_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};
use crate::watcher::FileWatcher;

/// Largest page the reload script is injected into.
const MAX_INJECTED_PAGE: usize = 16 * 1024 * 1024;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory served at `/`
    pub base_dir: PathBuf,

    /// File served for directory requests
    pub index: String,

    /// URL prefix to directory mounts
    pub routes: BTreeMap<String, PathBuf>,

    /// Globs whose changes reload connected browsers
    pub files: Vec<String>,

    /// Open a browser on start
    pub open: bool,
}

impl From<&ServerOptions> for DevServerConfig {
    fn from(options: &ServerOptions) -> Self {
        Self {
            host: options.host.clone(),
            port: options.port,
            base_dir: PathBuf::from(&options.base_dir),
            index: options.index.clone(),
            routes: options
                .routes
                .iter()
                .map(|(route, dir)| (route.clone(), PathBuf::from(dir)))
                .collect(),
            files: options.files.clone(),
            open: options.open,
        }
    }
}

impl Default for DevServerConfig {
    fn default() -> Self {
        let mut options = ServerOptions::default();
        options.base_dir = "dist".to_string();
        options.routes.clear();
        options.files.clear();
        Self::from(&options)
    }
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
    base_dir: PathBuf,
    index: String,
}

/// Live-reload development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self {
            config,
            hub: ReloadHub::new(),
        }
    }

    /// Hub used to notify connected browsers.
    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Build the router: reload endpoints, route aliases, then the base
    /// directory for everything else.
    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            hub: self.hub.clone(),
            base_dir: self.config.base_dir.clone(),
            index: self.config.index.clone(),
        });

        let mut app = Router::new()
            .route(RELOAD_SOCKET_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(script_handler));

        for (route, dir) in &self.config.routes {
            tracing::debug!("Mounting {} at {}", dir.display(), route);
            app = app.nest_service(route, ServeDir::new(dir));
        }

        app.fallback(page_handler).with_state(state)
    }

    /// Serve until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::Address(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let _watcher = if self.config.files.is_empty() {
            None
        } else {
            let (watcher, mut rx) = FileWatcher::new(&self.config.files)?;
            let hub = self.hub.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let paths: Vec<String> = event
                        .paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    tracing::info!(
                        "Reloading {} client(s): {}",
                        hub.client_count(),
                        paths.join(", ")
                    );
                    hub.send(ReloadMessage::Reload { paths });
                }
            });
            Some(watcher)
        };

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        let url = format!("http://{}", addr);
        tracing::info!(
            "Serving {} at {}",
            self.config.base_dir.display(),
            url
        );

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

/// Serve a file from the base directory, adding the reload script to pages.
async fn page_handler(State(state): State<Arc<ServerState>>, mut req: Request) -> Response {
    if req.uri().path().ends_with('/') {
        let path = format!("{}{}", req.uri().path(), state.index);
        match path.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }

    let response = match ServeDir::new(&state.base_dir).oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));

    if response.status() != StatusCode::OK || !is_html {
        return response.map(Body::new);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(Body::new(body), MAX_INJECTED_PAGE).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read page body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = inject_reload_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Response::from_parts(parts, Body::from(page))
}

async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        reload_client_script(),
    )
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward hub messages to one client until either side closes.
async fn handle_ws(socket: WebSocket, state: Arc<ServerState>) {
    tracing::debug!("Live reload client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.hub.subscribe();

    let send_task = tokio::spawn(async move {
        let mut pending = Some(ReloadMessage::Connected);
        loop {
            let msg = match pending.take() {
                Some(msg) => msg,
                None => match rx.recv().await {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode reload message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    tracing::debug!("Live reload client disconnected");
}
