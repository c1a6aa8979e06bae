//! Configuration web server
//!
//! JSON endpoints for listing, adding, editing and deleting networks, plus
//! a Prometheus /metrics endpoint. The /networks routes are gated by the
//! bouncer password (`Authorization: Bearer <password>`).
//!
//! Name uniqueness is enforced here, before calling into the bouncer: a
//! name that is connecting, connected or still tearing down is taken.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::common::Credentials;
use crate::session::{NetworkSession, Session};

use super::metrics;
use super::registry::NetworkState;
use super::Bouncer;

/// Network form as submitted by the UI.
///
/// `address` is `host:port`; `ident` is used as both username and
/// realname.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkForm {
    pub network: String,
    pub address: String,
    pub nickname: String,
    pub ident: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl NetworkForm {
    pub fn into_credentials(self) -> Result<Credentials, ApiError> {
        if self.network.trim().is_empty() {
            return Err(ApiError::BadRequest("network name is required".into()));
        }

        let (hostname, port) = self
            .address
            .rsplit_once(':')
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("address must be host:port, got {}", self.address)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid port: {}", port)))?;

        Ok(Credentials {
            network: self.network,
            hostname: hostname.to_string(),
            port,
            nickname: self.nickname,
            username: self.ident.clone(),
            realname: self.ident,
            password: self.password.filter(|p| !p.is_empty()),
            usermode: 0,
        })
    }
}

/// A registered network as reported to the UI
#[derive(Debug, Clone, Serialize)]
pub struct NetworkView {
    pub network: String,
    pub hostname: String,
    pub port: u16,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub usermode: u32,
    pub has_password: bool,
    pub state: NetworkState,
}

impl NetworkView {
    fn from_session(session: &NetworkSession) -> Self {
        let creds = session.credentials();
        Self {
            network: creds.network.clone(),
            hostname: creds.hostname.clone(),
            port: creds.port,
            nickname: creds.nickname.clone(),
            username: creds.username.clone(),
            realname: creds.realname.clone(),
            usermode: creds.usermode,
            has_password: creds.password.is_some(),
            state: if session.is_connected() {
                NetworkState::Connected
            } else {
                NetworkState::Disconnected
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("network {0} already exists")]
    Conflict(String),

    #[error("network {0} not found")]
    NotFound(String),

    #[error("missing or invalid bouncer password")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Check a request's bearer token against the bouncer password.
pub fn is_authorized(password: &str, headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|provided| {
            let a = Sha256::digest(provided.as_bytes());
            let b = Sha256::digest(password.as_bytes());
            a == b
        })
}

async fn require_password(
    State(bouncer): State<Arc<Bouncer>>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(bouncer.password(), request.headers()) {
        next.run(request).await
    } else {
        ApiError::Unauthorized.into_response()
    }
}

async fn list_networks(State(bouncer): State<Arc<Bouncer>>) -> Json<Vec<NetworkView>> {
    let mut views: Vec<NetworkView> = bouncer
        .networks()
        .iter()
        .map(|session| NetworkView::from_session(session))
        .collect();
    views.sort_by(|a, b| a.network.cmp(&b.network));
    Json(views)
}

async fn get_network(
    State(bouncer): State<Arc<Bouncer>>,
    Path(name): Path<String>,
) -> Result<Json<NetworkView>, ApiError> {
    bouncer
        .network(&name)
        .map(|session| Json(NetworkView::from_session(&session)))
        .ok_or(ApiError::NotFound(name))
}

async fn add_network(
    State(bouncer): State<Arc<Bouncer>>,
    Json(form): Json<NetworkForm>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = form.into_credentials()?;
    if bouncer.network_state(&credentials.network) != NetworkState::Absent {
        return Err(ApiError::Conflict(credentials.network));
    }

    let name = credentials.network.clone();
    bouncer.add_network(credentials);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "network": name, "state": NetworkState::Connecting })),
    ))
}

/// Replace a network: disconnect the old one, dial with the new settings.
async fn edit_network(
    State(bouncer): State<Arc<Bouncer>>,
    Path(name): Path<String>,
    Json(form): Json<NetworkForm>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = form.into_credentials()?;
    if credentials.network != name
        && bouncer.network_state(&credentials.network) != NetworkState::Absent
    {
        return Err(ApiError::Conflict(credentials.network));
    }

    bouncer.remove_network(&name);
    let new_name = credentials.network.clone();
    bouncer.add_network(credentials);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "network": new_name, "state": NetworkState::Connecting })),
    ))
}

async fn delete_network(
    State(bouncer): State<Arc<Bouncer>>,
    Path(name): Path<String>,
) -> StatusCode {
    bouncer.remove_network(&name);
    StatusCode::NO_CONTENT
}

/// Prometheus metrics endpoint
async fn get_metrics() -> Response {
    match metrics::render() {
        Ok(buffer) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Build the configuration UI router
pub fn build_router(bouncer: Arc<Bouncer>) -> Router {
    let networks = Router::new()
        .route("/networks", get(list_networks).post(add_network))
        .route(
            "/networks/{name}",
            get(get_network).put(edit_network).delete(delete_network),
        )
        .route_layer(middleware::from_fn_with_state(
            bouncer.clone(),
            require_password,
        ))
        .with_state(bouncer);

    Router::new()
        .route("/metrics", get(get_metrics))
        .merge(networks)
}

/// Start the configuration web server
pub async fn start_web_server(
    addr: String,
    bouncer: Arc<Bouncer>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let app = build_router(bouncer);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to bind configuration server to {}: {}", addr, e);
            return;
        }
    };

    info!("Configuration server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Configuration server shutting down");
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Configuration server error: {}", e);
        });
}
