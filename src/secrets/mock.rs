// In-process stand-in for the metadata server and the Secret Manager REST API.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::net::TcpListener;

pub(crate) const MOCK_PROJECT: &str = "mock-project";
const SECRETS_PREFIX: &str = "/v1/projects/mock-project/secrets/";

#[derive(Default)]
pub(crate) struct Counters {
    pub token_fetches: AtomicUsize,
    pub project_lookups: AtomicUsize,
}

struct MockState {
    counters: Arc<Counters>,
    expires_in: u64,
}

pub(crate) struct MockGoogle {
    pub addr: SocketAddr,
    pub counters: Arc<Counters>,
}

impl MockGoogle {
    /// Host in the form GCE_METADATA_HOST expects.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_fetches(&self) -> usize {
        self.counters.token_fetches.load(Ordering::SeqCst)
    }

    pub fn project_lookups(&self) -> usize {
        self.counters.project_lookups.load(Ordering::SeqCst)
    }
}

/// Serves on an ephemeral port; issued tokens live `expires_in` seconds.
///
/// Secrets: `signing` holds "shhh"; `denied` answers 403, `unauth` 401,
/// `flaky` 503, anything else 404.
pub(crate) async fn spawn(expires_in: u64) -> MockGoogle {
    let counters = Arc::new(Counters::default());
    let state = Arc::new(MockState {
        counters: counters.clone(),
        expires_in,
    });
    let app = Router::new().fallback(handle).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockGoogle { addr, counters }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path();

    if let Some(rest) = path.strip_prefix("/computeMetadata/v1/") {
        let flavor = headers.get("metadata-flavor").map(|v| v.as_bytes());
        if flavor != Some(b"Google".as_slice()) {
            return StatusCode::FORBIDDEN.into_response();
        }
        return match rest {
            "project/project-id" => {
                state.counters.project_lookups.fetch_add(1, Ordering::SeqCst);
                format!("{MOCK_PROJECT}\n").into_response()
            }
            "instance/service-accounts/default/token" => {
                let n = state.counters.token_fetches.fetch_add(1, Ordering::SeqCst) + 1;
                json(format!(
                    r#"{{"access_token":"tok-{n}","expires_in":{},"token_type":"Bearer"}}"#,
                    state.expires_in
                ))
            }
            _ => StatusCode::NOT_FOUND.into_response(),
        };
    }

    let Some(secret) = path
        .strip_prefix(SECRETS_PREFIX)
        .and_then(|rest| rest.strip_suffix("/versions/latest:access"))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer tok-"));
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match secret {
        // "shhh"
        "signing" => json(r#"{"name":"signing","payload":{"data":"c2hoaA=="}}"#.to_string()),
        "denied" => StatusCode::FORBIDDEN.into_response(),
        "unauth" => StatusCode::UNAUTHORIZED.into_response(),
        "flaky" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
