//! Live reload server.
//!
//! Pages rendered in debug mode open an `EventSource` on `GET /` of this
//! server and reload on every `change` event.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assetpipe_builders::reload::CHANGE_EVENT;
use assetpipe_builders::Broker;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{CliError, Result};

pub struct LivereloadServer {
    addr: SocketAddr,
    broker: Arc<Broker>,
}

impl LivereloadServer {
    /// Server on `127.0.0.1:port`.
    pub fn new(port: u16, broker: Arc<Broker>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            broker,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Router serving the event stream, usable with any listener.
    pub fn router(broker: Arc<Broker>) -> Router {
        Router::new()
            .route("/", get(handle_events))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(broker)
    }

    /// Bind and serve until the task is dropped.
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", self.addr, e)))?;

        tracing::debug!("livereload listening on {}", self.addr);

        axum::serve(listener, Self::router(self.broker))
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

async fn handle_events(
    State(broker): State<Arc<Broker>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = broker.subscribe();
    tracing::debug!("livereload client connected ({} total)", broker.subscriber_count());

    let stream =
        ReceiverStream::new(rx).map(|data| Ok(Event::default().event(CHANGE_EVENT).data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
