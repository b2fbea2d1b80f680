use std::{
  net::SocketAddr,
  path::PathBuf,
  sync::{Arc, Mutex, PoisonError, mpsc::Sender},
};

use axum::{
  Json, Router,
  extract::State,
  http::StatusCode,
  routing::{get, post},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tower_http::trace::{self, TraceLayer};

use crate::dashboard::DashboardStatus;

/// What another process can ask a running dashboard to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEvent {
  /// Same as typing the text into the search field.
  Query(String),
  /// Fit the map to the shown trees.
  Reset,
  /// Save the map as png.
  Screenshot(PathBuf),
}

/// The handle the http server uses to reach the UI thread.
#[derive(Clone)]
pub struct Remote {
  events: Sender<RemoteEvent>,
  status: Arc<Mutex<DashboardStatus>>,
  update: egui::Context,
}

impl Remote {
  /// The receiver has to be drained by the UI thread.
  #[must_use]
  pub fn new(update: egui::Context) -> (Self, std::sync::mpsc::Receiver<RemoteEvent>) {
    let (events, receiver) = std::sync::mpsc::channel();
    (
      Self {
        events,
        status: Arc::default(),
        update,
      },
      receiver,
    )
  }

  /// Forwards the event and wakes the UI. Returns false if the UI is gone.
  pub fn handle_event(&self, event: RemoteEvent) -> bool {
    let sent = self
      .events
      .send(event)
      .inspect_err(|e| error!("Failed to forward remote event: {e}"))
      .is_ok();
    self.update.request_repaint();
    sent
  }

  pub fn publish_status(&self, status: DashboardStatus) {
    *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
  }

  #[must_use]
  pub fn status(&self) -> DashboardStatus {
    self
      .status
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

async fn event_handler(
  State(remote): State<Remote>,
  Json(event): Json<RemoteEvent>,
) -> Result<&'static str, StatusCode> {
  if remote.handle_event(event) {
    Ok("ok")
  } else {
    Err(StatusCode::SERVICE_UNAVAILABLE)
  }
}

async fn status_handler(State(remote): State<Remote>) -> Json<DashboardStatus> {
  Json(remote.status())
}

async fn healthcheck() {}

pub fn router(remote: Remote) -> Router {
  Router::new()
    .route("/", post(event_handler))
    .route("/status", get(status_handler))
    .route("/healthcheck", get(healthcheck))
    .with_state(remote)
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
    )
}

/// Serves until the listener fails.
///
/// # Errors
/// If serving on the listener fails.
pub async fn serve(listener: tokio::net::TcpListener, remote: Remote) -> std::io::Result<()> {
  info!("Remote listening on {}", listener.local_addr()?);
  axum::serve(listener, router(remote)).await
}

/// # Errors
/// If the port cannot be bound.
pub async fn remote_runner(remote: Remote, port: u16) -> std::io::Result<()> {
  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  let listener = tokio::net::TcpListener::bind(addr).await?;
  serve(listener, remote).await
}

/// Runs the remote on its own thread. Failing to bind is logged, the dashboard keeps working.
pub fn spawn_remote_runner(runtime: tokio::runtime::Handle, remote: Remote, port: u16) {
  std::thread::spawn(move || {
    runtime.block_on(async {
      let _ = remote_runner(remote, port)
        .await
        .inspect_err(|e| error!("Remote on port {port} stopped: {e}"));
    });
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn event_json() {
    assert_eq!(
      serde_json::to_string(&RemoteEvent::Query("Tilia".to_string())).unwrap(),
      r#"{"Query":"Tilia"}"#
    );
    assert_eq!(
      serde_json::from_str::<RemoteEvent>(r#""Reset""#).unwrap(),
      RemoteEvent::Reset
    );
    assert_eq!(
      serde_json::from_str::<RemoteEvent>(r#"{"Screenshot":"a.png"}"#).unwrap(),
      RemoteEvent::Screenshot(PathBuf::from("a.png"))
    );
  }

  #[test]
  fn events_reach_the_receiver() {
    let (remote, receiver) = Remote::new(egui::Context::default());
    assert!(remote.handle_event(RemoteEvent::Reset));
    assert_eq!(receiver.try_recv(), Ok(RemoteEvent::Reset));
    drop(receiver);
    assert!(!remote.handle_event(RemoteEvent::Reset));
  }

  #[tokio::test]
  async fn http_roundtrip() {
    let (remote, receiver) = Remote::new(egui::Context::default());
    remote.publish_status(DashboardStatus {
      title: "There are 3 Tilia in Barcelona.".to_string(),
      query: Some("Tilia".to_string()),
      count: 3,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, remote));

    let mut response = surf::post(format!("http://{addr}/"))
      .body_json(&RemoteEvent::Query("Plat".to_string()))
      .unwrap()
      .await
      .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body_string().await.unwrap(), "ok");
    assert_eq!(
      receiver.try_recv(),
      Ok(RemoteEvent::Query("Plat".to_string()))
    );

    let status: DashboardStatus = surf::get(format!("http://{addr}/status"))
      .recv_json()
      .await
      .unwrap();
    assert_eq!(status.count, 3);
    assert_eq!(status.query.as_deref(), Some("Tilia"));
  }
}
