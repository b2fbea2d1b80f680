use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::Parser as _;
use log::{debug, info};
use treevas::{DEFAULT_PORT, RemoteEvent, dashboard::DashboardStatus};

/// Sends queries and commands to a running tree dashboard.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Port the dashboard listens on.
  #[arg(short, long, default_value_t = DEFAULT_PORT)]
  port: u16,

  /// Fits the map to the shown trees after the query.
  #[arg(short, long)]
  reset: bool,

  /// Path to save a screenshot of the map to.
  #[arg(short, long)]
  screenshot: Option<PathBuf>,

  /// Text for the scientific name search. An empty string shows all trees.
  query: Option<String>,
}

impl Args {
  fn events(&self) -> anyhow::Result<Vec<RemoteEvent>> {
    let mut events = Vec::new();
    if let Some(query) = &self.query {
      events.push(RemoteEvent::Query(query.clone()));
    }
    if self.reset {
      events.push(RemoteEvent::Reset);
    }
    if let Some(path) = &self.screenshot {
      let path = std::path::absolute(path)
        .with_context(|| format!("Invalid screenshot path {}", path.display()))?;
      events.push(RemoteEvent::Screenshot(path));
    }
    Ok(events)
  }
}

async fn healthcheck(base: &str) -> anyhow::Result<()> {
  surf::get(format!("{base}/healthcheck"))
    .send()
    .await
    .map_err(|e| anyhow::anyhow!("No dashboard is listening at {base}: {e}"))?;
  Ok(())
}

async fn send_event(base: &str, event: &RemoteEvent) -> anyhow::Result<()> {
  debug!("Sending {event:?}");
  let response = surf::post(format!("{base}/"))
    .body_json(event)
    .map_err(|e| anyhow::anyhow!("Cannot serialize {event:?}: {e}"))?
    .await
    .map_err(|e| anyhow::anyhow!("Failed to send {event:?}: {e}"))?;
  if !response.status().is_success() {
    bail!("The dashboard rejected {event:?} with {}", response.status());
  }
  Ok(())
}

async fn status(base: &str) -> anyhow::Result<DashboardStatus> {
  surf::get(format!("{base}/status"))
    .recv_json()
    .await
    .map_err(|e| anyhow::anyhow!("Failed to read the dashboard status: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  env_logger::init();
  let args = Args::parse();

  let base = format!("http://localhost:{}", args.port);
  healthcheck(&base).await?;

  for event in args.events()? {
    send_event(&base, &event).await?;
  }

  // The dashboard applies events on its next frame.
  tokio::time::sleep(std::time::Duration::from_millis(300)).await;
  let status = status(&base).await?;
  info!("{status:?}");
  println!("{}", status.title);
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::Parser as _;

  use super::*;

  #[test]
  fn events_follow_arguments() {
    let args = Args::parse_from(["treecat", "--reset", "Tilia"]);
    assert_eq!(args.port, DEFAULT_PORT);
    assert_eq!(
      args.events().unwrap(),
      vec![RemoteEvent::Query("Tilia".to_string()), RemoteEvent::Reset]
    );
  }

  #[test]
  fn screenshot_path_is_absolute() {
    let args = Args::parse_from(["treecat", "-s", "map.png"]);
    let events = args.events().unwrap();
    assert!(matches!(&events[..], [RemoteEvent::Screenshot(path)] if path.is_absolute()));
  }
}
