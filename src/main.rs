mod cache;
mod config;
mod lifecycle;
mod net;
mod router;
mod sync;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use cache::{CacheStorage, SqliteStorage};
use net::{HttpFetcher, Request};
use router::RouteOutcome;
use worker::Worker;

#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(about = "Offline-first caching worker for an app shell and its media")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shellcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the install/activate replacement cycle for the configured version
  Deploy,
  /// Route a single request and print the outcome
  Fetch { url: String },
  /// List stores and their entry counts
  Status,
  /// Prune the media store down to the given URLs
  Clean { urls: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  let storage = SqliteStorage::open()?;
  let fetcher = HttpFetcher::new()?;
  let mut worker = Worker::new(config, storage, fetcher);

  match args.command {
    Command::Deploy => {
      worker.install().await?;
      let removed = worker.activate()?;
      println!(
        "deployed {} ({} stale store{} removed)",
        worker.config().static_store_name(),
        removed,
        if removed == 1 { "" } else { "s" }
      );
    }
    Command::Fetch { url } => {
      let req = Request::parse(&url)?;
      match worker.handle_fetch(&req).await? {
        RouteOutcome::Respond(result) => {
          println!(
            "{} {} ({} bytes, {:?})",
            result.response.status,
            result.response.url,
            result.response.body.len(),
            result.source
          );
        }
        RouteOutcome::Unavailable => println!("unavailable: network and cache both missed"),
        RouteOutcome::PassThrough => println!("pass-through: not intercepted"),
      }
    }
    Command::Status => {
      for name in worker.storage().store_names()? {
        let count = worker.storage().keys(&name)?.len();
        println!("{}: {} entries", name, count);
      }
    }
    Command::Clean { urls } => {
      let message = serde_json::json!({ "action": "cleanGiphyCache", "giphys": urls });
      let removed = worker.handle_message(&message.to_string())?;
      println!("pruned {} media entries", removed);
    }
  }

  Ok(())
}
