//! git-browse - a read-only JSON front end for a directory of git repositories
//!
//! # Usage
//! ```bash
//! git-browse /srv/git                          # Serve every repository under /srv/git
//! git-browse /srv/git --port 8080 --open       # Pick a port and open the browser
//! git-browse /srv/git --archive-cache /var/cache/git-browse --archive-work /tmp/git-browse
//! ```

mod config;
mod error;
mod git;
mod lookup;
mod models;
mod resolver;
mod routes;
#[cfg(test)]
mod test_support;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{ArchiveConfig, Config, GitConfig};
use git::{Archiver, GitRunner, SubmoduleUrlResolver};
use lookup::RepositoryLookup;
use resolver::DiskRepoResolver;

/// git-browse - Browse a directory of git repositories over HTTP
#[derive(Parser)]
#[command(name = "git-browse")]
#[command(about = "A read-only git repository browser", long_about = None)]
struct Cli {
    /// Directory holding the repositories to serve
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "GIT_BROWSE_HOST")]
    host: IpAddr,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001", env = "GIT_BROWSE_PORT")]
    port: u16,

    /// git binary used for blame, log and archives
    #[arg(long, default_value = "git", env = "GIT_BROWSE_GIT")]
    git: PathBuf,

    /// Seconds a git command may run before it is killed (0 = no limit)
    #[arg(long, default_value = "30")]
    git_timeout: u64,

    /// git processes a single request may run at once
    #[arg(long, default_value = "8")]
    git_jobs: usize,

    /// Directory finished archives are kept in; archives are disabled without it
    #[arg(long, requires = "archive_work")]
    archive_cache: Option<PathBuf>,

    /// Scratch directory archives are generated in
    #[arg(long, requires = "archive_cache")]
    archive_work: Option<PathBuf>,

    /// Open browser automatically after starting
    #[arg(short, long)]
    open: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let archive = match (self.archive_cache, self.archive_work) {
            (Some(cache_dir), Some(work_dir)) => Some(ArchiveConfig { cache_dir, work_dir }),
            _ => None,
        };

        Config {
            root: self.root,
            listen: SocketAddr::new(self.host, self.port),
            git: GitConfig::new(self.git, self.git_timeout).with_jobs(self.git_jobs),
            archive,
        }
    }
}

fn build_lookup(config: &Config) -> RepositoryLookup {
    let runner = Arc::new(GitRunner::new(&config.git));
    let resolver = DiskRepoResolver::new(&config.root, Arc::clone(&runner));

    let mut lookup =
        RepositoryLookup::new(resolver).with_submodule_urls(SubmoduleUrlResolver::default());
    if let Some(archive) = &config.archive {
        lookup = lookup.with_archiver(Archiver::new(archive.clone(), runner));
    }
    lookup
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let open_browser = cli.open;
    let config = cli.into_config();

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !config.root.is_dir() {
        anyhow::bail!("{} is not a directory", config.root.display());
    }

    let lookup = Arc::new(build_lookup(&config));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(lookup))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind to {}", config.listen))?;

    let url = format!("http://{}", config.listen);
    tracing::info!(
        root = %config.root.display(),
        url = %url,
        archives = config.archive.is_some(),
        "serving repositories"
    );
    println!();
    println!("  Repositories: {}", config.root.display());
    println!("  Server:       {}/api/v1/repositories", url);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    if open_browser {
        if let Err(e) = open::that(format!("{}/api/v1/repositories", url)) {
            eprintln!("  Warning: Could not open browser: {}", e);
        }
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
