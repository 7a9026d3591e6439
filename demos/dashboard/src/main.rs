//! Geotech dashboard
//!
//! Signs in (or reuses the session saved by an earlier run), then prints the
//! project overview the web dashboard shows.
//!
//! Environment:
//! - `GEOTECH_API_URL`: API base URL (default `http://localhost:8000/geotech`)
//! - `GEOTECH_USERNAME` / `GEOTECH_PASSWORD`: credentials, used when no saved
//!   session exists
//! - `GEOTECH_SESSION_FILE`: where the session is kept (default
//!   `.geotech/session.json`)
//! - `GEOTECH_DOWNLOAD_DIR`: where CPT exports are written (default `.`)
//! - `RUST_LOG`: log filter

use anyhow::{Context, bail};
use geotech_api::{ApiConfig, DirectorySink, FileStorage, GeotechApi, Navigator, Route};
use geotech_stores::{AuthEnvironment, AuthStore, ProjectEnvironment, ProjectStore};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SESSION_FILE: &str = ".geotech/session.json";

/// Prints where the application would go next.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        println!("-> {}", route.path());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "geotech_dashboard=info,geotech_api=info,geotech_stores=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = ApiConfig::from_env();
    let session_file =
        env::var("GEOTECH_SESSION_FILE").unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string());
    let download_dir = env::var("GEOTECH_DOWNLOAD_DIR").unwrap_or_else(|_| ".".to_string());

    tracing::info!(base_url = %config.base_url, session_file = %session_file, "Starting dashboard");

    let api = GeotechApi::builder(config)
        .storage(Arc::new(FileStorage::new(session_file)))
        .navigator(Arc::new(ConsoleNavigator))
        .downloads(Arc::new(DirectorySink::new(download_dir)))
        .build()
        .context("building API client")?;

    let auth = AuthStore::new(AuthEnvironment::new(
        api.auth.clone(),
        Arc::new(ConsoleNavigator),
    ));
    let projects = ProjectStore::new(ProjectEnvironment::new(api.projects.clone()));

    if !auth.is_authenticated().await {
        let (Ok(username), Ok(password)) =
            (env::var("GEOTECH_USERNAME"), env::var("GEOTECH_PASSWORD"))
        else {
            bail!("no saved session; set GEOTECH_USERNAME and GEOTECH_PASSWORD");
        };

        auth.login(username, password)
            .await
            .map_err(|e| anyhow::anyhow!("login failed: {}", e.message()))?;
    }

    if let Some(user) = auth.current_user().await {
        println!("Signed in as user {user}");
    }

    let all = match projects.fetch_projects().await {
        Ok(all) => all,
        Err(error) => {
            if !auth.is_authenticated().await {
                println!("Session expired; sign in again.");
            }
            bail!("loading projects failed: {}", error.message());
        }
    };

    println!("\n{} project(s)", all.len());
    for project in projects.recent_projects().await {
        println!(
            "  #{:<4} {:<30} {:?}  {} CPT test(s), {} layer(s)",
            project.id, project.name, project.status, project.cpt_tests_count, project.layers_count
        );
    }

    match projects.fetch_stats(None).await {
        Ok(stats) => println!(
            "\nTotals: {} CPT test(s), {} soil layer(s), {} active this week",
            stats.total_cpt_tests,
            stats.total_soil_layers,
            stats.recent_activity.unwrap_or_default()
        ),
        Err(error) => tracing::warn!(error = %error, "Statistics unavailable"),
    }

    projects
        .runtime()
        .shutdown(Duration::from_secs(5))
        .await
        .context("stopping project store")?;

    Ok(())
}
