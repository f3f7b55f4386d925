//! CLI command implementations

pub mod breakdown;
pub mod demo;
pub mod networth;
pub mod queue;
pub mod reset;
pub mod setup;
pub mod status;
pub mod summary;
pub mod sync;
pub mod xirr;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};

use harbor_core::adapters::demo::DemoGateway;
use harbor_core::adapters::http::HttpGateway;
use harbor_core::config::Config;
use harbor_core::ports::{AuthProvider, ConnectivityProvider, RemoteGateway};
use harbor_core::services::DateRange;
use harbor_core::HarborContext;

/// Get the harbor directory from environment or default
pub fn get_harbor_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HARBOR_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".harbor")
    }
}

/// Token-backed auth collaborator: de-authentication clears the stored
/// API token so the next sync attempt fails fast instead of looping 401s
struct CliAuthProvider {
    harbor_dir: PathBuf,
}

impl AuthProvider for CliAuthProvider {
    fn is_authenticated(&self) -> bool {
        Config::load(&self.harbor_dir)
            .map(|c| c.api_token.is_some())
            .unwrap_or(false)
    }

    fn deauthenticate(&self) {
        if let Ok(mut config) = Config::load(&self.harbor_dir) {
            config.api_token = None;
            let _ = config.save(&self.harbor_dir);
        }
        eprintln!("[harbor] server rejected credentials; run 'hb setup' again");
    }
}

/// The CLI runs on demand, so reachability is simply assumed; a failed
/// request surfaces as an ordinary transport error in the sync report
struct CliConnectivityProvider;

impl ConnectivityProvider for CliConnectivityProvider {
    fn is_online(&self) -> bool {
        true
    }
}

/// Get or create harbor context
pub fn get_context() -> Result<HarborContext> {
    let harbor_dir = get_harbor_dir();
    std::fs::create_dir_all(&harbor_dir)
        .with_context(|| format!("Failed to create {}", harbor_dir.display()))?;

    let config = Config::load(&harbor_dir)?;

    let gateway: Arc<dyn RemoteGateway> = if config.demo_mode {
        Arc::new(DemoGateway::new())
    } else {
        let url = config
            .server_url
            .as_deref()
            .context("No server configured. Run 'hb setup <url> --token <token>' or 'hb demo on'.")?;
        let token = config.api_token.as_deref().unwrap_or_default();
        Arc::new(HttpGateway::new(url, token).map_err(|e| anyhow::anyhow!(e.to_string()))?)
    };

    let auth = Arc::new(CliAuthProvider {
        harbor_dir: harbor_dir.clone(),
    });

    HarborContext::new(&harbor_dir, gateway, auth, Arc::new(CliConnectivityProvider))
}

/// Resolve a --from/--to pair into an inclusive range.
/// The end defaults to today, the start to one year before the end.
pub fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange> {
    let end = match to {
        Some(s) => parse_date_arg(s)?,
        None => Utc::now().date_naive(),
    };
    let start = match from {
        Some(s) => parse_date_arg(s)?,
        None => end - Duration::days(364),
    };
    if start > end {
        bail!("Range start {} is after end {}", start, end);
    }
    Ok(DateRange::new(start, end))
}

fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}
