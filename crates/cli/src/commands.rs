use clap::{Args, Subcommand};
use eyre::WrapErr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use terra_stac_api::{router, AppState};
use terra_stac_catalog::MemoryStore;
use terra_stac_config::{Settings, SettingsLoader};
use terra_stac_security::{OidcVerifier, TokenVerifier};

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve(ServeArgs),
    /// Print the effective settings as JSON
    Config,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind, overrides APP_HOST
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overrides APP_PORT
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory with `collections/*.json` and `items/*.json` to load at startup
    #[arg(long, env = "TERRA_STAC_SEED_DIR")]
    pub seed: Option<PathBuf>,
}

impl Commands {
    pub async fn execute(self, config: Option<&Path>) -> eyre::Result<()> {
        let settings = load_settings(config)?;
        match self {
            Commands::Serve(args) => serve(settings, args).await,
            Commands::Config => {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                Ok(())
            }
        }
    }
}

fn load_settings(config: Option<&Path>) -> eyre::Result<Settings> {
    let mut loader = SettingsLoader::new();
    if let Some(path) = config {
        loader = loader.file(path);
    }
    loader.load().wrap_err("failed to load settings")
}

async fn serve(mut settings: Settings, args: ServeArgs) -> eyre::Result<()> {
    if let Some(host) = args.host {
        settings.app_host = host;
    }
    if let Some(port) = args.port {
        settings.app_port = port;
    }

    let verifier: Option<Arc<dyn TokenVerifier>> = match settings.oidc_issuer.as_deref() {
        Some(issuer) => {
            let verifier = OidcVerifier::discover(issuer, settings.oidc_audience.clone())
                .await
                .wrap_err_with(|| format!("OIDC discovery failed for {issuer}"))?;
            Some(Arc::new(verifier))
        }
        None => {
            tracing::warn!("no OIDC issuer configured, only anonymous access is possible");
            None
        }
    };

    let store = MemoryStore::new();
    if let Some(dir) = &args.seed {
        let (collections, items) = store
            .load_dir(dir)
            .wrap_err_with(|| format!("failed to load catalog from {}", dir.display()))?;
        tracing::info!(collections, items, dir = %dir.display(), "loaded catalog");
    }

    let address = settings.bind_address();
    let app = router(AppState::new(Arc::new(store), verifier, settings));
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("failed to bind {address}"))?;
    tracing::info!(address = %address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received interrupt, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for interrupt");
            std::future::pending::<()>().await;
        }
    }
}
