use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use dlgate_api::{ApiContext, ApiServer, HcaptchaVerifier, HttpMailer, MAIL_API_URL};
use dlgate_cache::CacheManager;
use dlgate_geo::RegionClassifier;
use dlgate_release::GitHubClient;
use dlgate_store::ProductStore;

#[derive(Parser)]
#[command(name = "dlgate")]
#[command(about = "Download gateway API for region-aware product downloads")]
struct Cli {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Product catalog path
    #[arg(long, default_value = "./data/products.json")]
    products: PathBuf,

    /// Cache expire time in seconds
    #[arg(long, default_value = "3600")]
    expire_time: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dlgate=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let cache = Arc::new(CacheManager::new_memory(Duration::from_secs(
        cli.expire_time,
    )));

    let captcha_secret = std::env::var("HCAPTCHA_SECRET_KEY").unwrap_or_default();
    if captcha_secret.is_empty() {
        warn!("HCAPTCHA_SECRET_KEY is not set, contact submissions will be rejected");
    }
    let mail_api_key = std::env::var("MAIL_API_KEY").unwrap_or_default();
    let mail_api_base = std::env::var("MAIL_API_BASE").unwrap_or_else(|_| MAIL_API_URL.into());
    let mail_from =
        std::env::var("MAIL_FROM").unwrap_or_else(|_| "Contact Form <noreply@dlgate.dev>".into());
    let contact_email = std::env::var("CONTACT_EMAIL").unwrap_or_default();
    if contact_email.is_empty() {
        warn!("CONTACT_EMAIL is not set, contact submissions will fail to deliver");
    }

    let context = ApiContext {
        store: ProductStore::new(&cli.products),
        classifier: RegionClassifier::new(cache.clone()),
        github: GitHubClient::new(cache),
        captcha: Box::new(HcaptchaVerifier::new(captcha_secret)),
        mailer: Box::new(HttpMailer::new(
            mail_api_base,
            mail_api_key,
            mail_from,
            contact_email,
        )),
    };

    let (addr, handle) = ApiServer::new(context).start(cli.addr).await?;
    info!("serving on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.abort();

    Ok(())
}
