use std::sync::Arc;

use anyhow::Context;

use fitshop_api::accounts::{AccountSettings, Accounts};
use fitshop_api::app::{self, AppServices};
use fitshop_api::config::AppConfig;
use fitshop_auth::{CredentialCodec, HashCost};
use fitshop_infra::{InMemoryStore, LogMailer, Mailer, SmtpMailer, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();
    fitshop_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;

    let store = connect_store(&config).await?;
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).context("configuring SMTP transport")?),
        None => {
            tracing::warn!("MAIL_HOST not set; reset emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let accounts = Accounts::new(
        Arc::new(CredentialCodec::new(&config.secret)),
        AccountSettings {
            frontend_url: config.frontend_url.clone(),
            mail_from: config.mail_from.clone(),
            hash_cost: HashCost::standard(),
        },
    );

    let app = app::build_app(AppServices::new(store, mailer, accounts, config.cookie_secure));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.database_url() {
        Some(url) => {
            let store = fitshop_infra::PostgresStore::connect(url)
                .await
                .context("connecting to Postgres")?;
            store.ensure_schema().await.context("applying schema")?;
            tracing::info!("using Postgres store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    if config.database_url().is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
    }
    tracing::warn!("using in-memory store; data is lost on restart");
    Ok(Arc::new(InMemoryStore::new()))
}
