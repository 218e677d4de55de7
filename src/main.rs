/// Civic Complaints - municipal complaint tracking service
use civic_complaints::{
    config::{ServerConfig, DEFAULT_LOG_FILTER},
    error::ServiceResult,
    server, AppContext,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    // Load configuration (reads .env, so RUST_LOG may come from there)
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _______       _         ______                      __      _       __
  / ____(_)   __(_)____   / ____/___  ____ ___  ____  / /___ _(_)___  / /______
 / /   / / | / / / ___/  / /   / __ \/ __ `__ \/ __ \/ / __ `/ / __ \/ __/ ___/
/ /___/ /| |/ / / /__   / /___/ /_/ / / / / / / /_/ / / /_/ / / / / / /_(__  )
\____/_/ |___/_/\___/   \____/\____/_/ /_/ /_/ .___/_/\__,_/_/_/ /_/\__/____/
                                            /_/
        Municipal complaint tracking service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
