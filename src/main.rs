use std::net::SocketAddr;
use std::sync::Arc;

use linkdrop::allocator::{Allocator, Catalog};
use linkdrop::config::Config;
use linkdrop::discord::audit::AuditLog;
use linkdrop::discord::client::DiscordClient;
use linkdrop::{create_app, storage, AppState, VERSION};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(addr: &SocketAddr, config: &Config, links: usize, users: usize) {
    let display_host = if addr.ip().is_unspecified() {
        "localhost"
    } else {
        &addr.ip().to_string()
    };
    println!();
    println!("  \x1b[36m╔══════════════════════════════════════════╗\x1b[0m");
    println!("  \x1b[36m║\x1b[0m  \x1b[1;35m🔗 linkdrop\x1b[0m                             \x1b[36m║\x1b[0m");
    println!("  \x1b[36m║\x1b[0m  \x1b[90mUnique links, delivered by DM\x1b[0m           \x1b[36m║\x1b[0m");
    println!("  \x1b[36m╚══════════════════════════════════════════╝\x1b[0m");
    println!();
    println!(
        "  \x1b[32m→\x1b[0m Server running at \x1b[1;4mhttp://{}:{}\x1b[0m",
        display_host,
        addr.port()
    );
    println!("  \x1b[32m→\x1b[0m Version: \x1b[33m{}\x1b[0m", VERSION);
    println!(
        "  \x1b[32m→\x1b[0m Catalog: \x1b[33m{}\x1b[0m links, {} per {} min, {} known users",
        links,
        config.max_links,
        config.cooldown.as_secs() / 60,
        users
    );
    println!();
    println!("  \x1b[90mEndpoints:\x1b[0m");
    println!("    \x1b[32mGET \x1b[0m /                  \x1b[90m← Health check\x1b[0m");
    println!("    \x1b[32mGET \x1b[0m /health             \x1b[90m← JSON status\x1b[0m");
    println!("    \x1b[34mPOST\x1b[0m /webhooks/discord  \x1b[90m← Discord interactions\x1b[0m");
    println!();
    println!("  \x1b[90mPress Ctrl+C to stop\x1b[0m");
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let catalog = Catalog::load(&config.links_path).await?;
    if catalog.is_empty() {
        warn!(path = %config.links_path.display(), "catalog is empty, every draw will be refused");
    }

    let store = storage::from_config(&config.storage)?;
    let initial = storage::load_state(store.as_ref()).await;
    let users = initial.len();

    let allocator = Allocator::new(
        Arc::new(catalog),
        config.policy(),
        initial,
        store,
        config.persist_timeout,
    );
    info!(
        links = allocator.catalog().len(),
        users, "allocator ready"
    );

    let discord = DiscordClient::new(&config.discord_bot_token, config.discord_application_id);
    let audit = AuditLog::new(config.log_webhook_url.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    print_banner(&addr, &config, allocator.catalog().len(), users);

    let state = AppState {
        config,
        allocator: Arc::new(allocator),
        discord: Arc::new(discord),
        audit,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
