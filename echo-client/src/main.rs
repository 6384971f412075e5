use anyhow::Context;
use courier_core::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let url = std::env::var("ECHO_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = Client::new(ClientConfig::new(url)).context("building client")?;

    let echoed = echo_client::send_account(&client, &echo_client::sample_account())
        .with_context(|| format!("posting account to {}", client.base_url()))?;
    for mail in &echoed.inbox {
        tracing::info!(remote_email = %mail.remote_email, body = %mail.body, "mail");
    }
    Ok(())
}
