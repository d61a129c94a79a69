//! Shorten a URL, then delete it.
//!
//! Reads `SEE_API_KEY` (and the other `SEE_*` settings) from the environment
//! or a `.env` file:
//!
//! ```sh
//! SEE_API_KEY=... RUST_LOG=see_core=debug cargo run -p see-core --example quickstart -- https://example.com
//! ```

use see_core::{CreateShortUrlRequest, DeleteShortUrlRequest, SeeClient, SeeError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SeeError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    let client = SeeClient::from_env()?;

    let domains = client.get_domains().await?;
    let domain = domains
        .data
        .domains
        .first()
        .cloned()
        .unwrap_or_else(|| "s.ee".to_string());

    let request = CreateShortUrlRequest::new(&domain, &target)?.with_title("quickstart");
    let created = client.create_short_url(&request).await?;
    let short = created
        .data
        .short_url
        .clone()
        .unwrap_or_else(|| format!("https://{domain}/{}", created.data.slug));
    println!("{target} -> {short}");

    client
        .delete_short_url(&DeleteShortUrlRequest::new(&domain, &created.data.slug)?)
        .await?;
    println!("deleted {short}");

    client.close();
    Ok(())
}
