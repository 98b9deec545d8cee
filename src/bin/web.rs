use mahiti_dashboard::app;
use mahiti_dashboard::config::{Config, init_logging};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file from the first argument, else DASHBOARD_CONFIG
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("DASHBOARD_CONFIG").ok())
        .map(PathBuf::from);

    let config = Config::load(path.as_deref())?;
    init_logging(&config);

    println!("Starting dashboard API on {}", config.bind_address());
    app::run(config).await
}
