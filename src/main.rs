use slotting_engine::api;
use slotting_engine::config::AppConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        let missing_file = matches!(
            err,
            dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        );
        if !missing_file {
            eprintln!("could not load .env: {}", err);
        }
    }

    init_tracing();

    let app_config = AppConfig::from_env();
    tracing::info!("slotting service starting");
    if let Err(err) = api::start_api_server(app_config).await {
        tracing::error!(error = %err, "API server terminated with an error");
        std::process::exit(1);
    }
}
