use hal_data_provider::config::AppConfig;
use hal_data_provider::model::OperationParams;
use hal_data_provider::provider::DataProvider;

const USAGE: &str = "usage: hal-data-provider <GET_LIST|GET_ONE|GET_MANY|GET_MANY_REFERENCE|CREATE|UPDATE|DELETE> <resource> [params-json]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging, quiet the HTTP stack
    use env_logger::Builder;
    use log::LevelFilter;

    let own_level = if config.api.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hal_data_provider", own_level)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(kind), Some(resource)) = (args.next(), args.next()) else {
        anyhow::bail!(USAGE);
    };
    let params: OperationParams = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => OperationParams::default(),
    };

    log::info!("{} {} against {}", kind, resource, config.api.base_url);

    let provider = DataProvider::from_config(&config.api)?;
    let response = provider.handle_named(&kind, &resource, params).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
