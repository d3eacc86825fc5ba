mod app;
mod assets;
mod camera;
mod config;
mod core;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let config = config::from_cli_args();
    app::run(config)
}
