mod detect;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = detect::ServeConfig::from_args(&args)?;
    detect::telemetry::init(config.verbose);

    let registry = detect::registry::bootstrap(&config);
    detect::run(config, std::sync::Arc::new(registry))
}
