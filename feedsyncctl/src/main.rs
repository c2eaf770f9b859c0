use clap::Parser;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = feedsyncctl::Cli::parse();
    if let Err(err) = feedsyncctl::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
