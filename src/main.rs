use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = fetch_relay::cli::Cli::parse();
    if let Err(e) = fetch_relay::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
