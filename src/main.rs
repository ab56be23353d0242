use clap::Parser;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_filters = [format!("lightconv={}", level), "warn".to_string()];
    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filters.join(","));

    // Logs go to stderr so stdout stays machine-readable.
    let _ = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&log_filters)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = lightconv::cli::Cli::parse();
    init_logging(cli.verbose);
    let exit_code = lightconv::run(cli).await;
    std::process::exit(exit_code);
}
