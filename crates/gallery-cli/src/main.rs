//! Binary entrypoint for the gallery CLI.

#[tokio::main]
async fn main() {
    let exit_code = gallery_cli::run().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
