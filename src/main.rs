use gitdeck::ui::output;

#[tokio::main]
async fn main() {
    if let Err(err) = gitdeck::cli::run().await {
        output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
