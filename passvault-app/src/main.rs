#[tokio::main]
async fn main() {
    if let Err(e) = passvault_app_lib::run().await {
        eprintln!("FATAL ERROR: {:#}", e);
        std::process::exit(1);
    }
}
