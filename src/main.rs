#[tokio::main]
async fn main() {
    if let Err(e) = cardioia_lib::run().await {
        eprintln!("cardioia: {e}");
        std::process::exit(1);
    }
}
