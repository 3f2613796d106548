#[tokio::main]
async fn main() {
    novabot::resources::main().await;
}
