#[tokio::main]
async fn main() {
    novabot::main().await;
}
