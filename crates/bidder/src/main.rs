#[tokio::main]
async fn main() {
    bidder::start(std::env::args()).await;
}
