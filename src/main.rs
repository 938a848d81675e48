use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    chatterfix::logging::init();
    chatterfix::run().await
}
