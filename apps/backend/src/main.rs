#[tokio::main]
async fn main() -> anyhow::Result<()> {
    exercise_player_backend::run().await
}
