use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    birdsong_lib::run(birdsong_lib::Args::parse()).await
}
