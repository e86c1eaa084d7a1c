//! Email worker entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    taskhive_email_worker::run().await
}
