#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "perch=info".into()),
        )
        .init();

    perch::server::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
