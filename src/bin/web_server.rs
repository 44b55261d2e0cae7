use std::{net::SocketAddr, path::PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use course_server::{
    api::create_app,
    config::{Config, jwt_secret},
    server::Server,
    utils::{database_url, init_log, open_database},
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Path to database file
    #[arg(short, long)]
    database: Option<PathBuf>,
    #[arg(short = 'H', long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    let _guard = init_log(config.log_dir.as_deref())?;
    let secret = jwt_secret()?;

    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = open_database(&database_url(&config.database)).await?;
    let server = Server::from_config(database, &config, &secret);
    let app = create_app(server, &config).await?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    match &config.tls {
        Some(tls) => {
            let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
            let rustls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("Starting server at https://{}", addr);
            info!("Swagger UI available at https://{}/swagger-ui/", addr);
            axum_server::bind_rustls(addr, rustls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Starting server at http://{}", addr);
            info!("Swagger UI available at http://{}/swagger-ui/", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("shutting down");
                })
                .await?;
        }
    }
    Ok(())
}
