use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing_subscriber::EnvFilter;

/// 获取当前时间 (UTC)
pub fn utc_now() -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc()
}

/// Open the database, creating the file if needed, and bring the schema up to date.
pub async fn open_database(url: &str) -> crate::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = if url.contains(":memory:") {
        // the database lives only as long as its single connection
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };
    let database = pool.connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&database).await?;
    Ok(database)
}

/// Turn a database path into a sqlite url.
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

/// 初始化日志
pub fn init_log(log: Option<&Path>) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let subscriber_builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true);
    let (non_blocking, guard, ansi) = if let Some(log) = log {
        // output to file，daily rotate, non-blocking
        if !log.is_dir() {
            anyhow::bail!("log path {} is not a directory", log.display());
        }
        let file_appender = tracing_appender::rolling::daily(log, "course_server.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        (writer, guard, false)
    } else {
        // output to stdout
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (writer, guard, true)
    };
    tracing::subscriber::set_global_default(
        subscriber_builder
            .with_ansi(ansi)
            .with_writer(non_blocking)
            .finish(),
    )?;
    Ok(guard)
}
