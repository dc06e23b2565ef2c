use std::env;

use tokio::sync::watch;

use crate::{
    backfill::DailyUpdate,
    crawler::{krx::Krx, naver::daily_price::DailyPriceFetcher, naver::Naver},
    database::{PostgresStore, Store},
    scheduler::{shutdown_on, Scheduler},
};

pub mod backfill;
pub mod config;
pub mod crawler;
pub mod database;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod util;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        logging::error_console("The rustls crypto provider is already installed".to_string());
    }

    let settings = &config::SETTINGS;
    logging::info_console(format!(
        "DailyPriceCrawler 已啟動 OS/Arch: {}/{} pages_to_fetch: {} schedule: {:02}:{:02}",
        env::consts::OS,
        env::consts::ARCH,
        settings.crawler.pages_to_fetch,
        settings.schedule.hour,
        settings.schedule.minute
    ));

    let store = PostgresStore::new();
    // 失敗時每一輪開始前會再試一次
    if let Err(why) = store.ensure_schema().await {
        logging::error_file_async(format!("Failed to ensure the schema because {:?}", why));
    }

    let update = DailyUpdate::new(
        store,
        Krx {},
        DailyPriceFetcher::new(Naver {}),
        settings.crawler.pages_to_fetch,
    );
    let mut scheduler = Scheduler::new(update, settings.schedule.time());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_on(tokio::signal::ctrl_c(), shutdown_tx));

    scheduler.run(shutdown_rx).await;
}
