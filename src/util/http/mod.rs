use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, Response};
use tokio::sync::Semaphore;

use crate::{error::SyncError, logging::Logger, util};

pub mod element;

/// 來源網站對請求頻率敏感，一次只送出一個請求
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(1));

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 每次請求後的間隔，避免被目標網站封禁
const REQUEST_DELAY: Duration = Duration::from_millis(300);

/// An asynchronous trait that converts a reqwest::Response body from EUC-KR to UTF-8.
#[async_trait]
pub trait TextForceEucKr {
    async fn text_force_euc_kr(self) -> Result<String, SyncError>;
}

#[async_trait]
impl TextForceEucKr for Response {
    async fn text_force_euc_kr(self) -> Result<String, SyncError> {
        Ok(util::text::euc_kr_2_utf8(self.bytes().await?.as_ref()))
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client, SyncError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .gzip(true)
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(15))
            .tcp_keepalive(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|why| {
                SyncError::SourceUnavailable(format!(
                    "Failed to create reqwest client: {:?}",
                    why
                ))
            })
    })
}

/// Performs an HTTP GET request and returns the EUC-KR body as UTF-8 text.
pub async fn get_use_euc_kr(url: &str) -> Result<String, SyncError> {
    send(Method::GET, url).await?.text_force_euc_kr().await
}

/// 送出請求，非 2xx 的回應也視為來源無法使用。不做重試，由呼叫端決定。
async fn send(method: Method, url: &str) -> Result<Response, SyncError> {
    let visit_log = format!("{method}:{url}");
    let rb = get_client()?.request(method, url);

    let permit = SEMAPHORE.acquire().await;
    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    tokio::time::sleep(REQUEST_DELAY).await;
    drop(permit);

    match res {
        Ok(response) if response.status().is_success() => {
            LOGGER.info(format!("{} {} ms", visit_log, elapsed));
            Ok(response)
        }
        Ok(response) => {
            let status = response.status();
            LOGGER.error(format!("{} responded {}. {} ms", visit_log, status, elapsed));
            Err(SyncError::SourceUnavailable(format!(
                "{} responded {}",
                url, status
            )))
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(why.into())
        }
    }
}
