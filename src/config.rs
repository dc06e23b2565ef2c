use std::{env, fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

/// 每家公司每輪預設抓取的頁數
pub const DEFAULT_PAGES_TO_FETCH: u32 = 1;
/// 每日排程預設的執行時間 17:00
pub const DEFAULT_SCHEDULE_HOUR: u32 = 17;
pub const DEFAULT_SCHEDULE_MINUTE: u32 = 0;

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub postgresql: PostgreSQL,
    #[serde(default)]
    pub crawler: Crawler,
    #[serde(default)]
    pub schedule: Schedule,
}

const POSTGRESQL_HOST: &str = "POSTGRESQL_HOST";
const POSTGRESQL_PORT: &str = "POSTGRESQL_PORT";
const POSTGRESQL_USER: &str = "POSTGRESQL_USER";
const POSTGRESQL_PASSWORD: &str = "POSTGRESQL_PASSWORD";
const POSTGRESQL_DB: &str = "POSTGRESQL_DB";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PostgreSQL {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_postgresql_port")]
    pub port: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: String,
}

fn default_postgresql_port() -> i32 {
    5432
}

impl Default for PostgreSQL {
    fn default() -> Self {
        PostgreSQL {
            host: "localhost".to_string(),
            port: default_postgresql_port(),
            user: Default::default(),
            password: Default::default(),
            db: Default::default(),
        }
    }
}

const PAGES_TO_FETCH: &str = "PAGES_TO_FETCH";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Crawler {
    /// 每家公司每輪最多抓取的分頁數
    #[serde(default = "default_pages_to_fetch")]
    pub pages_to_fetch: u32,
}

fn default_pages_to_fetch() -> u32 {
    DEFAULT_PAGES_TO_FETCH
}

impl Default for Crawler {
    fn default() -> Self {
        Crawler {
            pages_to_fetch: DEFAULT_PAGES_TO_FETCH,
        }
    }
}

const SCHEDULE_HOUR: &str = "SCHEDULE_HOUR";
const SCHEDULE_MINUTE: &str = "SCHEDULE_MINUTE";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Schedule {
    #[serde(default = "default_schedule_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

fn default_schedule_hour() -> u32 {
    DEFAULT_SCHEDULE_HOUR
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            hour: DEFAULT_SCHEDULE_HOUR,
            minute: DEFAULT_SCHEDULE_MINUTE,
        }
    }
}

impl Schedule {
    /// 每日執行的本地時間，超出範圍時為 17:00
    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .or_else(|| NaiveTime::from_hms_opt(DEFAULT_SCHEDULE_HOUR, DEFAULT_SCHEDULE_MINUTE, 0))
            .unwrap_or(NaiveTime::MIN)
    }
}

/// 寫回設定檔時只保留非機密的區段
#[derive(Serialize)]
struct PersistedApp<'a> {
    crawler: &'a Crawler,
    schedule: &'a Schedule,
}

pub static SETTINGS: Lazy<App> = Lazy::new(App::get);

impl App {
    /// 讀取 app.json（若存在）後以 env 覆蓋，任何錯誤都退回預設值
    fn get() -> Self {
        let config_path = config_path();
        if !config_path.exists() {
            let app = App::default().override_with_env().normalize();
            if let Err(why) = app.write_default_file(&config_path) {
                logging::error_file_async(format!("{:?}", why));
            }
            return app;
        }

        match Self::from_file(config_path) {
            Ok(app) => app.override_with_env().normalize(),
            Err(why) => {
                logging::error_file_async(format!(
                    "I can't read the config context because {:?}",
                    why
                ));
                App::default().override_with_env().normalize()
            }
        }
    }

    fn from_file(path: PathBuf) -> Result<Self> {
        let app = config_config::builder()
            .add_source(config_file::from(path))
            .build()?
            .try_deserialize::<App>()?;

        Ok(app)
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(POSTGRESQL_HOST) {
            self.postgresql.host = host;
        }

        if let Ok(port) = env::var(POSTGRESQL_PORT) {
            self.postgresql.port = i32::from_str(&port).unwrap_or(5432);
        }

        if let Ok(user) = env::var(POSTGRESQL_USER) {
            self.postgresql.user = user;
        }

        if let Ok(password) = env::var(POSTGRESQL_PASSWORD) {
            self.postgresql.password = password;
        }

        if let Ok(db) = env::var(POSTGRESQL_DB) {
            self.postgresql.db = db;
        }

        if let Ok(pages) = env::var(PAGES_TO_FETCH) {
            self.crawler.pages_to_fetch = u32::from_str(&pages).unwrap_or(DEFAULT_PAGES_TO_FETCH);
        }

        if let Ok(hour) = env::var(SCHEDULE_HOUR) {
            self.schedule.hour = u32::from_str(&hour).unwrap_or(DEFAULT_SCHEDULE_HOUR);
        }

        if let Ok(minute) = env::var(SCHEDULE_MINUTE) {
            self.schedule.minute = u32::from_str(&minute).unwrap_or(DEFAULT_SCHEDULE_MINUTE);
        }

        self
    }

    /// 修正超出範圍的數值
    fn normalize(mut self) -> Self {
        // 至少要抓第一頁才知道總頁數
        if self.crawler.pages_to_fetch == 0 {
            logging::warn_file_async("pages_to_fetch is 0, use 1 instead".to_string());
            self.crawler.pages_to_fetch = 1;
        }

        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            logging::warn_file_async(format!(
                "The schedule {:02}:{:02} is out of range, use {:02}:{:02} instead",
                self.schedule.hour,
                self.schedule.minute,
                DEFAULT_SCHEDULE_HOUR,
                DEFAULT_SCHEDULE_MINUTE
            ));
            self.schedule = Schedule::default();
        }

        self
    }

    /// 第一次啟動時建立含預設抓取頁數的設定檔
    fn write_default_file(&self, path: &PathBuf) -> Result<()> {
        let persisted = PersistedApp {
            crawler: &self.crawler,
            schedule: &self.schedule,
        };
        let json = serde_json::to_string_pretty(&persisted)?;
        fs::write(path, json).context(format!("Failed to write {}", path.display()))
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
