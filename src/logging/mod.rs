use std::{fmt::Write as _, thread};

use chrono::{format::DelayedFormat, DateTime, Local};
use once_cell::sync::Lazy;
use strum::Display;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 緩衝超過這個長度就寫入檔案
const FLUSH_THRESHOLD: usize = 4096;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

pub struct Logger {
    writer: UnboundedSender<LogMessage>,
}

impl Logger {
    /// 建立一個寫入 `log/%Y-%m-%d-{log_name}.log` 的日誌，檔案寫入由另一個線程處理
    pub fn new(log_name: &str) -> Self {
        let (tx, mut rx) = unbounded_channel::<LogMessage>();
        let fn_pattern = format!("log/%Y-%m-%d-{}.log", log_name);

        thread::spawn(move || {
            let mut rotate = Rotate::new(fn_pattern);
            let mut line = String::with_capacity(FLUSH_THRESHOLD);

            while let Some(received) = rx.blocking_recv() {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= FLUSH_THRESHOLD {
                    if let Err(why) = rotate.write_msg(received.created_at, line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    rotate.flush();
                    line.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
