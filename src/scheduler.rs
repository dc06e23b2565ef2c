use std::{future::Future, io, time::Duration};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::{sync::watch, time};

use crate::{error::SyncError, logging, util::datetime};

/// 每天執行一次的工作
#[async_trait]
pub trait DailyTask: Send {
    async fn run(&mut self) -> Result<(), SyncError>;
}

/// 排程的狀態：Idle → Running → Waiting → Running ...，收到停止訊號後為 Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    /// 等待到指定的本地時間
    Waiting(NaiveDateTime),
    Stopped,
}

/// 立即執行一次工作，之後每天在 `at`（本地時間）再執行
pub struct Scheduler<T> {
    task: T,
    at: NaiveTime,
    state: State,
}

impl<T: DailyTask> Scheduler<T> {
    pub fn new(task: T, at: NaiveTime) -> Self {
        Scheduler {
            task,
            at,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// 執行到 `shutdown` 變成 `true` 為止。
    ///
    /// 工作失敗只記錄下來，仍會排定下一次。
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            self.state = match self.state {
                State::Idle => State::Running,
                State::Running => {
                    if let Err(why) = self.task.run().await {
                        logging::error_file_async(format!(
                            "Failed to run the daily update because {:?}",
                            why
                        ));
                    }

                    let next = next_trigger(Local::now().naive_local(), self.at);
                    logging::info_file_async(format!(
                        "Waiting for next update ({}) ...",
                        next.format("%Y-%m-%d %H:%M")
                    ));
                    State::Waiting(next)
                }
                State::Waiting(next) => {
                    if *shutdown.borrow_and_update() {
                        State::Stopped
                    } else {
                        tokio::select! {
                            _ = time::sleep(until(next)) => State::Running,
                            changed = shutdown.changed() => match changed {
                                Ok(_) if *shutdown.borrow_and_update() => State::Stopped,
                                Ok(_) => State::Waiting(next),
                                // 發送端已不存在，不會再有停止訊號
                                Err(_) => {
                                    time::sleep(until(next)).await;
                                    State::Running
                                }
                            },
                        }
                    }
                }
                State::Stopped => {
                    logging::info_file_async("The scheduler is stopped".to_string());
                    return;
                }
            };
        }
    }
}

/// 等待 `signal` 完成後送出停止訊號。
///
/// 無法監聽時只記錄下來不送出，`shutdown` 被丟棄後排程仍依時間繼續執行。
pub async fn shutdown_on<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(_) => {
            logging::info_console("Shutting down ...".to_string());
            let _ = shutdown.send(true);
        }
        Err(why) => logging::error_console(format!(
            "Failed to listen for the shutdown signal because {:?}",
            why
        )),
    }
}

/// 下一次執行的時間：`now` 的隔天 `at`，跨月與跨年由日曆計算
pub fn next_trigger(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    now.date()
        .succ_opt()
        .unwrap_or(NaiveDate::MAX)
        .and_time(at)
}

/// 從現在到 `next`（本地時間）的間隔，已經過了就是 0
fn until(next: NaiveDateTime) -> Duration {
    datetime::to_local(next)
        .and_then(|at| (at - Local::now()).to_std().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::sync::Notify;

    use super::*;

    fn at_17() -> NaiveTime {
        NaiveTime::from_hms_opt(17, 0, 0).unwrap()
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[derive(Clone, Default)]
    struct CountingTask {
        runs: Arc<AtomicUsize>,
        ran: Arc<Notify>,
        fail: bool,
    }

    #[async_trait]
    impl DailyTask for CountingTask {
        async fn run(&mut self) -> Result<(), SyncError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.ran.notify_one();
            if self.fail {
                return Err(SyncError::StorageUnavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_next_trigger_same_month() {
        assert_eq!(
            next_trigger(datetime(2024, 5, 3, 17), at_17()),
            datetime(2024, 5, 4, 17)
        );
        assert_eq!(
            next_trigger(datetime(2024, 5, 3, 9), at_17()),
            datetime(2024, 5, 4, 17)
        );
    }

    #[test]
    fn test_next_trigger_month_end() {
        assert_eq!(
            next_trigger(datetime(2024, 4, 30, 17), at_17()),
            datetime(2024, 5, 1, 17)
        );
        assert_eq!(
            next_trigger(datetime(2024, 2, 29, 23), at_17()),
            datetime(2024, 3, 1, 17)
        );
        assert_eq!(
            next_trigger(datetime(2023, 2, 28, 17), at_17()),
            datetime(2023, 3, 1, 17)
        );
    }

    #[test]
    fn test_next_trigger_year_end() {
        assert_eq!(
            next_trigger(datetime(2024, 12, 31, 17), at_17()),
            datetime(2025, 1, 1, 17)
        );
    }

    #[test]
    fn test_next_trigger_keeps_minutes() {
        let at = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        assert_eq!(
            next_trigger(datetime(2024, 5, 3, 17), at),
            NaiveDate::from_ymd_opt(2024, 5, 4)
                .unwrap()
                .and_hms_opt(18, 30, 0)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_shutdown_before_wait_runs_once() {
        let task = CountingTask::default();
        let (tx, rx) = watch::channel(true);
        let mut scheduler = Scheduler::new(task.clone(), at_17());

        scheduler.run(rx).await;

        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), State::Stopped);
        drop(tx);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let task = CountingTask {
            fail: true,
            ..Default::default()
        };
        let (tx, rx) = watch::channel(false);
        let ran = task.ran.clone();
        let runs = task.runs.clone();

        let handle = tokio::spawn(async move {
            let mut scheduler = Scheduler::new(task, at_17());
            scheduler.run(rx).await;
            scheduler.state()
        });

        ran.notified().await;
        tx.send(true).unwrap();

        let state = time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, State::Stopped);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    /// 第 `stop_at` 次執行時送出停止訊號
    struct StopAt {
        runs: Arc<AtomicUsize>,
        stop_at: usize,
        shutdown: watch::Sender<bool>,
    }

    #[async_trait]
    impl DailyTask for StopAt {
        async fn run(&mut self) -> Result<(), SyncError> {
            let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if runs == self.stop_at {
                let _ = self.shutdown.send(true);
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wakes_up_and_runs_again() {
        let (tx, rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));
        let task = StopAt {
            runs: runs.clone(),
            stop_at: 3,
            shutdown: tx,
        };
        let mut scheduler = Scheduler::new(task, at_17());

        scheduler.run(rx).await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.state(), State::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_on_signal() {
        let (tx, mut rx) = watch::channel(false);

        shutdown_on(async { Ok::<(), io::Error>(()) }, tx).await;

        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_shutdown_on_listen_failure_keeps_running() {
        let (tx, mut rx) = watch::channel(false);

        shutdown_on(
            async { Err::<(), _>(io::Error::other("signal driver is unavailable")) },
            tx,
        )
        .await;

        assert!(!*rx.borrow());
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_still_runs_daily() {
        let (tx, rx) = watch::channel(false);
        let task = CountingTask::default();
        let runs = task.runs.clone();
        drop(tx);

        let handle = tokio::spawn(async move {
            let mut scheduler = Scheduler::new(task, at_17());
            scheduler.run(rx).await;
        });

        while runs.load(Ordering::SeqCst) < 3 {
            time::sleep(Duration::from_secs(3600)).await;
        }
        handle.abort();

        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_until_past_is_zero() {
        assert_eq!(until(datetime(2000, 1, 1, 17)), Duration::ZERO);
    }
}
