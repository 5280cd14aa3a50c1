//! 运行时
//!
//! [`Robot`] 持有全部控制线程的句柄和共享的 `is_running` 标志。
//! `shutdown()` 或 `Drop` 时清除标志并等待线程退出，最后把电机拉回停止状态。

use crate::alert::AlertSignal;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::metrics::{LoopMetrics, MetricsSnapshot};
use crate::motion::Motors;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info};

/// 线程名
pub(crate) const LINE_FOLLOW_THREAD: &str = "lf-task";
pub(crate) const OBSTACLE_THREAD: &str = "oa-task";
pub(crate) const ALERT_THREAD: &str = "spkr-task";
pub(crate) const STATUS_LED_THREAD: &str = "blink-task";

/// join 失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinFailure {
    Panicked,
    TimedOut,
}

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinFailure>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinFailure> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程代为 join，超时后留给进程退出时回收
        std::thread::spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) => Err(JoinFailure::Panicked),
            Err(_) => Err(JoinFailure::TimedOut),
        }
    }
}

/// 运行中的小车控制核心
pub struct Robot {
    /// (线程名, 句柄)
    threads: Vec<(&'static str, JoinHandle<()>)>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LoopMetrics>,
    alert: AlertSignal,
    motors: Motors,
    config: DriverConfig,
}

impl Robot {
    pub(crate) fn new(
        is_running: Arc<AtomicBool>,
        metrics: Arc<LoopMetrics>,
        alert: AlertSignal,
        motors: Motors,
        config: DriverConfig,
    ) -> Self {
        Self {
            threads: Vec::new(),
            is_running,
            metrics,
            alert,
            motors,
            config,
        }
    }

    pub(crate) fn attach(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.threads.push((name, handle));
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 运行标志是否仍然置位
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 获取指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 告警生产端（例如外部触发一次告警）
    pub fn alert_signal(&self) -> &AlertSignal {
        &self.alert
    }

    /// 共享的电机执行器
    pub fn motors(&self) -> &Motors {
        &self.motors
    }

    /// 运行中的线程名
    pub fn thread_names(&self) -> Vec<&'static str> {
        self.threads.iter().map(|(name, _)| *name).collect()
    }

    /// 各线程存活状态
    pub fn check_health(&self) -> Vec<(&'static str, bool)> {
        self.threads
            .iter()
            .map(|(name, handle)| (*name, !handle.is_finished()))
            .collect()
    }

    /// 所有线程都存活时返回 `true`
    pub fn is_healthy(&self) -> bool {
        self.threads.iter().all(|(_, handle)| !handle.is_finished())
    }

    /// 协作式关闭
    ///
    /// 清除运行标志并等待所有线程退出。返回第一个 panic 或未能在超时内退出的线程对应的错误。
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        self.stop_threads()
    }

    fn stop_threads(&mut self) -> Result<(), DriverError> {
        // Release: 关闭前的写入对退出中的线程可见
        self.is_running.store(false, Ordering::Release);

        // 转向最多阻塞 turn_duration，加上一个周期的余量
        let join_timeout = self.config.turn_duration()
            + self.config.line_period().max(self.config.obstacle_period())
            + Duration::from_secs(1);

        let mut first_failure = None;
        for (name, handle) in self.threads.drain(..) {
            match handle.join_timeout(join_timeout) {
                Ok(()) => {},
                Err(JoinFailure::Panicked) => {
                    error!("Thread {} panicked", name);
                    first_failure.get_or_insert(DriverError::ThreadPanicked(name.to_string()));
                },
                Err(JoinFailure::TimedOut) => {
                    error!("Thread {} failed to shut down within {:?}", name, join_timeout);
                    first_failure.get_or_insert(DriverError::JoinTimeout {
                        thread: name.to_string(),
                        timeout: join_timeout,
                    });
                },
            }
        }

        self.motors.stop();

        match first_failure {
            Some(err) => Err(err),
            None => {
                info!("Robot stopped");
                Ok(())
            },
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        if let Err(e) = self.stop_threads() {
            error!("Robot shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::alert_signal;
    use crate::motion::MotorPins;
    use linebot_hal::Level;
    use linebot_hal::mock::{MockClock, MockOutputBank};

    fn bare_robot(bank: &MockOutputBank) -> Robot {
        let clock = MockClock::new();
        let pins = MotorPins::new(bank.pin(32), bank.pin(33), bank.pin(25), bank.pin(26));
        let motors = Motors::new(pins, Arc::new(clock), Duration::from_millis(1));
        let (signal, _receiver) = alert_signal();
        let config = DriverConfig {
            line_period_ms: 1,
            obstacle_period_ms: 1,
            turn_duration_ms: 1,
            ..DriverConfig::default()
        };
        Robot::new(
            Arc::new(AtomicBool::new(true)),
            Arc::new(LoopMetrics::new()),
            signal,
            motors,
            config,
        )
    }

    #[test]
    fn test_shutdown_reports_panicked_thread() {
        let bank = MockOutputBank::new(MockClock::new());
        let mut robot = bare_robot(&bank);
        robot.attach(LINE_FOLLOW_THREAD, std::thread::spawn(|| panic!("sensor bus exploded")));

        let err = robot.shutdown().unwrap_err();
        assert!(matches!(err, DriverError::ThreadPanicked(ref name) if name == LINE_FOLLOW_THREAD));
    }

    #[test]
    fn test_shutdown_reports_join_timeout_separately() {
        let bank = MockOutputBank::new(MockClock::new());
        let mut robot = bare_robot(&bank);
        robot.motors().forward();

        // 无视运行标志的线程：只有测试结束时才放行
        let release = Arc::new(AtomicBool::new(false));
        let stuck = {
            let release = release.clone();
            std::thread::spawn(move || {
                while !release.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(5));
                }
            })
        };
        robot.attach(OBSTACLE_THREAD, stuck);

        let err = robot.shutdown().unwrap_err();
        release.store(true, Ordering::Release);

        match err {
            DriverError::JoinTimeout { thread, timeout } => {
                assert_eq!(thread, OBSTACLE_THREAD);
                assert_eq!(timeout, Duration::from_millis(1 + 1) + Duration::from_secs(1));
            },
            other => panic!("unexpected error: {:?}", other),
        }
        // 即使 join 失败也会停车
        assert_eq!(bank.level(32), Level::Low);
        assert_eq!(bank.level(25), Level::Low);
    }

    #[test]
    fn test_shutdown_without_threads_is_ok() {
        let bank = MockOutputBank::new(MockClock::new());
        let robot = bare_robot(&bank);
        assert!(robot.thread_names().is_empty());
        assert!(robot.shutdown().is_ok());
    }
}
