//! 告警信号
//!
//! 单槽、可合并的一次性通知：生产者（避障循环）`arm()`，消费者（告警分发线程）等待并取走。
//! 槽已满时再次 `arm()` 不会排队，多次触发合并为一次告警。
//!
//! 基于容量为 1 的 `crossbeam_channel::bounded` 通道实现，`try_send` 满时即为合并。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::time::Duration;
use thiserror::Error;

/// 创建一对告警信号端点
pub fn alert_signal() -> (AlertSignal, AlertReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (AlertSignal { tx }, AlertReceiver { rx })
}

/// `arm()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// 槽为空，本次触发已挂起
    Armed,
    /// 槽已满，与尚未消费的告警合并
    Coalesced,
    /// 消费端已销毁
    Disconnected,
}

/// 告警生产端（可克隆）
#[derive(Debug, Clone)]
pub struct AlertSignal {
    tx: Sender<()>,
}

impl AlertSignal {
    /// 挂起一次告警（非阻塞）
    pub fn arm(&self) -> ArmOutcome {
        match self.tx.try_send(()) {
            Ok(()) => ArmOutcome::Armed,
            Err(TrySendError::Full(())) => ArmOutcome::Coalesced,
            Err(TrySendError::Disconnected(())) => ArmOutcome::Disconnected,
        }
    }

    /// 是否有尚未消费的告警
    pub fn is_armed(&self) -> bool {
        self.tx.is_full()
    }
}

/// 所有生产端都已销毁
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("All alert producers dropped")]
pub struct AlertClosed;

/// 告警消费端
#[derive(Debug)]
pub struct AlertReceiver {
    rx: Receiver<()>,
}

impl AlertReceiver {
    /// 阻塞等待下一次告警
    pub fn wait(&self) -> Result<(), AlertClosed> {
        self.rx.recv().map_err(|_| AlertClosed)
    }

    /// 在超时内等待告警
    ///
    /// 返回 `Ok(true)` 表示取走了一次告警，`Ok(false)` 表示超时。
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, AlertClosed> {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(true),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(AlertClosed),
        }
    }

    /// 非阻塞地取走挂起的告警
    pub fn try_take(&self) -> Result<bool, AlertClosed> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(AlertClosed),
        }
    }
}
