//! 控制循环运行指标
//!
//! 全部为 `Relaxed` 原子计数器：只用于监控和测试断言，不参与线程间同步。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环指标（原子计数器）
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 巡线循环完成的周期数
    pub line_cycles: AtomicU64,
    /// 巡线传感器读取失败次数（该周期跳过）
    pub line_read_errors: AtomicU64,
    /// 避障循环完成的周期数
    pub obstacle_cycles: AtomicU64,
    /// 测距失败次数（超时或引脚错误，视为无读数）
    pub ranger_timeouts: AtomicU64,
    /// 检测到障碍物的周期数
    pub obstacles_detected: AtomicU64,
    /// 成功挂起的告警数
    pub alerts_armed: AtomicU64,
    /// 与未消费告警合并的触发数
    pub alerts_coalesced: AtomicU64,
    /// 告警分发线程取走并处理的告警数
    pub alerts_dispatched: AtomicU64,
    /// 音频播放失败次数
    pub audio_errors: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取所有计数器的快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            line_cycles: self.line_cycles.load(Ordering::Relaxed),
            line_read_errors: self.line_read_errors.load(Ordering::Relaxed),
            obstacle_cycles: self.obstacle_cycles.load(Ordering::Relaxed),
            ranger_timeouts: self.ranger_timeouts.load(Ordering::Relaxed),
            obstacles_detected: self.obstacles_detected.load(Ordering::Relaxed),
            alerts_armed: self.alerts_armed.load(Ordering::Relaxed),
            alerts_coalesced: self.alerts_coalesced.load(Ordering::Relaxed),
            alerts_dispatched: self.alerts_dispatched.load(Ordering::Relaxed),
            audio_errors: self.audio_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub line_cycles: u64,
    pub line_read_errors: u64,
    pub obstacle_cycles: u64,
    pub ranger_timeouts: u64,
    pub obstacles_detected: u64,
    pub alerts_armed: u64,
    pub alerts_coalesced: u64,
    pub alerts_dispatched: u64,
    pub audio_errors: u64,
}

impl MetricsSnapshot {
    /// 触发过的告警总数（挂起 + 合并）
    pub fn alerts_triggered(&self) -> u64 {
        self.alerts_armed + self.alerts_coalesced
    }
}
