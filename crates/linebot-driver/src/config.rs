//! 驱动配置
//!
//! 控制各控制循环的周期、阈值与告警行为。

use crate::error::DriverError;
use std::time::Duration;

/// 驱动配置
///
/// # Example
///
/// ```
/// use linebot_driver::DriverConfig;
///
/// // 默认配置（巡线 100ms，避障 200ms，阈值 20cm，转向 1000ms）
/// let config = DriverConfig::default();
/// assert_eq!(config.line_period_ms, 100);
///
/// // 自定义配置
/// let config = DriverConfig {
///     obstacle_threshold_cm: 15.0,
///     status_led: true,
///     ..DriverConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DriverConfig {
    /// 巡线循环周期（毫秒）
    pub line_period_ms: u64,
    /// 避障循环周期（毫秒）
    pub obstacle_period_ms: u64,
    /// 障碍物距离阈值（厘米，严格小于才触发）
    pub obstacle_threshold_cm: f32,
    /// 原地转向的固定阻塞时长（毫秒）
    pub turn_duration_ms: u64,
    /// 超声波回波单边沿等待超时（微秒）
    pub echo_timeout_us: u64,
    /// 告警音频片段标识
    pub alert_clip: String,
    /// 告警分发线程的等待切片（毫秒）
    ///
    /// 仅用于周期性检查关闭标志，切片到期不会丢失告警。
    pub alert_poll_ms: u64,
    /// 是否启用状态灯心跳线程
    pub status_led: bool,
    /// 状态灯半周期（毫秒）
    pub status_led_half_period_ms: u64,
    /// 巡线传感器电平取反（硬件极性校准用）
    pub invert_line_sensors: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            line_period_ms: 100,
            obstacle_period_ms: 200,
            obstacle_threshold_cm: 20.0,
            turn_duration_ms: 1_000,
            echo_timeout_us: 30_000,
            alert_clip: "obstacle_detected.mp3".to_string(),
            alert_poll_ms: 50,
            status_led: false,
            status_led_half_period_ms: 500,
            invert_line_sensors: false,
        }
    }
}

impl DriverConfig {
    pub fn line_period(&self) -> Duration {
        Duration::from_millis(self.line_period_ms)
    }

    pub fn obstacle_period(&self) -> Duration {
        Duration::from_millis(self.obstacle_period_ms)
    }

    pub fn turn_duration(&self) -> Duration {
        Duration::from_millis(self.turn_duration_ms)
    }

    pub fn alert_poll(&self) -> Duration {
        Duration::from_millis(self.alert_poll_ms)
    }

    pub fn status_led_half_period(&self) -> Duration {
        Duration::from_millis(self.status_led_half_period_ms)
    }

    /// 校验配置
    ///
    /// 周期为 0 会让循环空转，阈值非正则永远不会触发告警，两者都视为配置错误。
    pub fn validate(&self) -> Result<(), DriverError> {
        let periods = [
            ("line_period_ms", self.line_period_ms),
            ("obstacle_period_ms", self.obstacle_period_ms),
            ("echo_timeout_us", self.echo_timeout_us),
            ("alert_poll_ms", self.alert_poll_ms),
            ("status_led_half_period_ms", self.status_led_half_period_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(DriverError::InvalidConfig(format!("{} must be > 0", name)));
            }
        }

        if !(self.obstacle_threshold_cm.is_finite() && self.obstacle_threshold_cm > 0.0) {
            return Err(DriverError::InvalidConfig(format!(
                "obstacle_threshold_cm must be a positive number, got {}",
                self.obstacle_threshold_cm
            )));
        }

        if self.alert_clip.is_empty() {
            return Err(DriverError::InvalidConfig(
                "alert_clip must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
