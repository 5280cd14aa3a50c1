//! 驱动层模块
//!
//! 本模块提供差速小车的并发控制子系统，包括：
//! - 运动原语（停止/前进/后退/左转/右转）
//! - 超声波测距（TRIG/ECHO 时序 + 超时）
//! - 控制循环线程（巡线、避障、告警分发、状态灯）
//! - 告警信号（单槽、可合并的通知通道）
//! - 运行时（`Robot`）：线程创建、协作式关闭、健康检查
//!
//! # 线程模型
//!
//! 每个控制循环是一个独立的具名线程，由 [`RobotBuilder::build`] 一次性创建，
//! 每次迭代检查一次共享的 `is_running` 标志。巡线与避障循环之间没有任何顺序保证，
//! 两者都会写同一组电机引脚。

mod builder;
pub mod alert;
pub mod config;
mod error;
pub mod metrics;
pub mod motion;
pub mod pipeline;
pub mod ranger;
mod robot;

pub use alert::{AlertClosed, AlertReceiver, AlertSignal, ArmOutcome, alert_signal};
pub use builder::RobotBuilder;
pub use config::DriverConfig;
pub use error::DriverError;
pub use metrics::{LoopMetrics, MetricsSnapshot};
pub use motion::{MotionIntent, MotorPins, Motors};
pub use pipeline::{
    AlertDispatcher, LineFollower, ObstacleGuard, ObstacleOutcome, alert_loop, decide,
    is_obstacle, line_follow_loop, obstacle_loop, status_led_loop,
};
pub use ranger::{EchoEdge, Ranger, RangerError, pulse_to_distance_cm};
pub use robot::Robot;
