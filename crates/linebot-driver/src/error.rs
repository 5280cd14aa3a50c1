//! 驱动层错误类型定义

use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
///
/// 只覆盖启动阶段（配置校验、线程创建）。运行期的传感器/执行器故障不会向上传播，
/// 而是在各控制循环内记录日志后降级为空操作。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// 配置无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 构建时缺少必需的硬件组件
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),

    /// 控制线程 panic
    #[error("Thread panicked: {0}")]
    ThreadPanicked(String),

    /// 控制线程未能在超时内退出
    #[error("Thread {thread} did not exit within {timeout:?}")]
    JoinTimeout { thread: String, timeout: Duration },
}
