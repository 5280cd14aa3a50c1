//! # Linebot HAL
//!
//! 硬件抽象层，提供小车控制核心所依赖的全部外部协作者接口：
//!
//! - `InputPin` / `OutputPin`：数字引脚读写（红外巡线传感器、电机方向引脚、超声波 TRIG/ECHO）
//! - `Clock`：单调微秒时钟与微秒级延时（超声波测距时序、控制循环周期）
//! - `AudioPlayer`：音频播放（障碍物告警）
//!
//! 真实的 GPIO / 音频驱动不在本 crate 范围内；[`mock`] 模块提供无硬件依赖的实现，
//! 供测试和仿真程序使用。

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod mock;

/// HAL 层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("Pin {pin} error: {message}")]
    Pin { pin: u8, message: String },
    #[error("Audio playback failed: {0}")]
    Audio(String),
}

impl HalError {
    pub fn pin(pin: u8, message: impl Into<String>) -> Self {
        Self::Pin {
            pin,
            message: message.into(),
        }
    }
}

/// 数字电平
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    #[inline]
    pub fn is_high(self) -> bool {
        self == Self::High
    }

    #[inline]
    pub fn is_low(self) -> bool {
        self == Self::Low
    }
}

impl From<bool> for Level {
    #[inline]
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl From<Level> for bool {
    #[inline]
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Self::Output {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

/// 数字输入引脚
pub trait InputPin: Send {
    fn read(&mut self) -> Result<Level, HalError>;

    fn is_high(&mut self) -> Result<bool, HalError> {
        Ok(self.read()?.is_high())
    }
}

/// 数字输出引脚
///
/// 写操作是 fire-and-forget 的：调用方只关心是否出错，不回读引脚状态。
pub trait OutputPin: Send {
    fn write(&mut self, level: Level) -> Result<(), HalError>;

    fn set_high(&mut self) -> Result<(), HalError> {
        self.write(Level::High)
    }

    fn set_low(&mut self) -> Result<(), HalError> {
        self.write(Level::Low)
    }
}

impl<P: InputPin + ?Sized> InputPin for Box<P> {
    fn read(&mut self) -> Result<Level, HalError> {
        (**self).read()
    }
}

impl<P: OutputPin + ?Sized> OutputPin for Box<P> {
    fn write(&mut self, level: Level) -> Result<(), HalError> {
        (**self).write(level)
    }
}

/// 单调微秒时钟 + 延时原语
///
/// 超声波测距需要微秒级时间戳（回波脉宽），控制循环需要毫秒级休眠，两者统一经由此 trait，
/// 这样测试可以用虚拟时间（[`mock::MockClock`]）替代真实时间。
pub trait Clock: Send + Sync {
    /// 当前单调时间（微秒）
    fn now_us(&self) -> u64;

    /// 阻塞当前线程 `us` 微秒
    fn delay_us(&self, us: u64);

    fn delay_ms(&self, ms: u64) {
        self.delay_us(ms.saturating_mul(1_000));
    }

    fn delay(&self, duration: Duration) {
        self.delay_us(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX));
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn delay_us(&self, us: u64) {
        (**self).delay_us(us)
    }
}

/// 系统时钟
///
/// 以创建时刻为原点的 `Instant` 时钟。延时使用 `spin_sleep`，
/// 微秒级延时精度（相比 `std::thread::sleep` 的 1-2ms）足以产生 10μs 的 TRIG 脉冲。
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    fn delay_us(&self, us: u64) {
        spin_sleep::sleep(Duration::from_micros(us));
    }
}

/// 音频播放协作者
pub trait AudioPlayer: Send {
    /// 播放指定片段（阻塞到播放提交完成）
    fn play(&mut self, clip: &str) -> Result<(), HalError>;
}

impl<A: AudioPlayer + ?Sized> AudioPlayer for Box<A> {
    fn play(&mut self, clip: &str) -> Result<(), HalError> {
        (**self).play(clip)
    }
}

/// 仅输出日志的音频实现（无扬声器的板子 / 仿真）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudio;

impl AudioPlayer for LogAudio {
    fn play(&mut self, clip: &str) -> Result<(), HalError> {
        tracing::info!("Playing audio clip: {}", clip);
        Ok(())
    }
}
