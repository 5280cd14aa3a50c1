//! 运动原语
//!
//! 把方向意图翻译成四个电机方向引脚（每个轮子一对 前进/后退）的电平组合：
//!
//! | 原语 | 左前 | 左后 | 右前 | 右后 |
//! |---|---|---|---|---|
//! | stop | 0 | 0 | 0 | 0 |
//! | forward | 1 | 0 | 1 | 0 |
//! | backward | 0 | 1 | 0 | 1 |
//! | turn_left | 0 | 1 | 1 | 0 |
//! | turn_right | 1 | 0 | 0 | 1 |
//!
//! `turn_left` / `turn_right` 是开环、不可中断的动作：写入电平后阻塞固定时长，
//! 期间不读取任何传感器，结束后把两路驱动引脚拉低回到空挡。

use linebot_hal::{Clock, HalError, Level, OutputPin};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// 运动意图（每个巡线周期根据传感器重新计算，不持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionIntent {
    Stop,
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl MotionIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
        }
    }

    /// 该意图对应的引脚电平（左前, 左后, 右前, 右后）
    pub fn pattern(self) -> [Level; 4] {
        use Level::{High as H, Low as L};
        match self {
            Self::Stop => [L, L, L, L],
            Self::Forward => [H, L, H, L],
            Self::Backward => [L, H, L, H],
            Self::TurnLeft => [L, H, H, L],
            Self::TurnRight => [H, L, L, H],
        }
    }
}

impl fmt::Display for MotionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 电机方向引脚组
pub struct MotorPins {
    pub left_forward: Box<dyn OutputPin>,
    pub left_backward: Box<dyn OutputPin>,
    pub right_forward: Box<dyn OutputPin>,
    pub right_backward: Box<dyn OutputPin>,
}

impl MotorPins {
    pub fn new(
        left_forward: impl OutputPin + 'static,
        left_backward: impl OutputPin + 'static,
        right_forward: impl OutputPin + 'static,
        right_backward: impl OutputPin + 'static,
    ) -> Self {
        Self {
            left_forward: Box::new(left_forward),
            left_backward: Box::new(left_backward),
            right_forward: Box::new(right_forward),
            right_backward: Box::new(right_backward),
        }
    }

    fn by_index(&mut self, index: usize) -> (&'static str, &mut dyn OutputPin) {
        match index {
            0 => ("left_forward", self.left_forward.as_mut()),
            1 => ("left_backward", self.left_backward.as_mut()),
            2 => ("right_forward", self.right_forward.as_mut()),
            _ => ("right_backward", self.right_backward.as_mut()),
        }
    }
}

/// 电机执行器（可在线程间克隆共享）
///
/// 锁只覆盖单次引脚组写入（保证一次原语的四路写入不被撕裂），
/// **不**覆盖转向的阻塞区间：巡线与避障循环之间没有互斥，
/// 避障触发的 `stop()` 可能被下一次巡线周期的 `forward()` 立即覆盖。
#[derive(Clone)]
pub struct Motors {
    pins: Arc<Mutex<MotorPins>>,
    clock: Arc<dyn Clock>,
    turn_duration: Duration,
}

impl Motors {
    /// 创建执行器并把四路引脚全部拉低（初始化为停止状态）
    pub fn new(pins: MotorPins, clock: Arc<dyn Clock>, turn_duration: Duration) -> Self {
        let motors = Self {
            pins: Arc::new(Mutex::new(pins)),
            clock,
            turn_duration,
        };
        motors.write_pattern(MotionIntent::Stop.pattern());
        motors
    }

    pub fn turn_duration(&self) -> Duration {
        self.turn_duration
    }

    pub fn stop(&self) {
        self.write_pattern(MotionIntent::Stop.pattern());
    }

    pub fn forward(&self) {
        self.write_pattern(MotionIntent::Forward.pattern());
    }

    pub fn backward(&self) {
        self.write_pattern(MotionIntent::Backward.pattern());
    }

    /// 左转：左轮后退、右轮前进，阻塞 `turn_duration` 后回到空挡
    pub fn turn_left(&self) {
        self.write_pattern(MotionIntent::TurnLeft.pattern());
        self.clock.delay(self.turn_duration);
        // 左后 / 右前 回到低电平
        self.release(&[1, 2]);
    }

    /// 右转：左轮前进、右轮后退，阻塞 `turn_duration` 后回到空挡
    pub fn turn_right(&self) {
        self.write_pattern(MotionIntent::TurnRight.pattern());
        self.clock.delay(self.turn_duration);
        // 左前 / 右后 回到低电平
        self.release(&[0, 3]);
    }

    /// 执行运动意图
    pub fn apply(&self, intent: MotionIntent) {
        trace!("Motion: {}", intent);
        match intent {
            MotionIntent::Stop => self.stop(),
            MotionIntent::Forward => self.forward(),
            MotionIntent::Backward => self.backward(),
            MotionIntent::TurnLeft => self.turn_left(),
            MotionIntent::TurnRight => self.turn_right(),
        }
    }

    fn write_pattern(&self, pattern: [Level; 4]) {
        let mut pins = self.pins.lock();
        for (index, level) in pattern.into_iter().enumerate() {
            let (name, pin) = pins.by_index(index);
            if let Err(e) = pin.write(level) {
                log_write_error(name, &e);
            }
        }
    }

    fn release(&self, indices: &[usize]) {
        let mut pins = self.pins.lock();
        for &index in indices {
            let (name, pin) = pins.by_index(index);
            if let Err(e) = pin.write(Level::Low) {
                log_write_error(name, &e);
            }
        }
    }
}

fn log_write_error(name: &str, error: &HalError) {
    // 单路写失败不中断其余引脚的写入
    warn!("Motor pin {} write failed: {}", name, error);
}
