//! 控制循环
//!
//! 每个循环拆成两层：
//!
//! - 单周期的 `step()`（[`LineFollower`] / [`ObstacleGuard`] / [`AlertDispatcher`]），
//!   纯同步、无休眠，测试可以逐周期驱动；
//! - 长期运行的 `*_loop()` 函数，负责周期休眠并在每次迭代检查 `is_running`，
//!   由 [`crate::RobotBuilder`] 放进独立线程。
//!
//! 运行期故障（引脚读写、测距超时、音频播放）只记录日志和计数，循环本身从不退出。

use crate::alert::{AlertClosed, AlertReceiver, AlertSignal, ArmOutcome};
use crate::metrics::LoopMetrics;
use crate::motion::{MotionIntent, Motors};
use crate::ranger::{Ranger, RangerError};
use linebot_hal::{AudioPlayer, Clock, HalError, InputPin, Level, OutputPin};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 巡线决策表
///
/// | 左 | 右 | 动作 |
/// |---|---|---|
/// | 1 | 0 | 右转 |
/// | 0 | 1 | 左转 |
/// | 1 | 1 | 前进 |
/// | 0 | 0 | 停止 |
pub fn decide(left: Level, right: Level) -> MotionIntent {
    match (left, right) {
        (Level::High, Level::Low) => MotionIntent::TurnRight,
        (Level::Low, Level::High) => MotionIntent::TurnLeft,
        (Level::High, Level::High) => MotionIntent::Forward,
        (Level::Low, Level::Low) => MotionIntent::Stop,
    }
}

/// 距离是否构成障碍物（两端都是严格不等式）
#[inline]
pub fn is_obstacle(distance_cm: f32, threshold_cm: f32) -> bool {
    distance_cm > 0.0 && distance_cm < threshold_cm
}

/// 巡线控制器（单周期）
pub struct LineFollower {
    left: Box<dyn InputPin>,
    right: Box<dyn InputPin>,
    motors: Motors,
    invert: bool,
    metrics: Arc<LoopMetrics>,
}

impl LineFollower {
    pub fn new(
        left: impl InputPin + 'static,
        right: impl InputPin + 'static,
        motors: Motors,
        metrics: Arc<LoopMetrics>,
    ) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            motors,
            invert: false,
            metrics,
        }
    }

    /// 传感器电平取反（与决策表极性相反的硬件）
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn motors(&self) -> &Motors {
        &self.motors
    }

    /// 读取（左, 右）传感器电平，已按极性配置校正
    pub fn read_sensors(&mut self) -> Result<(Level, Level), HalError> {
        let left = self.left.read()?;
        let right = self.right.read()?;
        if self.invert {
            Ok((!left, !right))
        } else {
            Ok((left, right))
        }
    }

    /// 执行一个巡线周期
    ///
    /// 返回本周期执行的动作；传感器读取失败时跳过本周期并返回 `None`。
    /// 转向动作会在这里阻塞 `turn_duration`。
    pub fn step(&mut self) -> Option<MotionIntent> {
        let (left, right) = match self.read_sensors() {
            Ok(levels) => levels,
            Err(e) => {
                warn!("Line sensor read failed, skipping cycle: {}", e);
                LoopMetrics::incr(&self.metrics.line_read_errors);
                return None;
            },
        };

        let intent = decide(left, right);
        trace!("Line sensors L={:?} R={:?} -> {}", left, right, intent);
        self.motors.apply(intent);
        LoopMetrics::incr(&self.metrics.line_cycles);
        Some(intent)
    }
}

/// 单个避障周期的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleOutcome {
    /// 没有有效读数（超时或引脚错误）
    NoReading,
    /// 有读数但不构成障碍
    Clear { distance_cm: f32 },
    /// 检测到障碍物：已停车并触发告警
    Obstacle { distance_cm: f32, alert: ArmOutcome },
}

/// 避障控制器（单周期）
pub struct ObstacleGuard {
    ranger: Ranger,
    motors: Motors,
    alert: AlertSignal,
    threshold_cm: f32,
    metrics: Arc<LoopMetrics>,
}

impl ObstacleGuard {
    pub fn new(
        ranger: Ranger,
        motors: Motors,
        alert: AlertSignal,
        threshold_cm: f32,
        metrics: Arc<LoopMetrics>,
    ) -> Self {
        Self {
            ranger,
            motors,
            alert,
            threshold_cm,
            metrics,
        }
    }

    pub fn motors(&self) -> &Motors {
        &self.motors
    }

    /// 执行一个避障周期
    pub fn step(&mut self) -> ObstacleOutcome {
        LoopMetrics::incr(&self.metrics.obstacle_cycles);

        let distance_cm = match self.ranger.measure_distance() {
            Ok(distance) => distance,
            Err(RangerError::Timeout { edge, timeout_us }) => {
                // 前方空旷时每个周期都会超时
                debug!("Ranger timeout on {} edge ({}us)", edge, timeout_us);
                LoopMetrics::incr(&self.metrics.ranger_timeouts);
                return ObstacleOutcome::NoReading;
            },
            Err(RangerError::Pin(e)) => {
                warn!("Ranger pin failure: {}", e);
                LoopMetrics::incr(&self.metrics.ranger_timeouts);
                return ObstacleOutcome::NoReading;
            },
        };

        if !is_obstacle(distance_cm, self.threshold_cm) {
            trace!("Distance {:.2} cm, path clear", distance_cm);
            return ObstacleOutcome::Clear { distance_cm };
        }

        info!("Obstacle detected at {:.2} cm, stopping", distance_cm);
        LoopMetrics::incr(&self.metrics.obstacles_detected);
        self.motors.stop();

        let alert = self.alert.arm();
        match alert {
            ArmOutcome::Armed => LoopMetrics::incr(&self.metrics.alerts_armed),
            ArmOutcome::Coalesced => {
                debug!("Alert already pending, coalesced");
                LoopMetrics::incr(&self.metrics.alerts_coalesced);
            },
            ArmOutcome::Disconnected => {
                warn!("Alert dispatcher is gone, alert dropped");
            },
        }

        ObstacleOutcome::Obstacle { distance_cm, alert }
    }
}

/// 告警分发器（单周期）
pub struct AlertDispatcher {
    receiver: AlertReceiver,
    audio: Box<dyn AudioPlayer>,
    clip: String,
    metrics: Arc<LoopMetrics>,
}

impl AlertDispatcher {
    pub fn new(
        receiver: AlertReceiver,
        audio: impl AudioPlayer + 'static,
        clip: impl Into<String>,
        metrics: Arc<LoopMetrics>,
    ) -> Self {
        Self {
            receiver,
            audio: Box::new(audio),
            clip: clip.into(),
            metrics,
        }
    }

    pub fn clip(&self) -> &str {
        &self.clip
    }

    /// 在 `timeout` 内等待一次告警并播放
    ///
    /// 返回 `Ok(true)` 表示处理了一次告警，`Ok(false)` 表示等待超时。
    pub fn step(&mut self, timeout: Duration) -> Result<bool, AlertClosed> {
        if !self.receiver.wait_timeout(timeout)? {
            return Ok(false);
        }

        LoopMetrics::incr(&self.metrics.alerts_dispatched);
        debug!("Dispatching obstacle alert: {}", self.clip);
        if let Err(e) = self.audio.play(&self.clip) {
            error!("Alert playback failed: {}", e);
            LoopMetrics::incr(&self.metrics.audio_errors);
        }
        Ok(true)
    }
}

/// 巡线循环
///
/// # 参数
/// - `follower`: 巡线控制器
/// - `clock`: 周期休眠使用的时钟
/// - `period`: 循环周期（默认 100ms）
/// - `is_running`: 运行标志（每次迭代检查一次）
pub fn line_follow_loop(
    mut follower: LineFollower,
    clock: Arc<dyn Clock>,
    period: Duration,
    is_running: Arc<AtomicBool>,
) {
    info!("Line following loop started (period {:?})", period);
    follower.motors().stop();

    loop {
        // Acquire: 看到 false 时必须同时看到关闭前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Line following loop: is_running flag is false, exiting");
            break;
        }

        follower.step();
        clock.delay(period);
    }

    info!("Line following loop exited");
}

/// 避障循环
///
/// # 参数
/// - `guard`: 避障控制器
/// - `clock`: 周期休眠使用的时钟
/// - `period`: 循环周期（默认 200ms）
/// - `is_running`: 运行标志
pub fn obstacle_loop(
    mut guard: ObstacleGuard,
    clock: Arc<dyn Clock>,
    period: Duration,
    is_running: Arc<AtomicBool>,
) {
    info!("Obstacle avoidance loop started (period {:?})", period);
    guard.motors().stop();

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Obstacle avoidance loop: is_running flag is false, exiting");
            break;
        }

        guard.step();
        clock.delay(period);
    }

    info!("Obstacle avoidance loop exited");
}

/// 告警分发循环
///
/// 以 `poll` 为切片等待告警，切片只用于检查 `is_running`；挂起的告警会留在槽里等下一个切片。
pub fn alert_loop(mut dispatcher: AlertDispatcher, poll: Duration, is_running: Arc<AtomicBool>) {
    info!("Alert dispatcher started (clip {})", dispatcher.clip());

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Alert dispatcher: is_running flag is false, exiting");
            break;
        }

        if let Err(e) = dispatcher.step(poll) {
            info!("Alert dispatcher: {}, exiting", e);
            break;
        }
    }

    info!("Alert dispatcher exited");
}

/// 状态灯心跳循环（每个半周期翻转一次电平）
pub fn status_led_loop(
    mut led: Box<dyn OutputPin>,
    clock: Arc<dyn Clock>,
    half_period: Duration,
    is_running: Arc<AtomicBool>,
) {
    info!("Status LED loop started");
    let mut level = Level::Low;

    loop {
        if !is_running.load(Ordering::Acquire) {
            break;
        }

        level = !level;
        if let Err(e) = led.write(level) {
            warn!("Status LED write failed: {}", e);
        }
        clock.delay(half_period);
    }

    if let Err(e) = led.set_low() {
        warn!("Status LED write failed: {}", e);
    }
    info!("Status LED loop exited");
}
