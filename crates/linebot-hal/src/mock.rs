//! Mock 硬件后端
//!
//! 用于测试和仿真的无硬件实现：
//!
//! - [`MockClock`]：虚拟微秒时间。每次 `now_us()` 前进一个 tick，`delay_us()` 立即前进
//! - [`MockInput`]：可由测试线程改写电平的输入引脚
//! - [`MockOutputBank`]：记录所有写操作的输出引脚组
//! - [`UltrasonicSim`]：按虚拟时间生成回波脉冲的超声波模块
//! - [`RecordingAudio`]：记录播放过的音频片段
//!
//! 所有句柄都是 `Clone` 的，克隆体共享同一份状态，测试线程可以在控制循环运行时观察或注入数据。

use crate::{AudioPlayer, Clock, HalError, InputPin, Level, OutputPin};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// 虚拟时钟
///
/// `now_us()` 返回当前虚拟时间后再前进 `tick_us`（默认 1μs），
/// 这样忙等循环（如等待回波边沿）在虚拟时间里也会向前推进，而不会死循环。
///
/// 多线程测试可以用 [`MockClock::with_pace`] 让毫秒级延时额外睡眠一小段真实时间，
/// 控制循环就不会在虚拟时间里空转占满 CPU。
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<AtomicU64>,
    tick_us: u64,
    pace: Option<Duration>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::with_tick(1)
    }

    pub fn with_tick(tick_us: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            tick_us,
            pace: None,
        }
    }

    /// 每次 ≥1ms 的延时额外睡眠 `real` 真实时间
    pub fn with_pace(mut self, real: Duration) -> Self {
        self.pace = Some(real);
        self
    }

    /// 读取当前虚拟时间，不推进
    pub fn peek_us(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }

    /// 手动推进虚拟时间
    pub fn advance_us(&self, us: u64) {
        self.now.fetch_add(us, Ordering::AcqRel);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> u64 {
        self.now.fetch_add(self.tick_us, Ordering::AcqRel)
    }

    fn delay_us(&self, us: u64) {
        self.advance_us(us);
        match self.pace {
            Some(real) if us >= 1_000 => std::thread::sleep(real),
            // 让出 CPU，避免虚拟时间下的控制循环饿死测试线程
            _ => std::thread::yield_now(),
        }
    }
}

/// 可注入电平的输入引脚
#[derive(Debug, Clone)]
pub struct MockInput {
    pin: u8,
    level: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl MockInput {
    pub fn new(pin: u8, level: Level) -> Self {
        Self {
            pin,
            level: Arc::new(AtomicBool::new(level.is_high())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self, level: Level) {
        self.level.store(level.is_high(), Ordering::Release);
    }

    /// 让后续读取返回错误（模拟引脚故障）
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl InputPin for MockInput {
    fn read(&mut self) -> Result<Level, HalError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(HalError::pin(self.pin, "simulated read failure"));
        }
        Ok(Level::from(self.level.load(Ordering::Acquire)))
    }
}

/// 一次输出引脚写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: u8,
    pub level: Level,
    /// 写入时的虚拟时间（微秒）
    pub at_us: u64,
}

#[derive(Debug, Default)]
struct BankState {
    writes: Vec<PinWrite>,
    levels: HashMap<u8, Level>,
}

/// 输出引脚组
///
/// 由同一个 bank 创建的所有 [`MockOutput`] 共享一份写入日志和当前电平表。
#[derive(Debug, Clone)]
pub struct MockOutputBank {
    clock: MockClock,
    state: Arc<Mutex<BankState>>,
}

impl MockOutputBank {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(BankState::default())),
        }
    }

    /// 创建一个属于本 bank 的输出引脚
    pub fn pin(&self, pin: u8) -> MockOutput {
        MockOutput {
            pin,
            bank: self.clone(),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 引脚当前电平
    pub fn level(&self, pin: u8) -> Level {
        self.state.lock().levels.get(&pin).copied().unwrap_or_default()
    }

    /// 全部写入记录（按时间顺序）
    pub fn writes(&self) -> Vec<PinWrite> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    fn record(&self, pin: u8, level: Level) {
        let at_us = self.clock.peek_us();
        let mut state = self.state.lock();
        state.levels.insert(pin, level);
        state.writes.push(PinWrite { pin, level, at_us });
    }
}

/// 记录写入的输出引脚
#[derive(Debug, Clone)]
pub struct MockOutput {
    pin: u8,
    bank: MockOutputBank,
    failing: Arc<AtomicBool>,
}

impl MockOutput {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl OutputPin for MockOutput {
    fn write(&mut self, level: Level) -> Result<(), HalError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(HalError::pin(self.pin, "simulated write failure"));
        }
        self.bank.record(self.pin, level);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SonarState {
    /// TRIG 上一次写入的电平
    trigger: Level,
    /// TRIG 最近一次下降沿的虚拟时间
    trigger_fall_us: Option<u64>,
    /// TRIG 下降沿到 ECHO 上升沿的延迟
    echo_delay_us: u64,
    /// 回波脉宽；`None` 表示没有回波（ECHO 一直为低）
    pulse_us: Option<u64>,
}

/// 超声波测距模块仿真
///
/// ECHO 在 TRIG 下降沿之后 `echo_delay_us` 拉高，保持 `pulse_us` 后拉低。
/// 电平完全由虚拟时钟决定，因此在 `MockClock` tick = 1μs 时测得的脉宽是精确的。
#[derive(Debug, Clone)]
pub struct UltrasonicSim {
    clock: MockClock,
    state: Arc<Mutex<SonarState>>,
}

impl UltrasonicSim {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(SonarState {
                echo_delay_us: 50,
                ..SonarState::default()
            })),
        }
    }

    /// 设置回波脉宽（`None` = 无回波）
    pub fn set_pulse_us(&self, pulse_us: Option<u64>) {
        self.state.lock().pulse_us = pulse_us;
    }

    /// 按目标距离设置回波脉宽（厘米）
    pub fn set_distance_cm(&self, distance_cm: f32) {
        let pulse = (f64::from(distance_cm) * 2.0 / 0.0343).round();
        self.set_pulse_us(Some(pulse.max(0.0) as u64));
    }

    pub fn set_echo_delay_us(&self, delay_us: u64) {
        self.state.lock().echo_delay_us = delay_us;
    }

    pub fn trigger_pin(&self) -> SonarTrigger {
        SonarTrigger { sim: self.clone() }
    }

    pub fn echo_pin(&self) -> SonarEcho {
        SonarEcho { sim: self.clone() }
    }

    /// 是否出现过 TRIG 下降沿
    pub fn has_triggered(&self) -> bool {
        self.state.lock().trigger_fall_us.is_some()
    }

    fn echo_level(&self) -> Level {
        let now = self.clock.peek_us();
        let state = self.state.lock();
        match (state.trigger_fall_us, state.pulse_us) {
            (Some(fall), Some(pulse)) => {
                let rise = fall + state.echo_delay_us;
                Level::from(now >= rise && now < rise + pulse)
            },
            _ => Level::Low,
        }
    }
}

/// 超声波 TRIG 引脚
#[derive(Debug, Clone)]
pub struct SonarTrigger {
    sim: UltrasonicSim,
}

impl OutputPin for SonarTrigger {
    fn write(&mut self, level: Level) -> Result<(), HalError> {
        let now = self.sim.clock.peek_us();
        let mut state = self.sim.state.lock();
        if state.trigger.is_high() && level.is_low() {
            state.trigger_fall_us = Some(now);
        }
        state.trigger = level;
        Ok(())
    }
}

/// 超声波 ECHO 引脚
#[derive(Debug, Clone)]
pub struct SonarEcho {
    sim: UltrasonicSim,
}

impl InputPin for SonarEcho {
    fn read(&mut self) -> Result<Level, HalError> {
        Ok(self.sim.echo_level())
    }
}

/// 记录播放片段的音频实现
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    clips: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clips(&self) -> Vec<String> {
        self.clips.lock().clone()
    }

    pub fn play_count(&self) -> usize {
        self.clips.lock().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

impl AudioPlayer for RecordingAudio {
    fn play(&mut self, clip: &str) -> Result<(), HalError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(HalError::Audio(format!("simulated failure playing {}", clip)));
        }
        self.clips.lock().push(clip.to_string());
        Ok(())
    }
}
