//! 超声波测距
//!
//! TRIG/ECHO 时序：
//!
//! ```text
//! TRIG  ___|‾‾‾‾‾‾‾‾‾‾|__________________________
//!       2μs    10μs
//! ECHO  _____________________|‾‾‾‾ pulse ‾‾‾‾|____
//! ```
//!
//! 距离 = 脉宽(μs) × 0.0343 / 2（声速 343 m/s，往返）。
//! 两个等待阶段各自有独立的超时，超时后整次测量失败，由调用方当作“没有读数”处理。

use linebot_hal::{Clock, HalError, InputPin, OutputPin};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 声速（厘米/微秒）
const SPEED_OF_SOUND_CM_PER_US: f64 = 0.0343;

/// 正在等待的回波边沿
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    Rise,
    Fall,
}

impl fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rise => f.write_str("rising"),
            Self::Fall => f.write_str("falling"),
        }
    }
}

/// 测距失败
#[derive(Error, Debug)]
pub enum RangerError {
    /// 等待回波边沿超时（没有回波或回波过长）
    #[error("Timeout waiting for {edge} echo edge after {timeout_us}us")]
    Timeout { edge: EchoEdge, timeout_us: u64 },

    /// 引脚读写失败
    #[error("Ranger pin error: {0}")]
    Pin(#[from] HalError),
}

/// 脉宽（微秒）换算为距离（厘米）
pub fn pulse_to_distance_cm(pulse_us: u64) -> f32 {
    (pulse_us as f64 * SPEED_OF_SOUND_CM_PER_US / 2.0) as f32
}

/// 超声波测距器
///
/// # 参数
///
/// - `trigger`: TRIG 输出引脚
/// - `echo`: ECHO 输入引脚
/// - `clock`: 微秒时钟（回波脉宽计时 + TRIG 脉冲延时）
/// - `echo_timeout_us`: 每个边沿的等待上限
pub struct Ranger {
    trigger: Box<dyn OutputPin>,
    echo: Box<dyn InputPin>,
    clock: Arc<dyn Clock>,
    echo_timeout_us: u64,
}

impl Ranger {
    pub fn new(
        trigger: impl OutputPin + 'static,
        echo: impl InputPin + 'static,
        clock: Arc<dyn Clock>,
        echo_timeout_us: u64,
    ) -> Self {
        Self {
            trigger: Box::new(trigger),
            echo: Box::new(echo),
            clock,
            echo_timeout_us,
        }
    }

    pub fn echo_timeout_us(&self) -> u64 {
        self.echo_timeout_us
    }

    /// 测量一次距离（厘米）
    ///
    /// 阻塞时间上界约为 12μs + 2 × `echo_timeout_us`。
    pub fn measure_distance(&mut self) -> Result<f32, RangerError> {
        self.pulse_trigger()?;

        let start = self.clock.now_us();
        while !self.echo.is_high()? {
            if self.clock.now_us().saturating_sub(start) > self.echo_timeout_us {
                return Err(RangerError::Timeout {
                    edge: EchoEdge::Rise,
                    timeout_us: self.echo_timeout_us,
                });
            }
        }

        let echo_start = self.clock.now_us();
        while self.echo.is_high()? {
            if self.clock.now_us().saturating_sub(echo_start) > self.echo_timeout_us {
                return Err(RangerError::Timeout {
                    edge: EchoEdge::Fall,
                    timeout_us: self.echo_timeout_us,
                });
            }
        }
        let echo_end = self.clock.now_us();

        Ok(pulse_to_distance_cm(echo_end.saturating_sub(echo_start)))
    }

    fn pulse_trigger(&mut self) -> Result<(), HalError> {
        self.trigger.set_low()?;
        self.clock.delay_us(2);
        self.trigger.set_high()?;
        self.clock.delay_us(10);
        self.trigger.set_low()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_hal::mock::{MockClock, MockInput, UltrasonicSim};
    use linebot_hal::Level;
    use proptest::prelude::*;

    fn ranger_with(sim: &UltrasonicSim, clock: &MockClock) -> Ranger {
        Ranger::new(sim.trigger_pin(), sim.echo_pin(), Arc::new(clock.clone()), 30_000)
    }

    #[test]
    fn test_pulse_to_distance() {
        assert_eq!(pulse_to_distance_cm(0), 0.0);
        assert_eq!(pulse_to_distance_cm(100), 1.715_f32);
        assert!((pulse_to_distance_cm(583) - 9.998).abs() < 0.01);
        assert!((pulse_to_distance_cm(1166) - 19.997).abs() < 0.01);
    }

    #[test]
    fn test_pulse_to_distance_exact_values() {
        for pulse_us in [1u64, 7, 583, 1166, 29_999, 30_000] {
            let expected = (pulse_us as f64 * 0.0343 / 2.0) as f32;
            assert_eq!(pulse_to_distance_cm(pulse_us), expected, "pulse_us={}", pulse_us);
        }
    }

    proptest! {
        #[test]
        fn test_pulse_to_distance_formula(pulse_us in 0u64..=60_000) {
            let expected = (pulse_us as f64 * 0.0343 / 2.0) as f32;
            prop_assert_eq!(pulse_to_distance_cm(pulse_us), expected);
        }

        #[test]
        fn test_pulse_to_distance_monotonic(pulse_us in 0u64..60_000) {
            prop_assert!(pulse_to_distance_cm(pulse_us) <= pulse_to_distance_cm(pulse_us + 1));
        }
    }

    #[test]
    fn test_measure_exact_pulse() {
        let clock = MockClock::new();
        let sim = UltrasonicSim::new(clock.clone());
        sim.set_pulse_us(Some(583));
        let mut ranger = ranger_with(&sim, &clock);

        let distance = ranger.measure_distance().unwrap();
        assert!(sim.has_triggered());
        assert!((distance - pulse_to_distance_cm(583)).abs() < 1e-4, "distance={}", distance);
    }

    #[test]
    fn test_measure_from_distance() {
        let clock = MockClock::new();
        let sim = UltrasonicSim::new(clock.clone());
        let mut ranger = ranger_with(&sim, &clock);

        for target in [5.0_f32, 19.9, 20.0, 150.0] {
            sim.set_distance_cm(target);
            let distance = ranger.measure_distance().unwrap();
            assert!((distance - target).abs() < 0.05, "target={} got={}", target, distance);
        }
    }

    #[test]
    fn test_no_echo_times_out_on_rise() {
        let clock = MockClock::new();
        let sim = UltrasonicSim::new(clock.clone());
        sim.set_pulse_us(None);
        let mut ranger = ranger_with(&sim, &clock);

        let before = clock.peek_us();
        let err = ranger.measure_distance().unwrap_err();
        assert!(matches!(
            err,
            RangerError::Timeout {
                edge: EchoEdge::Rise,
                timeout_us: 30_000
            }
        ));
        // 超时后立即返回，不会无限等待
        let elapsed = clock.peek_us() - before;
        assert!(elapsed > 30_000 && elapsed < 30_200, "elapsed={}", elapsed);
    }

    #[test]
    fn test_stuck_echo_times_out_on_fall() {
        let clock = MockClock::new();
        let sim = UltrasonicSim::new(clock.clone());
        sim.set_pulse_us(Some(1_000_000));
        let mut ranger = ranger_with(&sim, &clock);

        let err = ranger.measure_distance().unwrap_err();
        assert!(matches!(err, RangerError::Timeout { edge: EchoEdge::Fall, .. }));
        assert!(format!("{}", err).contains("falling"));
    }

    #[test]
    fn test_custom_timeout_respected() {
        let clock = MockClock::new();
        let bank = linebot_hal::mock::MockOutputBank::new(clock.clone());
        let echo = MockInput::new(35, Level::Low);
        let mut ranger = Ranger::new(bank.pin(5), echo, Arc::new(clock.clone()), 100);
        assert!(matches!(
            ranger.measure_distance(),
            Err(RangerError::Timeout { edge: EchoEdge::Rise, timeout_us: 100 })
        ));
        assert!(clock.peek_us() < 200);
    }

    #[test]
    fn test_echo_read_failure() {
        let clock = MockClock::new();
        let bank = linebot_hal::mock::MockOutputBank::new(clock.clone());
        let echo = MockInput::new(35, Level::Low);
        echo.set_failing(true);
        let mut ranger = Ranger::new(bank.pin(5), echo, Arc::new(clock), 30_000);

        let err = ranger.measure_distance().unwrap_err();
        assert!(matches!(err, RangerError::Pin(HalError::Pin { pin: 35, .. })));
    }

    #[test]
    fn test_trigger_pulse_timing() {
        let clock = MockClock::new();
        let bank = linebot_hal::mock::MockOutputBank::new(clock.clone());
        let echo = MockInput::new(35, Level::Low);
        let mut ranger = Ranger::new(bank.pin(5), echo, Arc::new(clock), 10);
        let _ = ranger.measure_distance();

        let writes = bank.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0].level, Level::Low);
        assert_eq!(writes[1].level, Level::High);
        assert_eq!(writes[2].level, Level::Low);
        assert_eq!(writes[1].at_us - writes[0].at_us, 2);
        assert_eq!(writes[2].at_us - writes[1].at_us, 10);
    }
}
