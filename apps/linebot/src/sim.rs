//! 仿真硬件
//!
//! 用 `linebot_hal::mock` 组装一套完整的小车硬件：两个巡线传感器、四路电机引脚、
//! 超声波模块、状态灯和只打日志的扬声器。所有句柄可克隆，stdin 线程可以在运行中改写传感器。

use linebot_driver::{DriverConfig, RobotBuilder};
use linebot_hal::mock::{MockClock, MockInput, MockOutputBank, UltrasonicSim};
use linebot_hal::{Level, LogAudio};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::SimConfig;

/// 引脚号（与原型板一致）
pub const LEFT_SENSOR_PIN: u8 = 34;
pub const RIGHT_SENSOR_PIN: u8 = 35;
pub const MOTOR_LEFT_FORWARD_PIN: u8 = 32;
pub const MOTOR_LEFT_BACKWARD_PIN: u8 = 33;
pub const MOTOR_RIGHT_FORWARD_PIN: u8 = 25;
pub const MOTOR_RIGHT_BACKWARD_PIN: u8 = 26;
pub const STATUS_LED_PIN: u8 = 2;

/// 仿真指令（stdin 中以 `!` 开头的行）
#[derive(Debug, Clone, PartialEq)]
pub enum SimDirective {
    /// `!line <left> <right>`，0/1
    Line { left: Level, right: Level },
    /// `!distance <cm>`
    Distance(f32),
    /// `!noecho`
    NoEcho,
}

impl SimDirective {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        match parts.next()? {
            "line" => {
                let left = parse_level(parts.next()?)?;
                let right = parse_level(parts.next()?)?;
                Some(Self::Line { left, right })
            },
            "distance" => parts.next()?.parse().ok().map(Self::Distance),
            "noecho" => Some(Self::NoEcho),
            _ => None,
        }
    }
}

fn parse_level(text: &str) -> Option<Level> {
    match text {
        "0" => Some(Level::Low),
        "1" => Some(Level::High),
        _ => None,
    }
}

/// 仿真硬件组
#[derive(Debug, Clone)]
pub struct SimRig {
    clock: MockClock,
    bank: MockOutputBank,
    left: MockInput,
    right: MockInput,
    sonar_clock: MockClock,
    sonar: UltrasonicSim,
}

impl SimRig {
    pub fn new(config: &SimConfig) -> Self {
        let clock = MockClock::new().with_pace(Duration::from_millis(config.pace_ms));
        let bank = MockOutputBank::new(clock.clone());
        let sonar_clock = MockClock::new();
        let sonar = UltrasonicSim::new(sonar_clock.clone());

        let rig = Self {
            clock,
            bank,
            left: MockInput::new(LEFT_SENSOR_PIN, Level::from(config.left_on_line)),
            right: MockInput::new(RIGHT_SENSOR_PIN, Level::from(config.right_on_line)),
            sonar_clock,
            sonar,
        };
        match config.distance_cm {
            Some(distance) => rig.apply(&SimDirective::Distance(distance)),
            None => rig.apply(&SimDirective::NoEcho),
        }
        rig
    }

    /// 执行一条仿真指令
    pub fn apply(&self, directive: &SimDirective) {
        match directive {
            SimDirective::Line { left, right } => {
                self.left.set(*left);
                self.right.set(*right);
            },
            SimDirective::Distance(distance) => self.sonar.set_distance_cm(*distance),
            SimDirective::NoEcho => self.sonar.set_pulse_us(None),
        }
        info!("Sim: {:?}", directive);
    }

    /// 当前电机引脚电平（左前, 左后, 右前, 右后）
    pub fn motor_levels(&self) -> [Level; 4] {
        [
            self.bank.level(MOTOR_LEFT_FORWARD_PIN),
            self.bank.level(MOTOR_LEFT_BACKWARD_PIN),
            self.bank.level(MOTOR_RIGHT_FORWARD_PIN),
            self.bank.level(MOTOR_RIGHT_BACKWARD_PIN),
        ]
    }

    /// 用本硬件组装配一个 Builder
    pub fn builder(&self, config: DriverConfig) -> RobotBuilder {
        RobotBuilder::new()
            .config(config)
            .clock(Arc::new(self.clock.clone()))
            .ranger_clock(Arc::new(self.sonar_clock.clone()))
            .line_sensors(self.left.clone(), self.right.clone())
            .motor_pins(
                self.bank.pin(MOTOR_LEFT_FORWARD_PIN),
                self.bank.pin(MOTOR_LEFT_BACKWARD_PIN),
                self.bank.pin(MOTOR_RIGHT_FORWARD_PIN),
                self.bank.pin(MOTOR_RIGHT_BACKWARD_PIN),
            )
            .ranger_pins(self.sonar.trigger_pin(), self.sonar.echo_pin())
            .audio(LogAudio)
            .status_led(self.bank.pin(STATUS_LED_PIN))
    }
}
