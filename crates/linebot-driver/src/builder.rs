//! Builder 模式实现
//!
//! 提供链式构造 [`Robot`] 的便捷方式：注入硬件协作者，然后一次性创建所有控制线程。

use crate::alert::alert_signal;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::metrics::LoopMetrics;
use crate::motion::{MotorPins, Motors};
use crate::pipeline::{
    AlertDispatcher, LineFollower, ObstacleGuard, alert_loop, line_follow_loop, obstacle_loop,
    status_led_loop,
};
use crate::ranger::Ranger;
use crate::robot::{
    ALERT_THREAD, LINE_FOLLOW_THREAD, OBSTACLE_THREAD, Robot, STATUS_LED_THREAD,
};
use linebot_hal::{AudioPlayer, Clock, InputPin, LogAudio, OutputPin, SystemClock};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info};

/// Robot Builder（链式构造）
///
/// 巡线传感器、电机引脚和超声波引脚是必需的；音频默认只打日志（[`LogAudio`]），
/// 时钟默认是 [`SystemClock`]。
///
/// # Example
///
/// ```
/// use linebot_driver::{DriverConfig, RobotBuilder};
/// use linebot_hal::Level;
/// use linebot_hal::mock::{MockClock, MockInput, MockOutputBank, UltrasonicSim};
/// use std::sync::Arc;
///
/// let clock = MockClock::new();
/// let bank = MockOutputBank::new(clock.clone());
/// let sonar_clock = MockClock::new();
/// let sonar = UltrasonicSim::new(sonar_clock.clone());
///
/// let robot = RobotBuilder::new()
///     .config(DriverConfig::default())
///     .clock(Arc::new(clock))
///     .ranger_clock(Arc::new(sonar_clock))
///     .line_sensors(MockInput::new(34, Level::Low), MockInput::new(35, Level::Low))
///     .motor_pins(bank.pin(32), bank.pin(33), bank.pin(25), bank.pin(26))
///     .ranger_pins(sonar.trigger_pin(), sonar.echo_pin())
///     .build()
///     .unwrap();
///
/// robot.shutdown().unwrap();
/// ```
pub struct RobotBuilder {
    config: DriverConfig,
    /// 周期休眠与转向延时使用的时钟
    clock: Option<Arc<dyn Clock>>,
    /// 超声波计时使用的时钟（默认与 `clock` 相同）
    ranger_clock: Option<Arc<dyn Clock>>,
    line_sensors: Option<(Box<dyn InputPin>, Box<dyn InputPin>)>,
    motor_pins: Option<MotorPins>,
    ranger_pins: Option<(Box<dyn OutputPin>, Box<dyn InputPin>)>,
    audio: Option<Box<dyn AudioPlayer>>,
    status_led: Option<Box<dyn OutputPin>>,
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self {
            config: DriverConfig::default(),
            clock: None,
            ranger_clock: None,
            line_sensors: None,
            motor_pins: None,
            ranger_pins: None,
            audio: None,
            status_led: None,
        }
    }

    /// 设置驱动配置（可选，默认 [`DriverConfig::default`]）
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 为超声波测距单独指定时钟
    ///
    /// 仿真时其他线程的虚拟延时会推进共享时钟，测距需要一个只属于自己的时钟才能得到准确脉宽。
    pub fn ranger_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ranger_clock = Some(clock);
        self
    }

    /// 左、右红外巡线传感器
    pub fn line_sensors(
        mut self,
        left: impl InputPin + 'static,
        right: impl InputPin + 'static,
    ) -> Self {
        self.line_sensors = Some((Box::new(left), Box::new(right)));
        self
    }

    /// 电机方向引脚（左前, 左后, 右前, 右后）
    pub fn motor_pins(
        mut self,
        left_forward: impl OutputPin + 'static,
        left_backward: impl OutputPin + 'static,
        right_forward: impl OutputPin + 'static,
        right_backward: impl OutputPin + 'static,
    ) -> Self {
        self.motor_pins = Some(MotorPins::new(
            left_forward,
            left_backward,
            right_forward,
            right_backward,
        ));
        self
    }

    /// 超声波 TRIG / ECHO 引脚
    pub fn ranger_pins(
        mut self,
        trigger: impl OutputPin + 'static,
        echo: impl InputPin + 'static,
    ) -> Self {
        self.ranger_pins = Some((Box::new(trigger), Box::new(echo)));
        self
    }

    pub fn audio(mut self, audio: impl AudioPlayer + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    /// 状态灯引脚（仅在 `config.status_led = true` 时使用）
    pub fn status_led(mut self, led: impl OutputPin + 'static) -> Self {
        self.status_led = Some(Box::new(led));
        self
    }

    /// 初始化电机并创建所有控制线程
    ///
    /// # 错误
    /// - `DriverError::InvalidConfig`: 配置校验失败
    /// - `DriverError::MissingComponent`: 缺少必需的硬件协作者
    /// - `DriverError::Spawn`: 线程创建失败（已创建的线程会被停止并回收）
    pub fn build(self) -> Result<Robot, DriverError> {
        let Self {
            config,
            clock,
            ranger_clock,
            line_sensors,
            motor_pins,
            ranger_pins,
            audio,
            status_led,
        } = self;

        config.validate()?;

        let (left, right) = line_sensors.ok_or(DriverError::MissingComponent("line sensors"))?;
        let motor_pins = motor_pins.ok_or(DriverError::MissingComponent("motor pins"))?;
        let (trigger, echo) = ranger_pins.ok_or(DriverError::MissingComponent("ranger pins"))?;
        let status_led = match (config.status_led, status_led) {
            (true, Some(led)) => Some(led),
            (true, None) => return Err(DriverError::MissingComponent("status LED pin")),
            (false, Some(_)) => {
                debug!("Status LED pin provided but status_led is disabled");
                None
            },
            (false, None) => None,
        };

        let clock: Arc<dyn Clock> = clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let ranger_clock = ranger_clock.unwrap_or_else(|| clock.clone());
        let audio: Box<dyn AudioPlayer> = audio.unwrap_or_else(|| Box::new(LogAudio));

        // 电机引脚初始化为低电平
        let motors = Motors::new(motor_pins, clock.clone(), config.turn_duration());
        let metrics = Arc::new(LoopMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let (signal, receiver) = alert_signal();

        let follower = LineFollower::new(left, right, motors.clone(), metrics.clone())
            .inverted(config.invert_line_sensors);
        let ranger = Ranger::new(trigger, echo, ranger_clock, config.echo_timeout_us);
        let guard = ObstacleGuard::new(
            ranger,
            motors.clone(),
            signal.clone(),
            config.obstacle_threshold_cm,
            metrics.clone(),
        );
        let dispatcher =
            AlertDispatcher::new(receiver, audio, config.alert_clip.clone(), metrics.clone());

        // 先构造 Robot：后续任一线程创建失败时，Drop 会回收已经启动的线程
        let mut robot = Robot::new(
            is_running.clone(),
            metrics,
            signal,
            motors,
            config.clone(),
        );

        let handle = {
            let clock = clock.clone();
            let is_running = is_running.clone();
            let period = config.line_period();
            std::thread::Builder::new()
                .name(LINE_FOLLOW_THREAD.to_string())
                .spawn(move || line_follow_loop(follower, clock, period, is_running))?
        };
        robot.attach(LINE_FOLLOW_THREAD, handle);

        let handle = {
            let clock = clock.clone();
            let is_running = is_running.clone();
            let period = config.obstacle_period();
            std::thread::Builder::new()
                .name(OBSTACLE_THREAD.to_string())
                .spawn(move || obstacle_loop(guard, clock, period, is_running))?
        };
        robot.attach(OBSTACLE_THREAD, handle);

        let handle = {
            let is_running = is_running.clone();
            let poll = config.alert_poll();
            std::thread::Builder::new()
                .name(ALERT_THREAD.to_string())
                .spawn(move || alert_loop(dispatcher, poll, is_running))?
        };
        robot.attach(ALERT_THREAD, handle);

        if let Some(led) = status_led {
            let clock = clock.clone();
            let is_running = is_running.clone();
            let half_period = config.status_led_half_period();
            let handle = std::thread::Builder::new()
                .name(STATUS_LED_THREAD.to_string())
                .spawn(move || status_led_loop(led, clock, half_period, is_running))?;
            robot.attach(STATUS_LED_THREAD, handle);
        }

        info!("Robot started with threads {:?}", robot.thread_names());
        Ok(robot)
    }
}

impl Default for RobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
