//! 远程命令执行端：`start` 启动控制线程，`stop` 协作式关闭

use linebot_driver::{DriverConfig, Robot};
use linebot_link::CommandSink;
use tracing::{error, info, warn};

use crate::sim::SimRig;

pub struct RobotSink {
    rig: SimRig,
    config: DriverConfig,
    robot: Option<Robot>,
}

impl RobotSink {
    pub fn new(rig: SimRig, config: DriverConfig) -> Self {
        Self {
            rig,
            config,
            robot: None,
        }
    }

    pub fn robot(&self) -> Option<&Robot> {
        self.robot.as_ref()
    }
}

impl CommandSink for RobotSink {
    fn start(&mut self) {
        if self.robot.is_some() {
            warn!("Robot already running");
            return;
        }
        info!("Starting robot...");
        match self.rig.builder(self.config.clone()).build() {
            Ok(robot) => self.robot = Some(robot),
            Err(e) => error!("Failed to start robot: {}", e),
        }
    }

    fn stop(&mut self) {
        let Some(robot) = self.robot.take() else {
            warn!("Robot is not running");
            return;
        };
        info!("Stopping robot...");
        let metrics = robot.metrics();
        if let Err(e) = robot.shutdown() {
            error!("Robot shutdown failed: {}", e);
        }
        info!("Final metrics: {:?}", metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn test_start_stop_cycle() {
        let rig = SimRig::new(&SimConfig {
            pace_ms: 1,
            ..SimConfig::default()
        });
        let mut sink = RobotSink::new(rig, DriverConfig::default());

        sink.stop();
        assert!(sink.robot().is_none());

        sink.start();
        assert!(sink.robot().is_some_and(|robot| robot.is_running()));
        // 重复启动不会创建第二组线程
        sink.start();
        assert_eq!(sink.robot().map(|robot| robot.thread_names().len()), Some(3));

        sink.stop();
        assert!(sink.robot().is_none());
    }
}
