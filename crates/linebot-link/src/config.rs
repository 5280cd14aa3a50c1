//! 链路配置

use linebot_protocol::{DEFAULT_COMMAND_TOPIC, DEFAULT_CONFIG_TOPIC, Topics};
use serde::{Deserialize, Serialize};

/// 默认 broker 地址
pub const DEFAULT_BROKER_URI: &str = "mqtt://broker.hivemq.com";

/// 链路配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Broker 地址（仅用于日志和真实传输层，回环/仿真传输层忽略）
    pub broker_uri: String,
    pub command_topic: String,
    pub config_topic: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            broker_uri: DEFAULT_BROKER_URI.to_string(),
            command_topic: DEFAULT_COMMAND_TOPIC.to_string(),
            config_topic: DEFAULT_CONFIG_TOPIC.to_string(),
        }
    }
}

impl LinkConfig {
    pub fn topics(&self) -> Topics {
        Topics::new(self.command_topic.clone(), self.config_topic.clone())
    }
}
