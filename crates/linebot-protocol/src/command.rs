//! 远程命令、主题与 QoS
//!
//! 入站文本只在边界处解析一次，之后都以闭合枚举流转，避免到处散落字符串比较。

use std::fmt;

/// 默认命令主题
pub const DEFAULT_COMMAND_TOPIC: &str = "/robot/command";

/// 默认配置主题
pub const DEFAULT_CONFIG_TOPIC: &str = "/robot/config";

/// 远程命令
///
/// 精确、大小写敏感匹配：只有 `"start"` 和 `"stop"` 是已知命令，
/// `"Start"`、`" stop"` 等一律是 [`Command::Unknown`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// 未知命令（保留原始文本用于日志）
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        match text {
            "start" => Self::Start,
            "stop" => Self::Stop,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

/// 发布/订阅服务质量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Qos {
    /// 最多一次（订阅默认值）
    #[default]
    AtMostOnce = 0,
    /// 至少一次（发布固定使用）
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl Qos {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 入站主题分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Command,
    Config,
    Unknown,
}

/// 订阅的主题对
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topics {
    pub command: String,
    pub config: String,
}

impl Topics {
    pub fn new(command: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            config: config.into(),
        }
    }

    /// 精确字符串匹配分类
    pub fn classify(&self, topic: &str) -> TopicKind {
        if topic == self.command {
            TopicKind::Command
        } else if topic == self.config {
            TopicKind::Config
        } else {
            TopicKind::Unknown
        }
    }

    /// 连接建立后需要订阅的全部主题
    pub fn subscriptions(&self) -> [&str; 2] {
        [self.command.as_str(), self.config.as_str()]
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TOPIC, DEFAULT_CONFIG_TOPIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse_known() {
        assert_eq!(Command::parse("start"), Command::Start);
        assert_eq!(Command::parse("stop"), Command::Stop);
        assert!(Command::parse("start").is_known());
    }

    #[test]
    fn test_command_parse_is_case_sensitive() {
        assert_eq!(Command::parse("Start"), Command::Unknown("Start".to_string()));
        assert_eq!(Command::parse("STOP"), Command::Unknown("STOP".to_string()));
        assert_eq!(Command::parse(" stop"), Command::Unknown(" stop".to_string()));
        assert_eq!(Command::parse("pause"), Command::Unknown("pause".to_string()));
        assert!(!Command::parse("").is_known());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(format!("{}", Command::Start), "start");
        assert_eq!(format!("{}", Command::Unknown("pause".into())), "unknown(pause)");
    }

    #[test]
    fn test_topics_classify_exact() {
        let topics = Topics::default();
        assert_eq!(topics.classify("/robot/command"), TopicKind::Command);
        assert_eq!(topics.classify("/robot/config"), TopicKind::Config);
        assert_eq!(topics.classify("/robot/status"), TopicKind::Unknown);
        // 前缀不算匹配
        assert_eq!(topics.classify("/robot/com"), TopicKind::Unknown);
        assert_eq!(topics.classify("/robot/configX"), TopicKind::Unknown);
    }

    #[test]
    fn test_topics_subscriptions() {
        let topics = Topics::new("cmd", "cfg");
        assert_eq!(topics.subscriptions(), ["cmd", "cfg"]);
    }

    #[test]
    fn test_qos_values() {
        assert_eq!(Qos::AtMostOnce.as_u8(), 0);
        assert_eq!(Qos::AtLeastOnce.as_u8(), 1);
        assert_eq!(Qos::default(), Qos::AtMostOnce);
    }
}
