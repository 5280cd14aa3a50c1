//! 配置文件加载
//!
//! TOML 文件分为 `[driver]`、`[link]`、`[sim]` 三节，每个字段都可省略；文件不存在时使用默认值。
//!
//! ```toml
//! [driver]
//! obstacle_threshold_cm = 15.0
//! status_led = true
//!
//! [link]
//! command_topic = "/robot/command"
//!
//! [sim]
//! pace_ms = 10
//! distance_cm = 80.0
//! ```

use linebot_driver::{DriverConfig, DriverError};
use linebot_link::LinkConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] DriverError),
}

/// 仿真后端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 每次 ≥1ms 的虚拟延时对应的真实睡眠时间（毫秒）
    pub pace_ms: u64,
    /// 启动时左/右传感器是否压线
    pub left_on_line: bool,
    pub right_on_line: bool,
    /// 启动时前方障碍物距离（厘米），缺省表示没有回波
    pub distance_cm: Option<f32>,
    /// 启动后立即运行控制循环（否则等待 "start" 命令）
    pub autostart: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pace_ms: 10,
            left_on_line: true,
            right_on_line: true,
            distance_cm: None,
            autostart: false,
        }
    }
}

/// 程序配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub driver: DriverConfig,
    pub link: LinkConfig,
    pub sim: SimConfig,
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// - `None`：使用默认配置
    /// - 路径不存在：使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&content)?
            },
            Some(path) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            },
            None => Self::default(),
        };

        config.driver.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/linebot.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"
            [driver]
            obstacle_threshold_cm = 15.0
            status_led = true

            [sim]
            distance_cm = 12.5
            "#,
        )
        .unwrap();

        assert_eq!(config.driver.obstacle_threshold_cm, 15.0);
        assert!(config.driver.status_led);
        assert_eq!(config.driver.line_period_ms, 100);
        assert_eq!(config.link, LinkConfig::default());
        assert_eq!(config.sim.distance_cm, Some(12.5));
        assert_eq!(config.sim.pace_ms, 10);
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[driver]\nline_period_ms = 0").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(DriverError::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(AppConfig::parse("[driver"), Err(ConfigError::Toml(_))));
    }
}
