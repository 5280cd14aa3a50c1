//! 基于行的 stdin/stdout 传输层
//!
//! 输入每行一条：
//!
//! - `<topic> <payload>`：作为该主题上的一条消息投递（payload 为行内剩余文本，可含空格）
//! - `!<directive>`：仿真指令，见 [`crate::sim::SimDirective`]
//! - 空行和 `#` 开头的行被忽略
//!
//! 发布的消息以 `<topic> <payload>` 的形式写到 stdout。

use crossbeam_channel::Sender;
use linebot_link::{LinkError, LinkEvent, Transport};
use linebot_protocol::Qos;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::sim::{SimDirective, SimRig};

/// 解析后的输入行
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Message { topic: String, payload: String },
    Sim(SimDirective),
    Blank,
    Invalid(String),
}

impl InputLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Self::Blank;
        }
        if let Some(directive) = trimmed.strip_prefix('!') {
            return match SimDirective::parse(directive) {
                Some(directive) => Self::Sim(directive),
                None => Self::Invalid(line.to_string()),
            };
        }
        match trimmed.split_once(' ') {
            Some((topic, payload)) => Self::Message {
                topic: topic.to_string(),
                payload: payload.to_string(),
            },
            // 只有主题、没有载荷
            None => Self::Message {
                topic: trimmed.to_string(),
                payload: String::new(),
            },
        }
    }
}

/// 读取输入直到 EOF，把消息转成链路事件
///
/// 先发送一次 `Connected`（stdin 链路总是已连接），EOF 时发送 `Disconnected` 后返回。
pub fn pump_lines(input: impl BufRead, events: &Sender<LinkEvent>, rig: &SimRig) {
    if events.send(LinkEvent::Connected).is_err() {
        return;
    }

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                let _ = events.send(LinkEvent::Error(e.to_string()));
                break;
            },
        };

        let event = match InputLine::parse(&line) {
            InputLine::Message { topic, payload } => LinkEvent::Data {
                topic,
                payload: payload.into_bytes(),
            },
            InputLine::Sim(directive) => {
                rig.apply(&directive);
                continue;
            },
            InputLine::Blank => continue,
            InputLine::Invalid(line) => {
                warn!("Ignoring invalid input line: {}", line);
                continue;
            },
        };

        if events.send(event).is_err() {
            debug!("Link session gone, stopping input pump");
            return;
        }
    }

    info!("Input closed");
    let _ = events.send(LinkEvent::Disconnected);
}

/// stdout 传输层
pub struct StdoutTransport {
    events: Sender<LinkEvent>,
    next_msg_id: u32,
}

impl StdoutTransport {
    pub fn new(events: Sender<LinkEvent>) -> Self {
        Self {
            events,
            next_msg_id: 0,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_msg_id = self.next_msg_id.wrapping_add(1);
        self.next_msg_id
    }
}

impl Transport for StdoutTransport {
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<u32, LinkError> {
        let msg_id = self.next_id();
        debug!("stdin link: subscribe {} qos={}", topic, qos.as_u8());
        let _ = self.events.send(LinkEvent::Subscribed { msg_id });
        Ok(msg_id)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        _qos: Qos,
        _retain: bool,
    ) -> Result<u32, LinkError> {
        let msg_id = self.next_id();
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{} {}", topic, String::from_utf8_lossy(payload))
            .map_err(|e| LinkError::Transport(e.to_string()))?;
        let _ = self.events.send(LinkEvent::Published { msg_id });
        Ok(msg_id)
    }
}
