//! 回环传输层
//!
//! 不连接任何 broker：记录订阅和发布，并可把事件注入到会话的事件通道中。
//! 用于测试和仿真程序。

use crate::error::LinkError;
use crate::session::{LinkEvent, Transport};
use crossbeam_channel::Sender;
use linebot_protocol::Qos;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// 一次发布记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub msg_id: u32,
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
}

#[derive(Debug, Default)]
struct LoopbackState {
    subscriptions: Vec<(String, Qos)>,
    published: Vec<Publication>,
}

/// 回环传输层（克隆体共享状态）
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
    next_msg_id: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
    /// 设置后，每次订阅/发布都会回送对应的确认事件
    acks: Option<Sender<LinkEvent>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把订阅/发布确认回送到事件通道
    pub fn with_acks(mut self, events: Sender<LinkEvent>) -> Self {
        self.acks = Some(events);
        self
    }

    pub fn subscriptions(&self) -> Vec<(String, Qos)> {
        self.state.lock().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<Publication> {
        self.state.lock().published.clone()
    }

    /// 让后续操作返回传输错误
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    fn check(&self) -> Result<u32, LinkError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(LinkError::Transport("loopback transport failing".to_string()));
        }
        Ok(self.next_msg_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn ack(&self, event: LinkEvent) {
        if let Some(events) = &self.acks {
            // 会话已退出时确认事件直接丢弃
            let _ = events.send(event);
        }
    }
}

impl Transport for LoopbackTransport {
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<u32, LinkError> {
        let msg_id = self.check()?;
        self.state.lock().subscriptions.push((topic.to_string(), qos));
        self.ack(LinkEvent::Subscribed { msg_id });
        Ok(msg_id)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: Qos,
        retain: bool,
    ) -> Result<u32, LinkError> {
        let msg_id = self.check()?;
        self.state.lock().published.push(Publication {
            msg_id,
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        self.ack(LinkEvent::Published { msg_id });
        Ok(msg_id)
    }
}
