//! 链路会话
//!
//! 消费传输层事件（连接、订阅确认、数据……），在每次连接建立后订阅命令与配置主题，
//! 并把数据事件交给 [`Router`]。传输层本身（MQTT 客户端、stdin 仿真……）通过
//! [`Transport`] trait 注入。

use crate::command::CommandSink;
use crate::error::LinkError;
use crate::router::{Routed, Router};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use linebot_protocol::Qos;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 订阅使用的 QoS
pub const SUBSCRIBE_QOS: Qos = Qos::AtMostOnce;

/// 发布使用的 QoS（至少一次，不保留）
pub const PUBLISH_QOS: Qos = Qos::AtLeastOnce;

/// 发布/订阅传输层
pub trait Transport: Send {
    /// 订阅主题，返回消息 ID
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<u32, LinkError>;

    /// 发布消息，返回消息 ID
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos, retain: bool)
    -> Result<u32, LinkError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<u32, LinkError> {
        (**self).subscribe(topic, qos)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: Qos,
        retain: bool,
    ) -> Result<u32, LinkError> {
        (**self).publish(topic, payload, qos, retain)
    }
}

/// 传输层事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Subscribed { msg_id: u32 },
    Unsubscribed { msg_id: u32 },
    Published { msg_id: u32 },
    Data { topic: String, payload: Vec<u8> },
    Error(String),
}

/// 链路会话
pub struct Session<S> {
    transport: Option<Box<dyn Transport>>,
    router: Router<S>,
    connected: bool,
}

impl<S: CommandSink> Session<S> {
    pub fn new(router: Router<S>) -> Self {
        Self {
            transport: None,
            router,
            connected: false,
        }
    }

    /// 挂接传输层
    pub fn attach(&mut self, transport: impl Transport + 'static) {
        self.transport = Some(Box::new(transport));
    }

    /// 卸下传输层
    pub fn detach(&mut self) -> Option<Box<dyn Transport>> {
        self.connected = false;
        self.transport.take()
    }

    pub fn is_started(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router<S> {
        &mut self.router
    }

    /// 订阅一个主题（QoS 0）
    pub fn subscribe(&mut self, topic: &str) -> Result<u32, LinkError> {
        let transport = self.transport.as_mut().ok_or(LinkError::NotStarted)?;
        let msg_id = transport.subscribe(topic, SUBSCRIBE_QOS)?;
        info!("Subscribed to {}, msg_id={}", topic, msg_id);
        Ok(msg_id)
    }

    /// 发布一条消息（QoS 1，不保留）
    ///
    /// 未挂接传输层时返回 `LinkError::NotStarted` 并记录警告。
    pub fn publish(&mut self, topic: &str, message: &str) -> Result<u32, LinkError> {
        let Some(transport) = self.transport.as_mut() else {
            warn!("Link client not started, cannot publish to {}", topic);
            return Err(LinkError::NotStarted);
        };
        let msg_id = transport.publish(topic, message.as_bytes(), PUBLISH_QOS, false)?;
        info!("Published to {}: {}, msg_id={}", topic, message, msg_id);
        Ok(msg_id)
    }

    /// 处理一个传输层事件
    ///
    /// 只有 `Data` 事件会到达路由器并返回路由结果。
    pub fn handle_event(&mut self, event: LinkEvent) -> Option<Routed> {
        match event {
            LinkEvent::Connected => {
                info!("Link connected");
                self.connected = true;
                self.subscribe_all();
                None
            },
            LinkEvent::Disconnected => {
                info!("Link disconnected");
                self.connected = false;
                None
            },
            LinkEvent::Subscribed { msg_id } => {
                debug!("Subscribed, msg_id={}", msg_id);
                None
            },
            LinkEvent::Unsubscribed { msg_id } => {
                debug!("Unsubscribed, msg_id={}", msg_id);
                None
            },
            LinkEvent::Published { msg_id } => {
                debug!("Published, msg_id={}", msg_id);
                None
            },
            LinkEvent::Data { topic, payload } => Some(self.router.route(&topic, &payload)),
            LinkEvent::Error(message) => {
                error!("Link error: {}", message);
                None
            },
        }
    }

    fn subscribe_all(&mut self) {
        let topics = self.router.topics().clone();
        for topic in topics.subscriptions() {
            if let Err(e) = self.subscribe(topic) {
                warn!("Failed to subscribe to {}: {}", topic, e);
            }
        }
    }

    /// 事件循环
    ///
    /// 以 `poll` 为切片等待事件并检查 `is_running`；事件通道关闭时退出。
    ///
    /// # 参数
    /// - `events`: 传输层事件通道
    /// - `poll`: 等待切片
    /// - `is_running`: 运行标志
    pub fn run(&mut self, events: &Receiver<LinkEvent>, poll: Duration, is_running: &AtomicBool) {
        info!("Link session started");

        loop {
            if !is_running.load(Ordering::Acquire) {
                trace!("Link session: is_running flag is false, exiting");
                break;
            }

            match events.recv_timeout(poll) {
                Ok(event) => {
                    self.handle_event(event);
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Link event channel closed");
                    break;
                },
            }
        }

        info!("Link session exited");
    }
}
