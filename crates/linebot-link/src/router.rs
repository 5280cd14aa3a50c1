//! 入站消息路由
//!
//! 主题只在这里与字符串比较一次，之后以 [`Inbound`] 枚举流转：
//! 命令主题的载荷按文本交给命令处理器，配置主题的载荷交给图摄取，其它主题记录后丢弃。

use crate::command::{CommandProcessor, CommandSink};
use crate::error::IngestError;
use crate::graph::SharedGraph;
use crate::ingest::IngestReport;
use linebot_protocol::{Command, TopicKind, Topics};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 已分类的入站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// 命令文本（非 UTF-8 字节按有损方式解码，因此不可能匹配已知命令）
    Command(Cow<'a, str>),
    /// 待摄取的配置文档
    Config(&'a [u8]),
    /// 未订阅的主题
    Unknown { topic: &'a str },
}

impl<'a> Inbound<'a> {
    pub fn classify(topics: &Topics, topic: &'a str, payload: &'a [u8]) -> Self {
        match topics.classify(topic) {
            TopicKind::Command => Self::Command(String::from_utf8_lossy(payload)),
            TopicKind::Config => Self::Config(payload),
            TopicKind::Unknown => Self::Unknown { topic },
        }
    }
}

/// 路由结果
#[derive(Debug)]
pub enum Routed {
    Command(Command),
    Config(Result<IngestReport, IngestError>),
    UnknownTopic,
}

/// 入站路由器（导航图的唯一写者）
pub struct Router<S> {
    topics: Topics,
    graph: Arc<SharedGraph>,
    commands: CommandProcessor<S>,
}

impl<S: CommandSink> Router<S> {
    pub fn new(topics: Topics, graph: Arc<SharedGraph>, sink: S) -> Self {
        Self {
            topics,
            graph,
            commands: CommandProcessor::new(sink),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// 共享的导航图（供读者获取快照）
    pub fn graph(&self) -> &Arc<SharedGraph> {
        &self.graph
    }

    pub fn commands(&self) -> &CommandProcessor<S> {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandProcessor<S> {
        &mut self.commands
    }

    /// 路由一条入站消息
    pub fn route(&mut self, topic: &str, payload: &[u8]) -> Routed {
        debug!("Inbound message on {} ({} bytes)", topic, payload.len());
        match Inbound::classify(&self.topics, topic, payload) {
            Inbound::Command(text) => {
                info!("Received command: {}", text);
                Routed::Command(self.commands.process(&text))
            },
            Inbound::Config(document) => {
                let result = self.graph.ingest_config(document);
                if let Ok(report) = &result {
                    info!("Config applied: nodes {}, edges {}", report.nodes, report.edges);
                }
                Routed::Config(result)
            },
            Inbound::Unknown { topic } => {
                warn!("Message on unknown topic {}, discarded", topic);
                Routed::UnknownTopic
            },
        }
    }
}
