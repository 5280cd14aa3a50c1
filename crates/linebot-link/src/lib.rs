//! # Linebot Link
//!
//! 远程摄取管线：
//!
//! - `graph`: 有界导航图存储（`GraphStore`）与无锁快照（`SharedGraph`）
//! - `ingest`: 配置文档摄取（按类型“替换或保留”）
//! - `command`: 远程命令处理（`CommandSink` 注入执行端）
//! - `router`: 入站消息按主题路由
//! - `session`: 传输层事件处理、连接后自动订阅、发布
//! - `loopback`: 无 broker 的回环传输层
//!
//! # Example
//!
//! ```
//! use linebot_link::{LogCommandSink, Router, SharedGraph, Routed};
//! use linebot_protocol::Topics;
//! use std::sync::Arc;
//!
//! let graph = Arc::new(SharedGraph::new());
//! let mut router = Router::new(Topics::default(), graph.clone(), LogCommandSink);
//!
//! router.route("/robot/config", br#"{"nodes":[{"id":"A"},{"id":"B"}]}"#);
//! assert_eq!(graph.snapshot().node_count(), 2);
//!
//! assert!(matches!(router.route("/robot/status", b"hello"), Routed::UnknownTopic));
//! ```

pub mod command;
pub mod config;
mod error;
pub mod graph;
pub mod ingest;
pub mod loopback;
pub mod router;
pub mod session;

pub use command::{CommandProcessor, CommandSink, LogCommandSink};
pub use config::{DEFAULT_BROKER_URI, LinkConfig};
pub use error::{IngestError, LinkError};
pub use graph::{GraphStore, SharedGraph};
pub use ingest::{IngestReport, KindOutcome, ReplaceStats, ingest_config};
pub use loopback::{LoopbackTransport, Publication};
pub use router::{Inbound, Routed, Router};
pub use session::{LinkEvent, PUBLISH_QOS, SUBSCRIBE_QOS, Session, Transport};
