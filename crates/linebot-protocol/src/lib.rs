//! # Linebot Protocol
//!
//! 远程协议数据定义（无硬件、无传输依赖）
//!
//! ## 模块
//!
//! - `bounded`: 定长上限字符串 `BoundedStr<N>`（截断会被显式报告）
//! - `graph`: 导航图实体 `Node` / `Edge` 及容量常量
//! - `command`: 远程命令、主题与 QoS 定义
//!
//! ## 配置文档格式
//!
//! ```text
//! {
//!   "nodes": [ { "id": "<≤31 字节>" }, ... ],
//!   "edges": [ { "from": "<≤15 字节>", "to": "<≤15 字节>",
//!                "distance": <number>, "turn": "<≤15 字节>" }, ... ]
//! }
//! ```

pub mod bounded;
pub mod command;
pub mod graph;

// 重新导出常用类型
pub use bounded::{BoundedStr, BoundedStrError};
pub use command::*;
pub use graph::*;
