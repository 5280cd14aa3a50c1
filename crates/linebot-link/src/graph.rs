//! 导航图存储
//!
//! [`GraphStore`] 是一个有界的节点序列和边序列，只能整体替换（按类型分别替换）。
//! [`SharedGraph`] 把它放进 `ArcSwap`：读者无锁地拿到不可变快照，
//! 摄取在副本上完成后一次原子替换发布，读者永远看不到摄取到一半的存储。

use crate::error::IngestError;
use crate::ingest::{IngestReport, ingest_config};
use arc_swap::ArcSwap;
use linebot_protocol::{Edge, MAX_EDGES, MAX_NODES, Node};
use parking_lot::Mutex;
use std::sync::Arc;

/// 有界导航图存储
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// 用新序列整体替换节点
    ///
    /// 超出 [`MAX_NODES`] 的部分被丢弃，返回丢弃的数量。
    pub fn replace_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        replace_bounded(&mut self.nodes, nodes, MAX_NODES)
    }

    /// 用新序列整体替换边
    ///
    /// 超出 [`MAX_EDGES`] 的部分被丢弃，返回丢弃的数量。
    pub fn replace_edges(&mut self, edges: impl IntoIterator<Item = Edge>) -> usize {
        replace_bounded(&mut self.edges, edges, MAX_EDGES)
    }

    /// 按 ID 查找第一个匹配的节点（ID 不保证唯一）
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// 从指定节点出发的所有边（按存储顺序）
    pub fn edges_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.from == from)
    }
}

fn replace_bounded<T>(slot: &mut Vec<T>, items: impl IntoIterator<Item = T>, capacity: usize) -> usize {
    slot.clear();
    let mut discarded = 0;
    for item in items {
        if slot.len() < capacity {
            slot.push(item);
        } else {
            discarded += 1;
        }
    }
    discarded
}

/// 可在线程间共享的导航图（单写者、无锁读者）
#[derive(Debug)]
pub struct SharedGraph {
    current: ArcSwap<GraphStore>,
    /// 串行化写者，保证“读取-修改-发布”之间不会丢失更新
    writer: Mutex<()>,
}

impl SharedGraph {
    pub fn new() -> Self {
        Self::from_store(GraphStore::new())
    }

    pub fn from_store(store: GraphStore) -> Self {
        Self {
            current: ArcSwap::from_pointee(store),
            writer: Mutex::new(()),
        }
    }

    /// 获取当前存储的快照（无锁）
    pub fn snapshot(&self) -> Arc<GraphStore> {
        self.current.load_full()
    }

    pub fn node_count(&self) -> usize {
        self.current.load().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.current.load().edge_count()
    }

    /// 摄取一份配置文档
    ///
    /// 文档解析失败时存储保持原样并返回错误；否则按类型“替换或保留”，
    /// 只有至少一种类型被替换时才发布新快照。
    pub fn ingest_config(&self, payload: &[u8]) -> Result<IngestReport, IngestError> {
        let _guard = self.writer.lock();
        let mut next = self.current.load().as_ref().clone();
        let report = ingest_config(&mut next, payload)?;
        if report.changed() {
            self.current.store(Arc::new(next));
        }
        Ok(report)
    }
}

impl Default for SharedGraph {
    fn default() -> Self {
        Self::new()
    }
}
