//! 配置文档摄取
//!
//! 语义是“按类型替换或保留”：
//!
//! - 整份文档解析失败 → 返回错误，节点和边都不动；
//! - `nodes` / `edges` 字段不是数组（缺失、类型不对、或文档本身不是对象）→ 该类型保持原样；
//! - 字段是数组 → 该类型清空后逐条扫描：不合格的条目跳过，合格的条目截断超长字符串后存入，
//!   达到容量后停止扫描，剩余条目丢弃。

use crate::error::IngestError;
use crate::graph::GraphStore;
use linebot_protocol::{Edge, MAX_EDGES, MAX_NODES, Node};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

/// 单个类型被替换时的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceStats {
    /// 存入的条目数（即新的计数）
    pub stored: usize,
    /// 字段校验失败而跳过的条目数
    pub skipped: usize,
    /// 存入时有字段被截断的条目数
    pub truncated: usize,
    /// 达到容量后未被扫描的条目数
    pub discarded: usize,
}

/// 单个类型的摄取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindOutcome {
    /// 文档中没有该类型的数组，原序列保持不变
    Kept,
    /// 原序列被整体替换
    Replaced(ReplaceStats),
}

impl KindOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }

    pub fn stats(&self) -> Option<ReplaceStats> {
        match self {
            Self::Kept => None,
            Self::Replaced(stats) => Some(*stats),
        }
    }
}

impl fmt::Display for KindOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kept => f.write_str("kept"),
            Self::Replaced(s) => write!(
                f,
                "replaced (stored {}, skipped {}, truncated {}, discarded {})",
                s.stored, s.skipped, s.truncated, s.discarded
            ),
        }
    }
}

/// 一次摄取的报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub nodes: KindOutcome,
    pub edges: KindOutcome,
}

impl IngestReport {
    /// 是否有任一类型被替换
    pub fn changed(&self) -> bool {
        self.nodes.is_replaced() || self.edges.is_replaced()
    }
}

/// 把配置文档摄取进 `store`
///
/// # 参数
/// - `store`: 目标存储（解析失败时不会被修改）
/// - `payload`: UTF-8 编码的 JSON 文档
///
/// # 错误
/// - `IngestError::NotUtf8`: 载荷不是合法 UTF-8
/// - `IngestError::DocumentParse`: 载荷不是格式良好的 JSON
pub fn ingest_config(store: &mut GraphStore, payload: &[u8]) -> Result<IngestReport, IngestError> {
    info!("Parsing robot config document ({} bytes)", payload.len());

    let document = match parse_document(payload) {
        Ok(document) => document,
        Err(e) => {
            warn!("Config rejected, graph unchanged: {}", e);
            return Err(e);
        },
    };

    let nodes = match document.get("nodes").and_then(Value::as_array) {
        Some(entries) => {
            let (parsed, stats) = scan(entries, MAX_NODES, parse_node);
            store.replace_nodes(parsed);
            info!("Total nodes parsed: {}", stats.stored);
            KindOutcome::Replaced(stats)
        },
        None => {
            warn!("No valid 'nodes' array in config, keeping {} nodes", store.node_count());
            KindOutcome::Kept
        },
    };

    let edges = match document.get("edges").and_then(Value::as_array) {
        Some(entries) => {
            let (parsed, stats) = scan(entries, MAX_EDGES, parse_edge);
            store.replace_edges(parsed);
            info!("Total edges parsed: {}", stats.stored);
            KindOutcome::Replaced(stats)
        },
        None => {
            warn!("No valid 'edges' array in config, keeping {} edges", store.edge_count());
            KindOutcome::Kept
        },
    };

    let report = IngestReport { nodes, edges };
    if let Some(stats) = nodes.stats().filter(|s| s.skipped + s.truncated + s.discarded > 0) {
        warn!("Node ingestion was lossy: {:?}", stats);
    }
    if let Some(stats) = edges.stats().filter(|s| s.skipped + s.truncated + s.discarded > 0) {
        warn!("Edge ingestion was lossy: {:?}", stats);
    }
    Ok(report)
}

fn parse_document(payload: &[u8]) -> Result<Value, IngestError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text)?)
}

/// 扫描一个条目数组
///
/// `parse` 返回 `None` 表示条目不合格；`Some((值, 是否截断))` 表示合格。
fn scan<T, F>(entries: &[Value], capacity: usize, parse: F) -> (Vec<T>, ReplaceStats)
where
    F: Fn(&Map<String, Value>) -> Option<(T, bool)>,
    T: fmt::Debug,
{
    let mut stored = Vec::with_capacity(entries.len().min(capacity));
    let mut stats = ReplaceStats::default();

    for (index, entry) in entries.iter().enumerate() {
        if stored.len() >= capacity {
            stats.discarded = entries.len() - index;
            break;
        }

        match entry.as_object().and_then(&parse) {
            Some((value, truncated)) => {
                debug!("[{}] {:?}{}", stored.len(), value, if truncated { " (truncated)" } else { "" });
                if truncated {
                    stats.truncated += 1;
                }
                stored.push(value);
            },
            None => {
                debug!("Skipping invalid entry at index {}: {}", index, entry);
                stats.skipped += 1;
            },
        }
    }

    stats.stored = stored.len();
    (stored, stats)
}

fn parse_node(entry: &Map<String, Value>) -> Option<(Node, bool)> {
    let id = entry.get("id")?.as_str()?;
    Some(Node::truncating(id))
}

fn parse_edge(entry: &Map<String, Value>) -> Option<(Edge, bool)> {
    let from = entry.get("from")?.as_str()?;
    let to = entry.get("to")?.as_str()?;
    let distance = entry.get("distance")?.as_f64()?;
    let turn = entry.get("turn")?.as_str()?;
    Some(Edge::truncating(from, to, distance as f32, turn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ingest(store: &mut GraphStore, doc: &str) -> IngestReport {
        ingest_config(store, doc.as_bytes()).unwrap()
    }

    #[test]
    fn test_full_document() {
        let mut store = GraphStore::new();
        let report = ingest(
            &mut store,
            r#"{"nodes":[{"id":"A"},{"id":"B"}],"edges":[{"from":"A","to":"B","distance":5.0,"turn":"straight"}]}"#,
        );

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        let edge = &store.edges()[0];
        assert_eq!(edge.from, "A");
        assert_eq!(edge.to, "B");
        assert_eq!(edge.distance, 5.0);
        assert_eq!(edge.turn, "straight");
        assert_eq!(
            report.nodes,
            KindOutcome::Replaced(ReplaceStats {
                stored: 2,
                ..ReplaceStats::default()
            })
        );
    }

    #[test]
    fn test_malformed_document_changes_nothing() {
        let mut store = GraphStore::new();
        ingest(&mut store, r#"{"nodes":[{"id":"A"}],"edges":[{"from":"A","to":"B","distance":1,"turn":"l"}]}"#);
        let before = store.clone();

        let bad_payloads: [&[u8]; 5] = [b"{", b"", b"nodes: []", b"{\"nodes\": [}", &[0xff, 0xfe]];
        for bad in bad_payloads {
            assert!(ingest_config(&mut store, bad).is_err());
            assert_eq!(store, before);
        }
    }

    #[test]
    fn test_non_utf8_is_reported() {
        let mut store = GraphStore::new();
        let err = ingest_config(&mut store, &[b'{', 0xc3, b'}']).unwrap_err();
        assert!(matches!(err, IngestError::NotUtf8(_)));
    }

    #[test]
    fn test_replace_or_keep_per_kind() {
        let mut store = GraphStore::new();
        ingest(&mut store, r#"{"nodes":[{"id":"A"}],"edges":[{"from":"A","to":"B","distance":1,"turn":"l"}]}"#);

        // 有效 nodes + 类型错误的 edges：替换节点，保留边
        let report = ingest(&mut store, r#"{"nodes":[{"id":"X"},{"id":"Y"}],"edges":"oops"}"#);
        assert!(report.nodes.is_replaced());
        assert_eq!(report.edges, KindOutcome::Kept);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.nodes()[0].id, "X");
        assert_eq!(store.edge_count(), 1);

        // 缺失 nodes：保留节点
        let report = ingest(&mut store, r#"{"edges":[]}"#);
        assert_eq!(report.nodes, KindOutcome::Kept);
        assert_eq!(store.node_count(), 2);
        // 空数组也是替换
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_non_object_document_keeps_both() {
        let mut store = GraphStore::new();
        ingest(&mut store, r#"{"nodes":[{"id":"A"}]}"#);

        for doc in ["[1,2,3]", "42", "\"nodes\"", "null"] {
            let report = ingest(&mut store, doc);
            assert!(!report.changed());
            assert_eq!(store.node_count(), 1);
        }
    }

    #[test]
    fn test_invalid_edge_entries_skipped() {
        let mut store = GraphStore::new();
        let report = ingest(
            &mut store,
            r#"{"edges":[
                {"from":"A","to":"B","distance":5.0,"turn":"straight"},
                {"from":"A","distance":5.0,"turn":"left"},
                {"from":"A","to":"C","distance":"far","turn":"left"},
                {"from":"A","to":"C","turn":"left"},
                7,
                {"from":"C","to":"D","distance":2,"turn":"right"}
            ]}"#,
        );

        assert_eq!(store.edge_count(), 2);
        assert_eq!(store.edges()[1].from, "C");
        let stats = report.edges.stats().unwrap();
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.skipped, 4);
    }

    #[test]
    fn test_missing_to_scenario() {
        let mut store = GraphStore::new();
        ingest(
            &mut store,
            r#"{"edges":[{"from":"A","to":"B","distance":1,"turn":"l"},{"from":"A","distance":1,"turn":"l"}]}"#,
        );
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_invalid_node_entries_skipped() {
        let mut store = GraphStore::new();
        let report = ingest(&mut store, r#"{"nodes":[{"id":1},{"name":"A"},"B",{"id":"C"}]}"#);
        assert_eq!(store.node_count(), 1);
        assert_eq!(report.nodes.stats().unwrap().skipped, 3);
    }

    #[test]
    fn test_capacity_discards_remainder() {
        let mut store = GraphStore::new();
        let entries: Vec<String> = (0..60).map(|i| format!(r#"{{"id":"N{}"}}"#, i)).collect();
        let doc = format!(r#"{{"nodes":[{}]}}"#, entries.join(","));

        let report = ingest(&mut store, &doc);
        assert_eq!(store.node_count(), 50);
        assert_eq!(store.nodes()[49].id, "N49");
        let stats = report.nodes.stats().unwrap();
        assert_eq!(stats.stored, 50);
        assert_eq!(stats.discarded, 10);
    }

    #[test]
    fn test_truncation_reported() {
        let mut store = GraphStore::new();
        let long_id = "n".repeat(40);
        let doc = format!(
            r#"{{"nodes":[{{"id":"{}"}}],"edges":[{{"from":"A","to":"B","distance":1,"turn":"turn_left_then_right"}}]}}"#,
            long_id
        );
        let report = ingest(&mut store, &doc);

        assert_eq!(store.nodes()[0].id.as_str(), &long_id[..31]);
        assert_eq!(store.edges()[0].turn, "turn_left_then_");
        assert_eq!(report.nodes.stats().unwrap().truncated, 1);
        assert_eq!(report.edges.stats().unwrap().truncated, 1);
    }

    #[test]
    fn test_reingest_replaces_never_merges() {
        let mut store = GraphStore::new();
        ingest(&mut store, r#"{"nodes":[{"id":"A"},{"id":"B"},{"id":"C"}]}"#);
        ingest(&mut store, r#"{"nodes":[{"id":"D"}]}"#);
        assert_eq!(store.node_count(), 1);
        assert!(store.find_node("A").is_none());
    }

    #[test]
    fn test_integer_distance_accepted() {
        let mut store = GraphStore::new();
        ingest(&mut store, r#"{"edges":[{"from":"A","to":"B","distance":12,"turn":"l"}]}"#);
        assert_eq!(store.edges()[0].distance, 12.0);
    }

    proptest! {
        #[test]
        fn test_valid_nodes_always_fully_replace(count in 0usize..=50, prior in 0usize..=50) {
            let mut store = GraphStore::new();
            let make = |n: usize, prefix: &str| {
                let entries: Vec<String> =
                    (0..n).map(|i| format!(r#"{{"id":"{}{}"}}"#, prefix, i)).collect();
                format!(r#"{{"nodes":[{}]}}"#, entries.join(","))
            };
            ingest(&mut store, &make(prior, "old"));
            ingest(&mut store, &make(count, "new"));

            prop_assert_eq!(store.node_count(), count);
            prop_assert!(store.nodes().iter().all(|n| n.id.starts_with("new")));
        }
    }
}
