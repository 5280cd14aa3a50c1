//! 导航图实体
//!
//! 节点和边只是被存储的数据：本层不做唯一性检查，也不检查边的端点是否是已知节点。

use crate::bounded::BoundedStr;

/// 节点 ID 最大字节数
pub const NODE_ID_MAX_LEN: usize = 31;

/// 边字符串字段（from / to / turn）最大字节数
pub const EDGE_FIELD_MAX_LEN: usize = 15;

/// 图存储最多保存的节点数
pub const MAX_NODES: usize = 50;

/// 图存储最多保存的边数
pub const MAX_EDGES: usize = 100;

/// 节点 ID（≤31 字节）
pub type NodeId = BoundedStr<NODE_ID_MAX_LEN>;

/// 边字符串字段（≤15 字节）
pub type EdgeLabel = BoundedStr<EDGE_FIELD_MAX_LEN>;

/// 导航图节点
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
}

impl Node {
    /// 截断构造，返回 `(节点, 是否截断)`
    pub fn truncating(id: &str) -> (Self, bool) {
        let (id, truncated) = NodeId::truncating(id);
        (Self { id }, truncated)
    }
}

/// 导航图边
///
/// `turn` 是自由文本的转向标注（如 "left" / "straight"），不做枚举校验。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from: EdgeLabel,
    pub to: EdgeLabel,
    pub distance: f32,
    pub turn: EdgeLabel,
}

impl Edge {
    /// 截断构造，返回 `(边, 是否有任一字段被截断)`
    pub fn truncating(from: &str, to: &str, distance: f32, turn: &str) -> (Self, bool) {
        let (from, from_cut) = EdgeLabel::truncating(from);
        let (to, to_cut) = EdgeLabel::truncating(to);
        let (turn, turn_cut) = EdgeLabel::truncating(turn);
        (
            Self {
                from,
                to,
                distance,
                turn,
            },
            from_cut || to_cut || turn_cut,
        )
    }
}
