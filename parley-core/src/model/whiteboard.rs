use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One drawing operation. Replaying the same sequence of operations on an
/// empty canvas always yields the same picture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum WhiteboardOp {
    Stroke {
        stroke_id: String,
        points: Vec<Point>,
        color: String,
        width: f32,
    },
    Erase {
        stroke_id: String,
    },
    Clear,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WhiteboardMessage {
    Op { op: WhiteboardOp },
    /// Late joiner asks for the full state.
    SnapshotRequest,
    Snapshot { ops: Vec<WhiteboardOp> },
}
