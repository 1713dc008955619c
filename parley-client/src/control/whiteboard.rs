use parley_core::WhiteboardOp;

/// Replayable board: the strokes that survive all ops seen so far.
#[derive(Debug, Clone, Default)]
pub struct WhiteboardModel {
    strokes: Vec<WhiteboardOp>,
}

impl WhiteboardModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: &WhiteboardOp) {
        match op {
            WhiteboardOp::Stroke { stroke_id, .. } => {
                match self.strokes.iter_mut().find(|s| stroke_id_of(s) == Some(stroke_id)) {
                    Some(existing) => *existing = op.clone(),
                    None => self.strokes.push(op.clone()),
                }
            }
            WhiteboardOp::Erase { stroke_id } => {
                self.strokes.retain(|s| stroke_id_of(s) != Some(stroke_id));
            }
            WhiteboardOp::Clear => self.strokes.clear(),
        }
    }

    /// Ops that rebuild the current board from empty.
    pub fn snapshot(&self) -> Vec<WhiteboardOp> {
        self.strokes.clone()
    }

    pub fn load(&mut self, ops: &[WhiteboardOp]) {
        self.strokes.clear();
        for op in ops {
            self.apply(op);
        }
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

fn stroke_id_of(op: &WhiteboardOp) -> Option<&String> {
    match op {
        WhiteboardOp::Stroke { stroke_id, .. } => Some(stroke_id),
        _ => None,
    }
}
