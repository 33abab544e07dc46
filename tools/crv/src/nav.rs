/// Drill-down level of a navigation frame. Methods are rows of a `Class`
/// frame and never get a frame of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLevel {
    Report,
    Package,
    Class,
}

impl NodeLevel {
    pub fn child(self) -> Option<Self> {
        match self {
            Self::Report => Some(Self::Package),
            Self::Package => Some(Self::Class),
            Self::Class => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavFrame {
    pub level: NodeLevel,
    pub package_ix: usize,
    pub class_ix: usize,
    pub cursor: usize,
    pub offset: usize,
}

impl NavFrame {
    pub fn root() -> Self {
        Self {
            level: NodeLevel::Report,
            package_ix: 0,
            class_ix: 0,
            cursor: 0,
            offset: 0,
        }
    }

    /// Frame for the child at `original_index`, or `None` at the leaf level.
    pub fn child_at(&self, original_index: usize) -> Option<Self> {
        let level = self.level.child()?;
        let (package_ix, class_ix) = match level {
            NodeLevel::Report => return None,
            NodeLevel::Package => (original_index, 0),
            NodeLevel::Class => (self.package_ix, original_index),
        };
        Some(Self {
            level,
            package_ix,
            class_ix,
            cursor: 0,
            offset: 0,
        })
    }

    pub fn reset_position(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }
}

pub const MAX_DEPTH: usize = 3;

/// Non-empty by construction: the root frame is stored apart from the
/// pushed frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStack {
    root: NavFrame,
    pushed: Vec<NavFrame>,
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStack {
    pub fn new() -> Self {
        Self {
            root: NavFrame::root(),
            pushed: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.pushed.len()
    }

    pub fn current(&self) -> &NavFrame {
        self.pushed.last().unwrap_or(&self.root)
    }

    pub fn current_mut(&mut self) -> &mut NavFrame {
        match self.pushed.last_mut() {
            Some(frame) => frame,
            None => &mut self.root,
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = &NavFrame> {
        std::iter::once(&self.root).chain(self.pushed.iter())
    }

    /// Pushes `frame` unless the stack is already at `MAX_DEPTH`.
    pub fn push(&mut self, frame: NavFrame) -> bool {
        if self.depth() >= MAX_DEPTH {
            return false;
        }
        self.pushed.push(frame);
        true
    }

    /// Pops one frame; a no-op at the root.
    pub fn pop(&mut self) -> bool {
        self.pushed.pop().is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
