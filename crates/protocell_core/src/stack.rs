use protocell_data::StackState;

/// Fixed-depth circular stack. Pushing onto a full stack overwrites the
/// oldest value; popping an empty one yields 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuStack {
    values: Vec<i32>,
    top: usize,
}

impl CpuStack {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            values: vec![0; depth.max(1)],
            top: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        let depth = self.values.len();
        self.top = (self.top + depth - 1) % depth;
        self.values[self.top] = value;
    }

    pub fn pop(&mut self) -> i32 {
        let value = std::mem::take(&mut self.values[self.top]);
        self.top = (self.top + 1) % self.values.len();
        value
    }

    #[must_use]
    pub fn top(&self) -> i32 {
        self.values[self.top]
    }

    /// Value `depth` entries below the top.
    #[must_use]
    pub fn peek(&self, depth: usize) -> i32 {
        self.values[(self.top + depth) % self.values.len()]
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.top = 0;
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn to_state(&self) -> StackState {
        StackState {
            values: self.values.clone(),
            top: self.top as u32,
        }
    }

    /// Rebuilds a stack from a snapshot; `None` if it does not have `depth` slots.
    #[must_use]
    pub fn from_state(state: &StackState, depth: usize) -> Option<Self> {
        let top = state.top as usize;
        (state.values.len() == depth && top < depth).then(|| Self {
            values: state.values.clone(),
            top,
        })
    }
}
