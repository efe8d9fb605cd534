// Context stack — the scope chain dotted names resolve against.
//
// Only a path's first segment bubbles up through parent scopes; the rest is
// strict child access. This is Mustache's rule, and it is what keeps
// `{{a.b}}` from accidentally matching an unrelated `b` in an outer scope.

use crate::data::{DataSource, Lambda};
use crate::template::Path;

/// Outcome of resolving a path against the stack.
pub(crate) enum Resolution<'d> {
    Field(&'d dyn DataSource),
    Lambda(&'d Lambda),
    /// The first segment bound, but a later segment hit a dead end.
    ChainBroken,
    /// No scope binds the first segment.
    NotFound,
}

pub(crate) struct ContextStack<'d> {
    frames: Vec<&'d dyn DataSource>,
}

impl<'d> ContextStack<'d> {
    pub fn new(root: &'d dyn DataSource) -> Self {
        ContextStack {
            frames: vec![root],
        }
    }

    /// Enter a section iteration scope.
    pub fn push(&mut self, frame: &'d dyn DataSource) {
        self.frames.push(frame);
    }

    /// Leave it again. Pushes and pops pair up deterministically at section
    /// boundaries; the root frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    fn top(&self) -> &'d dyn DataSource {
        // Invariant: `frames` always holds at least the root.
        self.frames[self.frames.len() - 1]
    }

    /// Resolve `path` (spans into `source`). The implicit iterator yields
    /// the innermost scope directly.
    pub fn resolve(&self, source: &str, path: &Path) -> Resolution<'d> {
        if path.is_implicit() {
            return finish(self.top());
        }

        let first = &source[path.segments[0].clone()];
        let found = self
            .frames
            .iter()
            .rev()
            .copied()
            .find_map(|frame| frame.get(first));
        let Some(mut value) = found else {
            return Resolution::NotFound;
        };

        for segment in &path.segments[1..] {
            match value.get(&source[segment.clone()]) {
                Some(child) => value = child,
                None => return Resolution::ChainBroken,
            }
        }
        finish(value)
    }
}

fn finish<'d>(value: &'d dyn DataSource) -> Resolution<'d> {
    match value.as_lambda() {
        Some(lambda) => Resolution::Lambda(lambda),
        None => Resolution::Field(value),
    }
}
