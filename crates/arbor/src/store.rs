use arbor_core::Tree;
use std::cell::{Cell, RefCell};

/// The single "current tree" slot of a session.
///
/// Writers hand in a reducer that receives the latest committed tree and returns the next one;
/// readers get cheap snapshot handles. No caller ever holds a borrow of the slot while its
/// reducer runs, so reducers may freely read the store.
#[derive(Debug, Default)]
pub struct TreeStore {
    current: RefCell<Tree>,
    revision: Cell<u64>,
}

impl TreeStore {
    pub fn new(tree: Tree) -> Self {
        Self {
            current: RefCell::new(tree),
            revision: Cell::new(0),
        }
    }

    pub fn snapshot(&self) -> Tree {
        self.current.borrow().clone()
    }

    /// Bumped on every commit that produced a different snapshot.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    /// Commits `reducer(latest)`. Returns `false` when the reducer handed back the very same
    /// snapshot (nothing to commit).
    pub fn update(&self, reducer: impl FnOnce(&Tree) -> Tree) -> bool {
        self.update_with(|prev| (reducer(prev), ())).0
    }

    /// Like [`TreeStore::update`], additionally passing a value computed by the reducer back to
    /// the caller.
    pub fn update_with<R>(&self, reducer: impl FnOnce(&Tree) -> (Tree, R)) -> (bool, R) {
        let prev = self.snapshot();
        let (next, out) = reducer(&prev);
        if next.same_snapshot(&prev) {
            return (false, out);
        }
        *self.current.borrow_mut() = next;
        self.revision.set(self.revision.get() + 1);
        (true, out)
    }

    pub fn replace(&self, tree: Tree) {
        *self.current.borrow_mut() = tree;
        self.revision.set(self.revision.get() + 1);
    }
}
