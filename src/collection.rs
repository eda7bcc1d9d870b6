//! Observable collections backing the graph: the modifier nodes of one
//! `(stat, form, path)` and the path set of one stat.

use crate::event::{ChangeEvent, Event};
use crate::modifier::Modifier;
use crate::nodes::CalculationNode;
use crate::path::PathDefinition;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A structural change of a [`ModifierNodeCollection`].
pub enum CollectionChange {
    Added(Rc<dyn CalculationNode>),
    Removed(Rc<dyn CalculationNode>),
    /// The collection was replaced wholesale.
    Reset,
}

/// The value nodes of every modifier of one form on one path of a stat.
#[derive(Default)]
pub struct ModifierNodeCollection {
    items: RefCell<Vec<(Rc<dyn CalculationNode>, Modifier)>>,
    changed: Rc<Event<CollectionChange>>,
}

impl ModifierNodeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raised after every structural change.
    pub fn changed(&self) -> &Rc<Event<CollectionChange>> {
        &self.changed
    }

    pub fn add(&self, node: Rc<dyn CalculationNode>, modifier: Modifier) {
        self.items.borrow_mut().push((node.clone(), modifier));
        self.changed.raise(&CollectionChange::Added(node));
    }

    /// Remove the node added for `modifier`. Returns it so the caller can
    /// dispose it.
    pub fn remove(&self, modifier: &Modifier) -> Option<Rc<dyn CalculationNode>> {
        let node = {
            let mut items = self.items.borrow_mut();
            let index = items.iter().position(|(_, m)| m == modifier)?;
            items.remove(index).0
        };
        self.changed.raise(&CollectionChange::Removed(node.clone()));
        Some(node)
    }

    /// Remove every node and raise [`CollectionChange::Reset`]. Returns the
    /// nodes so the caller can dispose them.
    pub fn clear(&self) -> Vec<Rc<dyn CalculationNode>> {
        let items = std::mem::take(&mut *self.items.borrow_mut());
        self.changed.raise(&CollectionChange::Reset);
        items.into_iter().map(|(node, _)| node).collect()
    }

    pub fn nodes(&self) -> Vec<Rc<dyn CalculationNode>> {
        self.items
            .borrow()
            .iter()
            .map(|(node, _)| node.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

/// The paths of one stat, reference counted by the nodes and modifier
/// collections living on them.
///
/// Paths are kept in insertion order. Adding a path's first reference or
/// removing its last raises [`PathSet::changed`].
#[derive(Default)]
pub struct PathSet {
    paths: RefCell<IndexMap<PathDefinition, usize>>,
    changed: Rc<ChangeEvent>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(&self) -> &Rc<ChangeEvent> {
        &self.changed
    }

    pub fn paths(&self) -> Vec<PathDefinition> {
        self.paths.borrow().keys().cloned().collect()
    }

    pub fn contains(&self, path: &PathDefinition) -> bool {
        self.paths.borrow().contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.borrow().is_empty()
    }

    pub(crate) fn add(&self, path: &PathDefinition) {
        let added = {
            let mut paths = self.paths.borrow_mut();
            let count = paths.entry(path.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };
        if added {
            self.changed.notify();
        }
    }

    pub(crate) fn remove(&self, path: &PathDefinition) {
        let removed = {
            let mut paths = self.paths.borrow_mut();
            match paths.get_mut(path) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    paths.shift_remove(path);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.changed.notify();
        }
    }
}
