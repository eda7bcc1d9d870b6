//! The explicitly registered stats hosts display.

use crate::event::Event;
use crate::nodes::{CachingNode, CalculationNode, WrappingNode};
use crate::stat::Stat;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A stat entering or leaving the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    Added(Stat),
    Removed(Stat),
}

/// The stats hosts display, in registration order.
///
/// Each entry owns a [`WrappingNode`] over the stat's Total. `changed` is
/// raised after every registration and removal.
#[derive(Default)]
pub struct ExplicitRegistry {
    entries: RefCell<IndexMap<Stat, Rc<WrappingNode>>>,
    changed: Rc<Event<RegistryChange>>,
}

impl ExplicitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `stat` with its Total node. Registering twice keeps the
    /// first entry.
    pub fn add(&self, stat: &Stat, total: Rc<CachingNode>) {
        {
            let mut entries = self.entries.borrow_mut();
            if entries.contains_key(stat) {
                return;
            }
            entries.insert(stat.clone(), Rc::new(WrappingNode::new(total)));
        }
        self.changed.raise(&RegistryChange::Added(stat.clone()));
    }

    /// Unregister `stat`, detaching its wrapping node.
    pub fn remove(&self, stat: &Stat) -> bool {
        let removed = self.entries.borrow_mut().shift_remove(stat);
        match removed {
            Some(node) => {
                node.dispose();
                self.changed.raise(&RegistryChange::Removed(stat.clone()));
                true
            }
            None => false,
        }
    }

    pub fn changed(&self) -> &Rc<Event<RegistryChange>> {
        &self.changed
    }

    pub fn contains(&self, stat: &Stat) -> bool {
        self.entries.borrow().contains_key(stat)
    }

    pub fn node(&self, stat: &Stat) -> Option<Rc<WrappingNode>> {
        self.entries.borrow().get(stat).cloned()
    }

    /// Every registered stat with its node.
    pub fn entries(&self) -> Vec<(Stat, Rc<WrappingNode>)> {
        self.entries
            .borrow()
            .iter()
            .map(|(stat, node)| (stat.clone(), node.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
