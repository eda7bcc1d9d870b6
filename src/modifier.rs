//! Modifiers: the atomic inputs of the calculation graph.

use crate::node_type::Form;
use crate::source::DetailedSource;
use crate::stat::Stat;
use crate::value::{ConstantValue, Value};
use std::fmt;
use std::rc::Rc;

/// One effect: target stats, a form, a value formula and a source.
///
/// Modifiers are compared by their stats, form, source and the identity
/// of their formula, so removing a modifier requires the instance (or a
/// clone of it) that was added.
///
/// # Examples
///
/// ```rust
/// use statgraph::{Form, Modifier, ModifierSource, Stat};
///
/// let life = Stat::new("Life");
/// let added = Modifier::constant(vec![life.clone()], Form::BaseAdd, 100.0, ModifierSource::Global);
/// assert_eq!(added.clone(), added);
/// assert_ne!(
///     added,
///     Modifier::constant(vec![life], Form::BaseAdd, 100.0, ModifierSource::Global)
/// );
/// ```
#[derive(Clone)]
pub struct Modifier {
    stats: Vec<Stat>,
    form: Form,
    value: Rc<dyn Value>,
    source: DetailedSource,
}

impl Modifier {
    pub fn new(
        stats: Vec<Stat>,
        form: Form,
        value: Rc<dyn Value>,
        source: impl Into<DetailedSource>,
    ) -> Self {
        Self {
            stats,
            form,
            value,
            source: source.into(),
        }
    }

    /// A modifier with a fixed value.
    pub fn constant(
        stats: Vec<Stat>,
        form: Form,
        value: f64,
        source: impl Into<DetailedSource>,
    ) -> Self {
        Self::new(stats, form, Rc::new(ConstantValue::from(value)), source)
    }

    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn value(&self) -> &Rc<dyn Value> {
        &self.value
    }

    pub fn source(&self) -> &DetailedSource {
        &self.source
    }
}

impl PartialEq for Modifier {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats
            && self.form == other.form
            && Rc::as_ptr(&self.value) as *const () == Rc::as_ptr(&other.value) as *const ()
            && self.source == other.source
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modifier")
            .field("stats", &self.stats)
            .field("form", &self.form)
            .field("source", &self.source)
            .finish()
    }
}
