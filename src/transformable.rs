//! Formulas that behaviors can be layered onto.

use crate::error::CalcResult;
use crate::event::ChangeEvent;
use crate::node_value::NodeValue;
use crate::value::{Value, ValueCalculationContext};
use std::cell::RefCell;
use std::rc::Rc;

/// Turns a formula into a new formula, usually one wrapping the old.
pub trait ValueTransformation {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value>;
}

impl<F> ValueTransformation for F
where
    F: Fn(Rc<dyn Value>) -> Rc<dyn Value>,
{
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        self(value)
    }
}

fn same_transformation(a: &Rc<dyn ValueTransformation>, b: &Rc<dyn ValueTransformation>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// A formula with a chain of transformations applied in registration
/// order, each wrapping the result of the previous one.
///
/// # Examples
///
/// ```rust
/// use statgraph::transformable::{TransformableValue, ValueTransformation};
/// use statgraph::value::{ConstantValue, Value};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let value = TransformableValue::new(Rc::new(ConstantValue::from(10.0)));
/// let changes = Rc::new(Cell::new(0));
/// let counter = changes.clone();
/// let _subscription = value.value_changed().subscribe(move |_| counter.set(counter.get() + 1));
///
/// let replaced: Rc<dyn ValueTransformation> = Rc::new(|_inner: Rc<dyn Value>| -> Rc<dyn Value> {
///     Rc::new(ConstantValue::from(20.0))
/// });
/// value.add(replaced.clone());
/// assert_eq!(value.transformation_count(), 1);
///
/// value.remove(&replaced);
/// assert_eq!(value.transformation_count(), 0);
/// assert_eq!(changes.get(), 2);
/// ```
pub struct TransformableValue {
    initial: Rc<dyn Value>,
    transformations: RefCell<Vec<Rc<dyn ValueTransformation>>>,
    current: RefCell<Rc<dyn Value>>,
    value_changed: Rc<ChangeEvent>,
}

impl TransformableValue {
    pub fn new(initial: Rc<dyn Value>) -> Self {
        Self {
            current: RefCell::new(initial.clone()),
            initial,
            transformations: RefCell::new(Vec::new()),
            value_changed: Rc::new(ChangeEvent::new()),
        }
    }

    /// Raised when a transformation is added or removed.
    pub fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }

    pub fn add(&self, transformation: Rc<dyn ValueTransformation>) {
        self.transformations.borrow_mut().push(transformation);
        self.rebuild();
    }

    pub fn remove(&self, transformation: &Rc<dyn ValueTransformation>) {
        let removed = {
            let mut transformations = self.transformations.borrow_mut();
            match transformations
                .iter()
                .position(|t| same_transformation(t, transformation))
            {
                Some(index) => {
                    transformations.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.rebuild();
        }
    }

    /// Drop every transformation.
    pub fn remove_all(&self) {
        let had_any = !std::mem::take(&mut *self.transformations.borrow_mut()).is_empty();
        if had_any {
            self.rebuild();
        }
    }

    pub fn transformation_count(&self) -> usize {
        self.transformations.borrow().len()
    }

    fn rebuild(&self) {
        let transformations = self.transformations.borrow().clone();
        let value = transformations
            .iter()
            .fold(self.initial.clone(), |value, t| t.transform(value));
        *self.current.borrow_mut() = value;
        self.value_changed.notify();
    }
}

impl Value for TransformableValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let current = self.current.borrow().clone();
        current.calculate(context)
    }
}
