//! # statgraph - Reactive Stat Calculation Graph
//!
//! A calculation engine for modifier-based character stats that provides:
//! - **Incremental** recomputation (only what a change invalidates is recomputed)
//! - **Demand-driven** evaluation (nothing is computed before it is read)
//! - **Dynamic dependencies** (formulas declare nothing, reads are recorded)
//! - **Behaviors** that rewrite how specific nodes evaluate, without
//!   changing the graph
//!
//! ## Core Concepts
//!
//! ### Stat Subgraph
//!
//! Every stat owns a fixed-shape subgraph of nodes:
//!
//! ```text
//! Total            = TotalOverride ?? Subtotal
//! Subtotal         = UncappedSubtotal clipped to [Minimum, Maximum]
//! UncappedSubtotal = Σ PathTotal over the stat's paths
//! PathTotal        = Base * (1 + Increase) * More
//! Base             = BaseOverride ?? (BaseSet + BaseAdd) ?? BaseAdd
//! ```
//!
//! 1. **Modifiers** are registered into the collection of their form
//! 2. **Form nodes** aggregate the modifiers of one form on one path
//! 3. **Paths** separate values by source and by the stats they were
//!    converted from
//!
//! ### Key Features
//!
//! - **Caching**: node values are cached until something they read changes
//! - **Cycle Detection**: a node reading itself fails with
//!   [`CalculationError::Cycle`] instead of recursing
//! - **Batching**: a [`CalculatorUpdate`] notifies hosts once per changed node
//! - **Pruning**: nodes nothing listens to can be released
//! - **Debug-Friendly**: [`StatSnapshot`] breaks a stat down by path, and
//!   [`graph::DependencyGraph`] shows what reads what
//!
//! ## Example
//!
//! ```rust
//! use statgraph::*;
//!
//! let calculator = Calculator::new();
//! let life = Stat::new("Life");
//!
//! calculator.update(
//!     CalculatorUpdate::new()
//!         .add(Modifier::constant(vec![life.clone()], Form::BaseAdd, 100.0, ModifierSource::Global))
//!         .add(Modifier::constant(vec![life.clone()], Form::Increase, 50.0, ModifierSource::Global)),
//! );
//!
//! assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(150.0))); // 100 * 1.5
//! ```
//!
//! ## Modules
//!
//! - [`stat`] - Stats, their keys and metadata
//! - [`modifier`] - Modifiers, the inputs of the graph
//! - [`value`] - Formulas and the context they read from
//! - [`nodes`] - The reactive node layer
//! - [`calculator`] - The main entry point
//! - [`behavior`] - Cross-cutting rewrites of node formulas
//! - [`stat_factory`] - Meta stats for conversion, regeneration, ailments, ...
//! - [`graph`] - Dependency graph inspection
//! - [`error`] - Error types

pub mod aggregation;
pub mod behavior;
pub mod calculator;
pub mod collection;
pub mod config;
pub mod core_values;
pub mod error;
pub mod event;
pub mod graph;
pub mod modifier;
pub mod node_type;
pub mod node_value;
pub mod nodes;
pub mod path;
pub mod registry;
pub mod repository;
pub mod snapshot;
pub mod source;
pub mod stat;
pub mod stat_factory;
pub mod stat_id;
#[cfg(test)]
mod testing;
pub mod transformable;
pub mod value;

// Re-export main types for convenience
pub use calculator::{Calculator, CalculatorUpdate};
pub use config::CalculatorConfig;
pub use error::{CalcResult, CalculationError};
pub use modifier::Modifier;
pub use node_type::{Form, NodeType};
pub use node_value::NodeValue;
pub use path::PathDefinition;
pub use registry::RegistryChange;
pub use snapshot::{PathSnapshot, StatSnapshot};
pub use source::{DetailedSource, ItemSlot, LocalSource, ModifierSource};
pub use stat::{Entity, Stat, StatKey, StatValueType};
pub use stat_factory::{Ailment, DamageType, Pool, StatFactory};
pub use stat_id::StatId;
pub use value::{Value, ValueCalculationContext};
