//! Node types and modifier forms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One computation stage within a stat's subgraph.
///
/// Variants are declared parents first: a node may only read node types
/// listed after its own (cross-stat behaviors aside). Iterating
/// [`NodeType::ALL`] therefore visits dependents before dependencies.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Total,
    Subtotal,
    UncappedSubtotal,
    PathTotal,
    Base,
    BaseOverride,
    BaseSet,
    BaseAdd,
    Increase,
    More,
    TotalOverride,
}

impl NodeType {
    /// Every node type in dependency order.
    pub const ALL: [NodeType; 11] = [
        NodeType::Total,
        NodeType::Subtotal,
        NodeType::UncappedSubtotal,
        NodeType::PathTotal,
        NodeType::Base,
        NodeType::BaseOverride,
        NodeType::BaseSet,
        NodeType::BaseAdd,
        NodeType::Increase,
        NodeType::More,
        NodeType::TotalOverride,
    ];

    /// Whether nodes of this type exist once per path. The others only
    /// exist on the main path.
    pub fn is_path_dependent(self) -> bool {
        !matches!(
            self,
            NodeType::Total | NodeType::Subtotal | NodeType::UncappedSubtotal | NodeType::TotalOverride
        )
    }

    /// The form whose modifiers this node type aggregates, if any.
    pub fn form(self) -> Option<Form> {
        match self {
            NodeType::BaseOverride => Some(Form::BaseOverride),
            NodeType::BaseSet => Some(Form::BaseSet),
            NodeType::BaseAdd => Some(Form::BaseAdd),
            NodeType::Increase => Some(Form::Increase),
            NodeType::More => Some(Form::More),
            NodeType::TotalOverride => Some(Form::TotalOverride),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a modifier's value combines with others of the same stat.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Form {
    BaseOverride,
    BaseSet,
    BaseAdd,
    Increase,
    More,
    TotalOverride,
}

impl Form {
    /// Every form.
    pub const ALL: [Form; 6] = [
        Form::BaseOverride,
        Form::BaseSet,
        Form::BaseAdd,
        Form::Increase,
        Form::More,
        Form::TotalOverride,
    ];

    /// The node type aggregating modifiers of this form.
    pub fn node_type(self) -> NodeType {
        match self {
            Form::BaseOverride => NodeType::BaseOverride,
            Form::BaseSet => NodeType::BaseSet,
            Form::BaseAdd => NodeType::BaseAdd,
            Form::Increase => NodeType::Increase,
            Form::More => NodeType::More,
            Form::TotalOverride => NodeType::TotalOverride,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
