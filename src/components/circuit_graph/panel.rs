//! What the property panel shows for the selected node, and how an edit is
//! written back into the node's model parameters.

use serde_json::{Number, Value};

use super::error::CircuitError;
use super::graph::{Node, NodeType};

#[derive(Clone, Debug, PartialEq)]
pub struct EditableParam {
	pub name: String,
	pub value: f64,
}

/// "Node Attributes" section: Type and Model are read-only, numeric model
/// parameters are editable.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAttributes {
	pub key: String,
	pub label: String,
	pub node_type: NodeType,
	pub model: Option<String>,
	pub params: Vec<EditableParam>,
}

impl NodeAttributes {
	pub fn from_node(node: &Node) -> Self {
		Self {
			key: node.key().to_owned(),
			label: node.label().to_owned(),
			node_type: node.node_type(),
			model: node.model().map(str::to_owned),
			params: node
				.params()
				.iter()
				.filter_map(|(name, value)| {
					numeric(value).map(|value| EditableParam {
						name: name.clone(),
						value,
					})
				})
				.collect(),
		}
	}
}

/// Numbers, and strings that parse as numbers, are editable.
pub fn numeric(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
		_ => None,
	}
}

/// Write a panel edit into the node. Integers stay integers when the new value
/// is integral.
pub fn apply_edit(node: &mut Node, param: &str, value: f64) -> Result<(), CircuitError> {
	let Some(current) = node.params().get(param).filter(|v| numeric(v).is_some()) else {
		return Err(CircuitError::UnknownParam {
			node: node.key().to_owned(),
			param: param.to_owned(),
		});
	};

	let was_integer = current.as_i64().is_some() || current.as_u64().is_some();
	let new_value = if was_integer && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
		Value::from(value as i64)
	} else {
		Number::from_f64(value)
			.map(Value::Number)
			.ok_or_else(|| CircuitError::NonFiniteParam {
				param: param.to_owned(),
				value,
			})?
	};
	node.set_param(param, new_value);
	Ok(())
}
