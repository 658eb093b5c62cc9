//! Host-facing records: the graph payload, the exported payload and the widget
//! configuration surface.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::CircuitError;

/// Model parameters keyed by name, kept verbatim from the payload.
pub type ParamMap = BTreeMap<String, Value>;

/// Node attributes as sent by the host.
///
/// `class`, `label` and `name` are structural metadata; every other key is a
/// model parameter and lands in `params`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
	/// Model class, e.g. `LeakyIAF`; drives the node type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub class: Option<String>,
	/// Discarded at build time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<Value>,
	/// Display name, becomes the node label.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<Value>,
	/// Model parameters.
	#[serde(flatten)]
	pub params: ParamMap,
}

/// `[key, attrs]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry(#[serde(deserialize_with = "node_key")] pub String, pub NodeAttrs);

/// Edge attributes as sent by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttrs {
	/// Host edge id, string or number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<Value>,
	/// Display color, defaults to grey.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Renderer hints, kept on the edge under `viz`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub viz: Option<Value>,
	/// Everything else, kept on the edge.
	#[serde(flatten)]
	pub extra: ParamMap,
}

/// `[source, target, attrs]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry(
	#[serde(deserialize_with = "node_key")] pub String,
	#[serde(deserialize_with = "node_key")] pub String,
	#[serde(default)] pub EdgeAttrs,
);

/// Serialized graph as produced by the host notebook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
	/// Draw arrowheads and keep in/out degrees apart.
	#[serde(default = "default_true")]
	pub directed: bool,
	/// `[key, attrs]` pairs; the first occurrence of a key wins.
	#[serde(default)]
	pub nodes: Vec<NodeEntry>,
	/// `[source, target, attrs]` triples.
	#[serde(default)]
	pub edges: Vec<EdgeEntry>,
}

impl Default for GraphPayload {
	fn default() -> Self {
		Self {
			directed: true,
			nodes: Vec::new(),
			edges: Vec::new(),
		}
	}
}

/// `[source, target, edge id]`; the id keeps the host's JSON type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEdge(pub String, pub String, pub Value);

/// Structural state handed back to the host on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
	/// `[key, {class, ...params}]`, without display state.
	pub nodes: Vec<NodeEntry>,
	/// `[source, target, id]`, one per edge.
	pub edges: Vec<ExportedEdge>,
	/// Always `true`.
	pub directed: bool,
}

/// Which degree drives node size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeMode {
	/// In plus out.
	#[default]
	#[serde(rename = "degree")]
	Degree,
	/// Incoming edges only; total degree on undirected graphs.
	#[serde(rename = "inDegree")]
	InDegree,
	/// Outgoing edges only; total degree on undirected graphs.
	#[serde(rename = "outDegree")]
	OutDegree,
}

/// Layout algorithm identifier as requested by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutAlgorithm {
	/// `FA`, the only one that runs.
	#[default]
	ForceAtlas2,
	/// `circular`
	Circular,
	/// `random`
	Random,
	/// Any other id.
	Unknown(String),
}

impl LayoutAlgorithm {
	/// Wire id, e.g. `FA`.
	pub fn id(&self) -> &str {
		match self {
			Self::ForceAtlas2 => "FA",
			Self::Circular => "circular",
			Self::Random => "random",
			Self::Unknown(id) => id,
		}
	}

	/// Whether the widget can run it without falling back.
	pub fn is_supported(&self) -> bool {
		matches!(self, Self::ForceAtlas2)
	}
}

impl From<String> for LayoutAlgorithm {
	fn from(id: String) -> Self {
		match id.as_str() {
			"FA" => Self::ForceAtlas2,
			"circular" => Self::Circular,
			"random" => Self::Random,
			_ => Self::Unknown(id),
		}
	}
}

impl From<LayoutAlgorithm> for String {
	fn from(alg: LayoutAlgorithm) -> Self {
		alg.id().to_owned()
	}
}

impl fmt::Display for LayoutAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id())
	}
}

/// Property panel options. Unknown keys pass through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSettings {
	/// Float the panel over the page instead of docking it to the canvas.
	#[serde(default)]
	pub auto_place: bool,
	/// Let the user drag the panel's size.
	#[serde(default = "default_true")]
	pub resizable: bool,
	/// Scroll instead of growing.
	#[serde(default)]
	pub scrollable: bool,
	/// Put the close control above the folders.
	#[serde(default = "default_true")]
	pub close_on_top: bool,
	/// Passthrough keys.
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

impl Default for PanelSettings {
	fn default() -> Self {
		Self {
			auto_place: false,
			resizable: true,
			scrollable: false,
			close_on_top: true,
			extra: BTreeMap::new(),
		}
	}
}

/// Everything the host may configure on the widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
	/// Container height in pixels.
	pub height: u32,
	/// The circuit to draw.
	pub data: GraphPayload,
	/// Degree used for node sizes.
	#[serde(rename = "nodeSize")]
	pub node_size: SizeMode,
	/// Requested layout; unsupported ones fall back to ForceAtlas2.
	#[serde(rename = "layoutAlg")]
	pub layout_alg: LayoutAlgorithm,
	/// Start the layout once the first frame is drawn.
	pub start_layout: bool,
	/// Property panel options.
	#[serde(rename = "datGUISettings")]
	pub panel: PanelSettings,
}

impl Default for WidgetConfig {
	fn default() -> Self {
		Self {
			height: 500,
			data: GraphPayload::default(),
			node_size: SizeMode::default(),
			layout_alg: LayoutAlgorithm::default(),
			start_layout: false,
			panel: PanelSettings::default(),
		}
	}
}

impl WidgetConfig {
	/// Parse the host's JSON configuration.
	pub fn from_json(json: &str) -> Result<Self, CircuitError> {
		Ok(serde_json::from_str(json)?)
	}
}

fn default_true() -> bool {
	true
}

/// Render a JSON scalar the way it would read as a key or label.
pub(crate) fn value_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

// networkx happily uses integers as node keys
fn node_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawKey {
		Text(String),
		Int(i64),
		Float(f64),
	}

	Ok(match RawKey::deserialize(deserializer)? {
		RawKey::Text(s) => s,
		RawKey::Int(i) => i.to_string(),
		RawKey::Float(f) => f.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_node_attrs_split_reserved_keys() {
		let entry: NodeEntry = serde_json::from_value(json!([
			"n1",
			{"class": "LeakyIAF", "name": "neuron", "label": "x", "V": -0.05, "tau": 3}
		]))
		.unwrap();

		assert_eq!(entry.0, "n1");
		assert_eq!(entry.1.class.as_deref(), Some("LeakyIAF"));
		assert_eq!(entry.1.name, Some(json!("neuron")));
		assert_eq!(entry.1.params.len(), 2);
		assert!(!entry.1.params.contains_key("class"));
		assert!(!entry.1.params.contains_key("name"));
	}

	#[test]
	fn test_numeric_keys_are_normalized() {
		let payload: GraphPayload = serde_json::from_value(json!({
			"nodes": [[1, {"class": "Port"}], [2, {"class": "Port"}]],
			"edges": [[1, 2, {}]]
		}))
		.unwrap();

		assert!(payload.directed);
		assert_eq!(payload.nodes[0].0, "1");
		assert_eq!(payload.edges[0].0, "1");
		assert_eq!(payload.edges[0].1, "2");
	}

	#[test]
	fn test_widget_config_defaults() {
		let config = WidgetConfig::from_json("{}").unwrap();
		assert_eq!(config.height, 500);
		assert_eq!(config.node_size, SizeMode::Degree);
		assert_eq!(config.layout_alg, LayoutAlgorithm::ForceAtlas2);
		assert!(!config.start_layout);
		assert!(config.panel.close_on_top);
		assert!(config.panel.resizable);
	}

	#[test]
	fn test_widget_config_host_keys() {
		let config = WidgetConfig::from_json(
			r#"{
				"height": 320,
				"nodeSize": "inDegree",
				"layoutAlg": "circular",
				"start_layout": true,
				"datGUISettings": {"autoPlace": true, "width": 300}
			}"#,
		)
		.unwrap();

		assert_eq!(config.height, 320);
		assert_eq!(config.node_size, SizeMode::InDegree);
		assert_eq!(config.layout_alg, LayoutAlgorithm::Circular);
		assert!(config.start_layout);
		assert!(config.panel.auto_place);
		assert_eq!(config.panel.extra.get("width"), Some(&json!(300)));
	}

	#[test]
	fn test_unknown_layout_id_is_kept() {
		let alg = LayoutAlgorithm::from("spiral".to_string());
		assert_eq!(alg, LayoutAlgorithm::Unknown("spiral".into()));
		assert!(!alg.is_supported());
		assert_eq!(alg.to_string(), "spiral");
	}

	#[test]
	fn test_bad_json_is_a_config_error() {
		let err = WidgetConfig::from_json("{\"height\": \"tall\"}").unwrap_err();
		assert!(matches!(err, CircuitError::Config(_)));
	}
}
