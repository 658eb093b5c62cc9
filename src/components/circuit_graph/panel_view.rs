use leptos::prelude::*;
use log::warn;

use super::panel::NodeAttributes;
use super::state::InteractionEvent;
use super::types::PanelSettings;

/// Layout controls plus the selected node's attributes.
#[component]
pub fn PropertyPanel(
	#[prop(into)] settings: Signal<PanelSettings>,
	#[prop(into)] attributes: Signal<Option<NodeAttributes>>,
	#[prop(into)] running: Signal<bool>,
	events: WriteSignal<Option<InteractionEvent>>,
) -> impl IntoView {
	let (open, set_open) = signal(true);
	let style = move || settings.with(panel_style);

	view! {
		<div class="circuit-panel" style=style>
			<Show when=move || open.get()>
				<fieldset class="circuit-panel-folder">
					<legend>"Layout"</legend>
					<button on:click=move |_| events.set(Some(InteractionEvent::ToggleLayout))>
						{move || if running.get() { "Stop Layout" } else { "Start Layout" }}
					</button>
					<button on:click=move |_| events.set(Some(InteractionEvent::ResetView))>
						"Reset View"
					</button>
				</fieldset>
				<fieldset class="circuit-panel-folder">
					<legend>"Node Attributes"</legend>
					{move || attributes.get().map(|attrs| node_rows(attrs, events))}
				</fieldset>
			</Show>
			<button class="circuit-panel-close" on:click=move |_| set_open.update(|o| *o = !*o)>
				{move || if open.get() { "Close Controls" } else { "Open Controls" }}
			</button>
		</div>
	}
}

/// Inline style for the panel container.
fn panel_style(settings: &PanelSettings) -> String {
	format!(
		"position: {}; top: 0; right: 0; z-index: 100; display: flex; flex-direction: {}; \
		 max-height: 100%; overflow-y: {}; resize: {};",
		if settings.auto_place { "fixed" } else { "absolute" },
		if settings.close_on_top { "column-reverse" } else { "column" },
		if settings.scrollable { "auto" } else { "hidden" },
		if settings.resizable { "horizontal" } else { "none" },
	)
}

fn node_rows(
	attrs: NodeAttributes,
	events: WriteSignal<Option<InteractionEvent>>,
) -> impl IntoView {
	let key = attrs.key;
	let params = attrs
		.params
		.into_iter()
		.map(|param| {
			let (node, name) = (key.clone(), param.name.clone());
			let on_change = move |ev: leptos::ev::Event| match event_target_value(&ev).parse::<f64>() {
				Ok(value) => events.set(Some(InteractionEvent::ParamEdited {
					node: node.clone(),
					param: name.clone(),
					value,
				})),
				Err(err) => warn!("ignoring edit of `{name}`: {err}"),
			};
			view! {
				<label class="circuit-panel-row">
					<span>{param.name}</span>
					<input type="number" step="any" prop:value=param.value.to_string() on:change=on_change />
				</label>
			}
		})
		.collect_view();

	view! {
		<div class="circuit-panel-row readonly">
			<span>"Type"</span>
			<span>{attrs.node_type.to_string()}</span>
		</div>
		<div class="circuit-panel-row readonly">
			<span>"Model"</span>
			<span>{attrs.model.unwrap_or_default()}</span>
		</div>
		{params}
	}
}
