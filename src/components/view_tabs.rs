//! Tab strip for switching graph views.

use std::rc::Rc;

use leptos::prelude::*;

use crate::sync::View;

/// One button per selectable view; the active one is marked with `active`.
#[component]
pub fn ViewTabs(
	#[prop(into)] active: Signal<View>,
	on_select: Rc<dyn Fn(View)>,
) -> impl IntoView {
	let tabs = View::TABS
		.into_iter()
		.map(|tab| {
			let on_select = on_select.clone();
			view! {
				<button
					class="view-tab"
					class:active=move || active.get() == tab
					on:click=move |_| on_select(tab)
				>
					{tab.title()}
				</button>
			}
		})
		.collect_view();

	view! { <nav class="view-tabs">{tabs}</nav> }
}
