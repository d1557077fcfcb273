use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-shield-halved"></i> {" Brand Safety Analysis"}</h1>
            <p class="subtitle">{"Check images against eight brand-safety categories"}</p>
        </header>
    }
}
