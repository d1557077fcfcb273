use super::super::Model;
use super::super::Msg;
use gloo_storage::{LocalStorage, Storage};
use yew::html::Scope;
use yew::prelude::*;

const THEME_KEY: &str = "theme";

/// Theme saved by a previous visit, or `light`.
pub fn load_theme() -> String {
    match LocalStorage::get::<String>(THEME_KEY) {
        Ok(theme) if theme == "dark" => theme,
        _ => "light".to_string(),
    }
}

pub fn save_theme(theme: &str) {
    if let Err(e) = LocalStorage::set(THEME_KEY, theme) {
        log::warn!("Failed to persist theme: {}", e);
    }
}

pub fn apply_theme(theme: &str) {
    let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    else {
        return;
    };
    let result = if theme == "dark" {
        body.class_list().add_1("dark-mode")
    } else {
        body.class_list().remove_1("dark-mode")
    };
    if result.is_err() {
        log::warn!("Failed to apply {} theme", theme);
    }
}

pub fn render_theme_toggle(theme: &str, link: &Scope<Model>) -> Html {
    html! {
        <button
            id="theme-toggle"
            class="theme-toggle"
            onclick={link.callback(|_| Msg::ToggleTheme)}
            title={ if theme == "light" { "Switch to Dark Mode" } else { "Switch to Light Mode" } }
        >
            { if theme == "light" {
                html! { <img src="https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/svg/2600.svg" alt="Sun Icon" class="toggle-icon" /> }
            } else {
                html! { <img src="https://cdnjs.cloudflare.com/ajax/libs/twemoji/14.0.2/svg/1f319.svg" alt="Moon Icon" class="toggle-icon" /> }
            }}
        </button>
    }
}
