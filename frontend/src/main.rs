mod api;
mod components;

use components::handlers;
use components::header::render_header;
use components::preview_area::render_preview_area;
use components::results::render_results;
use components::theme_toggle::{load_theme, render_theme_toggle};
use components::upload_section::render_upload_section;
use components::url_section::render_url_section;
use components::utils::render_error_message;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_timers::callback::Timeout;
use shared::ClassificationResult;
use std::collections::HashMap;
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

/// Most images that can be queued in the upload tab at once.
pub const MAX_FILES: usize = 15;

#[derive(Clone)]
pub struct FileData {
    pub id: u64,
    pub file: GlooFile,
    pub preview_url: Option<ObjectUrl>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Upload,
    Url,
}

pub enum Msg {
    // File operations
    FilesAdded(Vec<GlooFile>),
    AddPreview(u64, ObjectUrl),
    RemoveFile(u64),
    SelectFile(u64),
    ClearAllFiles,

    // Classification
    AnalyzeSelected,
    AnalyzeAll,
    UploadClassified(u64, ClassificationResult),
    UploadFailed(u64, String),
    UrlInput(String),
    AnalyzeUrl,
    UrlClassified(ClassificationResult),
    UrlFailed(String),

    // UI states
    SetError(Option<String>),
    SetDragging(bool),
    SetTab(Tab),
    ToggleTheme,
    PreviewLoaded,

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    pub files: HashMap<u64, FileData>,
    pub selected_file_id: Option<u64>,
    pub results: HashMap<u64, ClassificationResult>,
    pub url_input: String,
    pub url_result: Option<ClassificationResult>,
    pub active_tab: Tab,
    pub loading: bool,
    pub pending_requests: usize,
    pub error: Option<String>,
    pub is_dragging: bool,
    pub paste_listener: Option<EventListener>,
    pub theme: String,
    pub preview_loading: bool,
    pub preview_load_timeout: Option<Timeout>,
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let theme = load_theme();
        components::theme_toggle::apply_theme(&theme);

        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        Self {
            files: HashMap::new(),
            selected_file_id: None,
            results: HashMap::new(),
            url_input: String::new(),
            url_result: None,
            active_tab: Tab::Upload,
            loading: false,
            pending_requests: 0,
            error: None,
            is_dragging: false,
            paste_listener,
            theme,
            preview_loading: false,
            preview_load_timeout: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FilesAdded(files) => handlers::handle_files_added(self, ctx, files),
            Msg::AddPreview(id, url) => handlers::handle_add_preview(self, id, url),
            Msg::RemoveFile(id) => handlers::handle_remove_file(self, id),
            Msg::SelectFile(id) => handlers::handle_select_file(self, ctx, id),
            Msg::ClearAllFiles => handlers::handle_clear_all_files(self),

            Msg::AnalyzeSelected => handlers::handle_analyze_selected(self, ctx),
            Msg::AnalyzeAll => handlers::handle_analyze_all(self, ctx),
            Msg::UploadClassified(id, result) => handlers::handle_upload_classified(self, id, result),
            Msg::UploadFailed(id, error) => handlers::handle_upload_failed(self, id, error),
            Msg::UrlInput(value) => {
                self.url_input = value;
                true
            }
            Msg::AnalyzeUrl => handlers::handle_analyze_url(self, ctx),
            Msg::UrlClassified(result) => handlers::handle_url_classified(self, result),
            Msg::UrlFailed(error) => handlers::handle_url_failed(self, error),

            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::SetTab(tab) => {
                if self.active_tab == tab {
                    return false;
                }
                self.active_tab = tab;
                self.error = None;
                true
            }
            Msg::ToggleTheme => handlers::handle_toggle_theme(self),
            Msg::PreviewLoaded => handlers::handle_preview_loaded(self),

            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let tab_button = |tab: Tab, icon: &'static str, label: &'static str| {
            html! {
                <button
                    class={classes!("tab-btn", (self.active_tab == tab).then_some("active"))}
                    onclick={link.callback(move |_| Msg::SetTab(tab))}
                    disabled={self.loading}
                >
                    <i class={icon}></i>{ label }
                </button>
            }
        };

        html! {
            <div class="container">
                { render_header() }
                <div class="top-right">
                    { render_theme_toggle(&self.theme, link) }
                </div>

                <main class="main-content">
                    <nav class="tabs">
                        { tab_button(Tab::Upload, "fa-solid fa-upload", " Upload Images") }
                        { tab_button(Tab::Url, "fa-solid fa-link", " Image URL") }
                    </nav>
                    {
                        match self.active_tab {
                            Tab::Upload => html! {
                                <>
                                    { render_upload_section(self, ctx) }
                                    { render_preview_area(self, ctx) }
                                </>
                            },
                            Tab::Url => render_url_section(self, ctx),
                        }
                    }
                    { render_error_message(self) }
                    { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Brand Safety Analysis | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
