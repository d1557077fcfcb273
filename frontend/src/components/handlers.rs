use super::super::{FileData, MAX_FILES, Model, Msg, Tab};
use super::theme_toggle::{apply_theme, save_theme};
use super::utils::{extract_image_files, generate_id};
use crate::api;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_timers::callback::Timeout;
use shared::ClassificationResult;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

pub fn handle_files_added(model: &mut Model, ctx: &Context<Model>, files: Vec<GlooFile>) -> bool {
    let available_slots = MAX_FILES.saturating_sub(model.files.len());

    if files.len() > available_slots {
        model.error = Some(format!(
            "Upload limit exceeded. You can only add {} more images.",
            available_slots
        ));
        return true;
    }

    model.error = None;
    let mut new_selection = None;

    for file in files {
        let id = generate_id();
        model.files.insert(
            id,
            FileData {
                id,
                file: file.clone(),
                preview_url: None,
            },
        );
        ctx.link().send_message(Msg::AddPreview(id, ObjectUrl::from(file)));
        new_selection = Some(id);
    }

    if new_selection.is_some() {
        model.selected_file_id = new_selection;
    }

    true
}

pub fn handle_add_preview(model: &mut Model, id: u64, url: ObjectUrl) -> bool {
    match model.files.get_mut(&id) {
        Some(file_data) => {
            file_data.preview_url = Some(url);
            true
        }
        None => false,
    }
}

pub fn handle_remove_file(model: &mut Model, id: u64) -> bool {
    if model.files.remove(&id).is_none() {
        return false;
    }
    model.results.remove(&id);

    if model.files.is_empty() {
        model.selected_file_id = None;
        model.results.clear();
        model.error = None;
    } else if model.selected_file_id == Some(id) {
        model.selected_file_id = model.files.keys().max().copied();
    }

    true
}

pub fn handle_select_file(model: &mut Model, ctx: &Context<Model>, id: u64) -> bool {
    if model.selected_file_id == Some(id) || !model.files.contains_key(&id) {
        return false;
    }

    if let Some(timeout) = model.preview_load_timeout.take() {
        timeout.cancel();
    }

    model.selected_file_id = Some(id);
    model.error = None;
    model.preview_loading = true;

    let link = ctx.link().clone();
    model.preview_load_timeout = Some(Timeout::new(0, move || {
        link.send_message(Msg::PreviewLoaded);
    }));

    true
}

pub fn handle_clear_all_files(model: &mut Model) -> bool {
    model.files.clear();
    model.selected_file_id = None;
    model.results.clear();
    model.error = None;
    true
}

pub fn handle_analyze_selected(model: &mut Model, ctx: &Context<Model>) -> bool {
    let selected = model
        .selected_file_id
        .and_then(|id| model.files.get(&id))
        .map(|fd| (fd.id, fd.file.clone()));

    match selected {
        Some((file_id, file)) => {
            model.loading = true;
            model.error = None;
            model.pending_requests = 1;
            send_upload_request(ctx, file_id, file);
            true
        }
        None => {
            ctx.link()
                .send_message(Msg::SetError(Some("No file selected for analysis.".into())));
            false
        }
    }
}

pub fn handle_analyze_all(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.files.is_empty() {
        return false;
    }

    model.loading = true;
    model.error = None;
    model.pending_requests = model.files.len();

    for file_data in model.files.values() {
        send_upload_request(ctx, file_data.id, file_data.file.clone());
    }

    true
}

fn finish_request(model: &mut Model) {
    model.pending_requests = model.pending_requests.saturating_sub(1);
    if model.pending_requests == 0 {
        model.loading = false;
    }
}

pub fn handle_upload_classified(model: &mut Model, file_id: u64, result: ClassificationResult) -> bool {
    finish_request(model);
    if model.files.contains_key(&file_id) {
        model.results.insert(file_id, result);
    }
    true
}

pub fn handle_upload_failed(model: &mut Model, file_id: u64, error: String) -> bool {
    finish_request(model);
    let name = model
        .files
        .get(&file_id)
        .map_or_else(|| "image".to_string(), |fd| fd.file.name());
    log::error!("Classification of {} failed: {}", name, error);
    model.error = Some(format!("{}: {}", name, error));
    true
}

pub fn handle_analyze_url(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.loading {
        return false;
    }

    let url = model.url_input.trim().to_string();
    if url.is_empty() {
        model.error = Some("Enter an image URL to analyze.".into());
        return true;
    }

    model.loading = true;
    model.error = None;
    model.url_result = None;

    let link = ctx.link().clone();
    spawn_local(async move {
        match api::classify_url(&url).await {
            Ok(result) => link.send_message(Msg::UrlClassified(result)),
            Err(e) => link.send_message(Msg::UrlFailed(e)),
        }
    });

    true
}

pub fn handle_url_classified(model: &mut Model, result: ClassificationResult) -> bool {
    model.loading = false;
    model.url_result = Some(result);
    true
}

pub fn handle_url_failed(model: &mut Model, error: String) -> bool {
    log::error!("URL classification failed: {}", error);
    model.loading = false;
    model.error = Some(error);
    true
}

pub fn handle_preview_loaded(model: &mut Model) -> bool {
    model.preview_loading = false;
    model.preview_load_timeout = None;
    true
}

pub fn handle_toggle_theme(model: &mut Model) -> bool {
    model.theme = if model.theme == "light" {
        "dark".to_string()
    } else {
        "light".to_string()
    };
    apply_theme(&model.theme);
    save_theme(&model.theme);
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
        process_file_list(ctx, file_list);
    }

    true
}

pub fn handle_paste(model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if model.active_tab != Tab::Upload {
        return false;
    }
    match event.clipboard_data().and_then(|dt| dt.files()) {
        Some(file_list) if file_list.length() > 0 => {
            event.prevent_default();
            process_file_list(ctx, file_list);
            true
        }
        _ => false,
    }
}

fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    let (accepted, rejected) = extract_image_files(&file_list);

    if !accepted.is_empty() {
        ctx.link().send_message(Msg::FilesAdded(accepted));
    }

    if !rejected.is_empty() {
        log::warn!("Skipping unsupported files: {:?}", rejected);
        ctx.link().send_message(Msg::SetError(Some(format!(
            "Skipped unsupported file: {}",
            rejected.join(", ")
        ))));
    }
}

fn send_upload_request(ctx: &Context<Model>, file_id: u64, file: GlooFile) {
    let link = ctx.link().clone();
    spawn_local(async move {
        match api::classify_file(&file).await {
            Ok(result) => link.send_message(Msg::UploadClassified(file_id, result)),
            Err(e) => link.send_message(Msg::UploadFailed(file_id, e)),
        }
    });
}
