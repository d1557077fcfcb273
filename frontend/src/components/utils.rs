use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use js_sys::Date;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_sys::FileList;
use yew::prelude::*;

/// Image types the backend accepts.
pub const ACCEPTED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub fn generate_id() -> u64 {
    static ID_COUNTER: AtomicU64 = AtomicU64::new(0);
    let now = Date::now() as u64;
    let count = ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    now * 1000 + (count % 1000)
}

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || inner_callback()));
    })
}

pub fn is_accepted_type(mime: &str) -> bool {
    ACCEPTED_TYPES.contains(&mime.to_ascii_lowercase().as_str())
}

/// Splits a file list into accepted images and the names of rejected files.
pub fn extract_image_files(file_list: &FileList) -> (Vec<GlooFile>, Vec<String>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for file in (0..file_list.length()).filter_map(|i| file_list.item(i)) {
        if is_accepted_type(&file.type_()) {
            accepted.push(GlooFile::from(file));
        } else {
            rejected.push(file.name());
        }
    }
    (accepted, rejected)
}

pub fn truncate_name(name: &str, max: usize) -> String {
    if name.chars().count() > max {
        let head: String = name.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_types_match_backend() {
        assert!(is_accepted_type("image/png"));
        assert!(is_accepted_type("IMAGE/JPEG"));
        assert!(!is_accepted_type("image/gif"));
        assert!(!is_accepted_type(""));
    }

    #[test]
    fn long_names_are_shortened() {
        assert_eq!(truncate_name("short.png", 20), "short.png");
        assert_eq!(
            truncate_name("a-really-long-file-name.jpeg", 20),
            "a-really-long-fil..."
        );
    }
}
