use super::super::{Model, Msg};
use super::utils::debounce;
use web_sys::HtmlInputElement;
use yew::prelude::*;

pub fn render_url_section(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();
    let handle_input = link.callback(|e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::UrlInput(input.value())
    });
    let handle_keydown = {
        let link = link.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                e.prevent_default();
                link.send_message(Msg::AnalyzeUrl);
            }
        })
    };

    html! {
        <div class="url-section">
            <label for="image-url">{"Image URL"}</label>
            <div class="url-input-row">
                <input
                    id="image-url"
                    type="url"
                    placeholder="https://example.com/image.jpg"
                    value={model.url_input.clone()}
                    oninput={handle_input}
                    onkeydown={handle_keydown}
                    disabled={model.loading}
                />
                <button
                    class="analyze-btn"
                    disabled={model.loading}
                    onclick={debounce(300, move || link.send_message(Msg::AnalyzeUrl))}
                >
                    {
                        if model.loading {
                            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
                        } else {
                            html! { <><i class="fa-solid fa-magnifying-glass"></i>{" Analyze URL"}</> }
                        }
                    }
                </button>
            </div>
            {
                if model.url_input.trim().is_empty() {
                    html! {}
                } else {
                    html! {
                        <img id="url-image-preview" src={model.url_input.trim().to_string()} alt="Image Preview" />
                    }
                }
            }
        </div>
    }
}
