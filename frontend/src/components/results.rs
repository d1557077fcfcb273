use super::super::{Model, Tab};
use shared::{CategoryJudgment, ClassificationResult, Rating};
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    match model.active_tab {
        Tab::Upload => {
            let Some(selected_id) = model.selected_file_id else {
                return html! {};
            };
            match model.results.get(&selected_id) {
                Some(result) => {
                    let name = model
                        .files
                        .get(&selected_id)
                        .map_or_else(|| "Analyzed Image".to_string(), |fd| fd.file.name());
                    render_classification(result, &name)
                }
                None => html! {
                    <p class="no-results-message">{"No analysis result available for the selected image."}</p>
                },
            }
        }
        Tab::Url => match &model.url_result {
            Some(result) => render_classification(result, &result.image_reference),
            None => html! {},
        },
    }
}

fn verdict_text(rating: Rating) -> &'static str {
    match rating {
        Rating::Low => " Brand Safe",
        Rating::Medium => " Review Recommended",
        Rating::High => " Unsafe Content Detected",
    }
}

fn verdict_icon(rating: Rating) -> &'static str {
    match rating {
        Rating::Low => "fa-solid fa-circle-check",
        Rating::Medium => "fa-solid fa-triangle-exclamation",
        Rating::High => "fa-solid fa-ban",
    }
}

pub fn render_classification(result: &ClassificationResult, title: &str) -> Html {
    let verdict = result.highest_rating();
    let timing = &result.processing_time;

    html! {
        <div class={classes!("results-container", format!("verdict-{}", verdict))}>
            <div class="result-header">
                <h2 title={format!("Analysis results for: {}", title)}>
                    <i class={verdict_icon(verdict)}></i>{ verdict_text(verdict) }
                    <span class="analyzed-filename-display">{ format!("({})", title) }</span>
                </h2>
            </div>
            <div class="detailed-results">
                <h3>{"Category Analysis"}</h3>
                <div class="result-bars">
                    { for result.ordered().map(render_judgment) }
                </div>
            </div>
            <div class="result-meta">
                <span>{ format!("Model: {}", result.model) }</span>
                <span>
                    { format!(
                        "Total {:.2}s (intake {:.2}s, model {:.2}s, parse {:.2}s)",
                        timing.total_seconds,
                        timing.intake_seconds,
                        timing.model_seconds,
                        timing.parse_seconds
                    ) }
                </span>
            </div>
        </div>
    }
}

fn render_judgment(judgment: &CategoryJudgment) -> Html {
    html! {
        <div class="result-item" key={judgment.category.as_ref()}>
            <div class="result-label" title={judgment.category.description()}>
                { judgment.category.label() }
            </div>
            <span class={classes!("rating-badge", format!("rating-{}", judgment.rating))}>
                { judgment.rating.as_ref().to_uppercase() }
            </span>
            <div class="result-bar-container">
                <div class="result-bar" style={format!("width: {}%", judgment.confidence)}></div>
            </div>
            <div class="result-value">{ format!("{}%", judgment.confidence) }</div>
            <p class="result-explanation">{ judgment.explanation.clone() }</p>
        </div>
    }
}
