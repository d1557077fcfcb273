use shared::{ClassificationResult, ProcessingTime};
use std::time::Duration;

use crate::parser::JudgmentSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub intake: Duration,
    pub model: Duration,
    pub parse: Duration,
    pub total: Duration,
}

impl From<StageTimings> for ProcessingTime {
    fn from(t: StageTimings) -> Self {
        ProcessingTime {
            intake_seconds: round_secs(t.intake),
            model_seconds: round_secs(t.model),
            parse_seconds: round_secs(t.parse),
            total_seconds: round_secs(t.total),
        }
    }
}

fn round_secs(d: Duration) -> f64 {
    (d.as_secs_f64() * 100.0).round() / 100.0
}

pub fn assemble(
    image_reference: String,
    judgments: JudgmentSet,
    model: &str,
    timings: StageTimings,
) -> ClassificationResult {
    ClassificationResult {
        image_reference,
        judgments: judgments.into_map(),
        model: model.to_string(),
        processing_time: timings.into(),
    }
}
