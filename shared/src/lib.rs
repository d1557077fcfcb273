use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumCount, EnumString};

/// Upper bound of a confidence score.
pub const MAX_CONFIDENCE: u8 = 99;

/// Explanation given to a category the model did not report on.
pub const UNAVAILABLE_EXPLANATION: &str = "unavailable";

/// Explanation used when the model reported a category without one.
pub const MISSING_EXPLANATION: &str = "No explanation provided";

/// The fixed brand-safety categories, in schema order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumCount,
)]
pub enum Category {
    AdultContent,
    ArmsAndAmmunition,
    DeathInjuryOrMilitaryConflict,
    HateSpeech,
    ObscenityAndProfanity,
    Drugs,
    Alcohol,
    Terrorism,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::AdultContent,
        Category::ArmsAndAmmunition,
        Category::DeathInjuryOrMilitaryConflict,
        Category::HateSpeech,
        Category::ObscenityAndProfanity,
        Category::Drugs,
        Category::Alcohol,
        Category::Terrorism,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::AdultContent => "Adult Content",
            Category::ArmsAndAmmunition => "Arms and Ammunition",
            Category::DeathInjuryOrMilitaryConflict => "Death, Injury, or Military Conflict",
            Category::HateSpeech => "Hate Speech",
            Category::ObscenityAndProfanity => "Obscenity and Profanity",
            Category::Drugs => "Drugs",
            Category::Alcohol => "Alcohol",
            Category::Terrorism => "Terrorism",
        }
    }

    /// What the category covers, as described to the model.
    pub fn description(&self) -> &'static str {
        match self {
            Category::AdultContent => "genitalia, sexual activity, nudity, buttocks, sex toys",
            Category::ArmsAndAmmunition => "guns, knives, and guns-in-use",
            Category::DeathInjuryOrMilitaryConflict => {
                "gore, blood, hanging, military conflict"
            }
            Category::HateSpeech => "KKK imagery, nazi imagery",
            Category::ObscenityAndProfanity => "middle finger",
            Category::Drugs => {
                "pilled or powdered drugs; tobacco, marijuana, or vaping paraphernalia"
            }
            Category::Alcohol => "alcohol and related drinks",
            Category::Terrorism => "ISIS symbol imagery",
        }
    }

    /// Key prefix of the flat response layout, e.g. `adultContentRating`.
    pub fn flat_rating_key(&self) -> &'static str {
        match self {
            Category::AdultContent => "adultContentRating",
            Category::ArmsAndAmmunition => "armsAndAmmunitionRating",
            Category::DeathInjuryOrMilitaryConflict => "deathInjuryOrMilitaryConflictRating",
            Category::HateSpeech => "hateSpeechRating",
            Category::ObscenityAndProfanity => "obscenityAndProfanityRating",
            Category::Drugs => "drugsContentRating",
            Category::Alcohol => "alcoholContentRating",
            Category::Terrorism => "terrorismRating",
        }
    }

    /// Position of the category in `Category::ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl Rating {
    pub fn severity(&self) -> u8 {
        match self {
            Rating::Low => 0,
            Rating::Medium => 1,
            Rating::High => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryJudgment {
    pub category: Category,
    pub rating: Rating,
    pub confidence: u8,
    pub explanation: String,
}

impl CategoryJudgment {
    /// Builds a judgment, clamping the confidence and never keeping a blank explanation.
    pub fn new(category: Category, rating: Rating, confidence: i64, explanation: &str) -> Self {
        let explanation = explanation.trim();
        Self {
            category,
            rating,
            confidence: clamp_confidence(confidence),
            explanation: if explanation.is_empty() {
                MISSING_EXPLANATION.to_string()
            } else {
                explanation.to_string()
            },
        }
    }

    /// Stand-in for a category the model left out.
    pub fn unavailable(category: Category) -> Self {
        Self {
            category,
            rating: Rating::Medium,
            confidence: 0,
            explanation: UNAVAILABLE_EXPLANATION.to_string(),
        }
    }
}

pub fn clamp_confidence(value: i64) -> u8 {
    value.clamp(0, MAX_CONFIDENCE as i64) as u8
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTime {
    pub intake_seconds: f64,
    pub model_seconds: f64,
    pub parse_seconds: f64,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub image_reference: String,
    pub judgments: BTreeMap<Category, CategoryJudgment>,
    pub model: String,
    pub processing_time: ProcessingTime,
}

impl ClassificationResult {
    pub fn judgment(&self, category: Category) -> Option<&CategoryJudgment> {
        self.judgments.get(&category)
    }

    /// Judgments in schema order.
    pub fn ordered(&self) -> impl Iterator<Item = &CategoryJudgment> {
        Category::ALL.iter().filter_map(|c| self.judgments.get(c))
    }

    /// The most severe rating across all categories.
    pub fn highest_rating(&self) -> Rating {
        self.judgments
            .values()
            .map(|j| j.rating)
            .max_by_key(|r| r.severity())
            .unwrap_or(Rating::Low)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyUrlRequest {
    pub url: String,
}

/// JSON envelope returned by every API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
