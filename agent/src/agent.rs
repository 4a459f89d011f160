use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use thiserror::Error;

use vitals_core::dictionary::{self, Indicator};
use vitals_core::normalize::ChatMessage;

use crate::fetch::{FetchError, StatResult, StatsFetcher};

#[derive(Debug, Error)]
pub enum GenerateError {
    /// A tool invocation failed inside generation. Carries the tool's
    /// own message so the gateway can surface it as diagnostic data.
    #[error(transparent)]
    Tool(#[from] FetchError),
    #[error("{0}")]
    Agent(String),
}

/// An agent's generate capability: normalized messages in, an opaque
/// response value out. The gateway owns extracting text from whatever
/// shape the value takes.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Value, GenerateError>;
}

/// Keyword sets per indicator, most specific first so "health
/// expenditure" is not shadowed by a broader term.
const INDICATOR_KEYWORDS: &[(Indicator, &[&str])] = &[
    (Indicator::LifeExpectancy, &["life expectancy"]),
    (Indicator::InfantMortality, &["infant mortality", "mortality"]),
    (
        Indicator::HealthExpenditure,
        &["health expenditure", "health spending", "expenditure"],
    ),
    (
        Indicator::Immunization,
        &["immunization", "immunisation", "vaccination", "vaccine", "dpt"],
    ),
    (
        Indicator::SkilledBirths,
        &["skilled birth", "births attended", "skilled health staff"],
    ),
    (Indicator::HivPrevalence, &["hiv"]),
];

/// Word-boundary patterns per indicator, built from the keyword sets.
/// Spaces inside a keyword tolerate hyphenation ("life-expectancy").
static INDICATOR_RES: LazyLock<Vec<(Indicator, Regex)>> = LazyLock::new(|| {
    INDICATOR_KEYWORDS
        .iter()
        .map(|(indicator, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k).replace(' ', r"[\s-]+"))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                .expect("valid indicator regex");
            (*indicator, re)
        })
        .collect()
});

/// One alternation over every dictionary country name, longest name
/// first so "united kingdom" wins over "uk" at the same position.
static COUNTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = dictionary::country_names()
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid country regex")
});

/// Deterministic health-statistics agent. Extracts a (country,
/// indicator) intent from the latest user message, calls the World Bank
/// fetcher, and answers in a fixed data-first format. It never answers
/// a statistics question generically, and never asks for the country
/// when the user already named one.
pub struct HealthAgent {
    fetcher: StatsFetcher,
}

impl HealthAgent {
    pub const ID: &'static str = "healthAgent";

    pub fn new(fetcher: StatsFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Agent for HealthAgent {
    fn name(&self) -> &str {
        "Health Statistics Agent"
    }

    fn description(&self) -> &str {
        "Provides country-level health statistics from World Bank data"
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<Value, GenerateError> {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .or_else(|| messages.last())
            .map(|m| m.content.as_str())
            .ok_or_else(|| GenerateError::Agent("no input message".to_string()))?;

        let text = match parse_intent(question) {
            IntentMatch::Stat { country, indicator } => {
                let stat = self.fetcher.fetch(&country, indicator).await?;
                format_answer(&stat)
            }
            IntentMatch::MissingCountry(indicator) => format!(
                "Which country would you like {} data for? Supported countries include \
                 Nigeria, Ghana, Kenya, South Africa, USA, UK, India, China, Japan, and Brazil.",
                indicator.display_name()
            ),
            IntentMatch::None => capabilities_text(),
        };

        Ok(json!({ "text": text }))
    }
}

#[derive(Debug, PartialEq)]
enum IntentMatch {
    Stat { country: String, indicator: Indicator },
    MissingCountry(Indicator),
    None,
}

fn parse_intent(question: &str) -> IntentMatch {
    let lower = question.to_lowercase();

    let Some(indicator) = detect_indicator(&lower) else {
        return IntentMatch::None;
    };

    // Known country names first; otherwise forward a trailing
    // "in <name>" phrase so unknown countries fail through the tool's
    // own dictionary check instead of being silently re-prompted.
    if let Some(country) = detect_country(&lower) {
        return IntentMatch::Stat {
            country: country.to_string(),
            indicator,
        };
    }
    if let Some(candidate) = country_candidate(&lower) {
        return IntentMatch::Stat {
            country: candidate,
            indicator,
        };
    }
    IntentMatch::MissingCountry(indicator)
}

fn detect_indicator(lower: &str) -> Option<Indicator> {
    INDICATOR_RES
        .iter()
        .find(|(_, re)| re.is_match(lower))
        .map(|(indicator, _)| *indicator)
}

/// Find a dictionary country name on word boundaries, so "usa" never
/// matches inside "usage". The matched text is mapped back to its
/// canonical dictionary entry.
fn detect_country(lower: &str) -> Option<&'static str> {
    let matched = COUNTRY_RE.find(lower)?;
    dictionary::country_names()
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(matched.as_str()))
}

/// Best-effort country phrase after the last " in ", stripped of
/// trailing punctuation. "HIV prevalence in Wakanda?" yields "wakanda".
fn country_candidate(lower: &str) -> Option<String> {
    let (_, tail) = lower.rsplit_once(" in ")?;
    let candidate = tail
        .trim()
        .trim_start_matches("the ")
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string();
    (!candidate.is_empty()).then_some(candidate)
}

fn format_answer(stat: &StatResult) -> String {
    let value = stat
        .value
        .map(format_value)
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "According to World Bank data from {}, the {} in {} is {} {}. \
         Would you like to know about other health indicators for {}?",
        stat.year, stat.indicator_name, stat.country, value, stat.unit, stat.country
    )
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn capabilities_text() -> String {
    let mut lines = vec![
        "I provide country-level health statistics from World Bank data. \
         Ask me about one of these indicators for a supported country:"
            .to_string(),
    ];
    for indicator in Indicator::ALL {
        lines.push(format!(
            "- {} ({})",
            indicator.display_name(),
            indicator.unit()
        ));
    }
    lines.push("For example: \"What is the life expectancy in Nigeria?\"".to_string());
    lines.join("\n")
}
