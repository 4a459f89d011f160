use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// The six World Bank health indicator series the agent can answer for.
/// Closed set — request validation happens at the serde boundary, so
/// downstream code never sees an unknown indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    LifeExpectancy,
    InfantMortality,
    HealthExpenditure,
    Immunization,
    SkilledBirths,
    HivPrevalence,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::LifeExpectancy,
        Indicator::InfantMortality,
        Indicator::HealthExpenditure,
        Indicator::Immunization,
        Indicator::SkilledBirths,
        Indicator::HivPrevalence,
    ];

    /// Stable key used in cache keys and tool payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Indicator::LifeExpectancy => "life_expectancy",
            Indicator::InfantMortality => "infant_mortality",
            Indicator::HealthExpenditure => "health_expenditure",
            Indicator::Immunization => "immunization",
            Indicator::SkilledBirths => "skilled_births",
            Indicator::HivPrevalence => "hiv_prevalence",
        }
    }

    pub fn from_key(key: &str) -> Option<Indicator> {
        Indicator::ALL.iter().copied().find(|i| i.key() == key)
    }

    /// World Bank series code for the indicator.
    pub fn series_code(&self) -> &'static str {
        match self {
            Indicator::LifeExpectancy => "SP.DYN.LE00.IN",
            Indicator::InfantMortality => "SP.DYN.IMRT.IN",
            Indicator::HealthExpenditure => "SH.XPD.CHEX.PC.CD",
            Indicator::Immunization => "SH.IMM.IDPT",
            Indicator::SkilledBirths => "SH.STA.BRTC.ZS",
            Indicator::HivPrevalence => "SH.DYN.AIDS.ZS",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Indicator::LifeExpectancy => "Life Expectancy at Birth",
            Indicator::InfantMortality => "Infant Mortality Rate",
            Indicator::HealthExpenditure => "Health Expenditure per Capita",
            Indicator::Immunization => "Immunization Coverage (DPT)",
            Indicator::SkilledBirths => "Births Attended by Skilled Health Staff",
            Indicator::HivPrevalence => "HIV Prevalence",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Indicator::LifeExpectancy => "years",
            Indicator::InfantMortality => "per 1,000 live births",
            Indicator::HealthExpenditure => "USD",
            Indicator::Immunization => "% of children ages 12-23 months",
            Indicator::SkilledBirths => "% of total births",
            Indicator::HivPrevalence => "% of population ages 15-49",
        }
    }
}

/// ISO 3166-1 alpha-3 codes for the countries we currently serve.
/// Lookup keys are lowercase; common aliases (usa, uk) map to the same
/// code as the full name.
static COUNTRY_CODES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Africa
        ("nigeria", "NGA"),
        ("ghana", "GHA"),
        ("kenya", "KEN"),
        ("south africa", "ZAF"),
        ("egypt", "EGY"),
        ("ethiopia", "ETH"),
        ("tanzania", "TZA"),
        ("uganda", "UGA"),
        ("morocco", "MAR"),
        ("algeria", "DZA"),
        // Americas
        ("usa", "USA"),
        ("united states", "USA"),
        ("canada", "CAN"),
        ("brazil", "BRA"),
        ("mexico", "MEX"),
        ("argentina", "ARG"),
        ("colombia", "COL"),
        ("chile", "CHL"),
        // Europe
        ("uk", "GBR"),
        ("united kingdom", "GBR"),
        ("germany", "DEU"),
        ("france", "FRA"),
        ("italy", "ITA"),
        ("spain", "ESP"),
        ("poland", "POL"),
        ("netherlands", "NLD"),
        // Asia
        ("india", "IND"),
        ("china", "CHN"),
        ("japan", "JPN"),
        ("south korea", "KOR"),
        ("indonesia", "IDN"),
        ("pakistan", "PAK"),
        ("bangladesh", "BGD"),
        ("vietnam", "VNM"),
        ("philippines", "PHL"),
        ("thailand", "THA"),
        // Oceania
        ("australia", "AUS"),
        ("new zealand", "NZL"),
    ])
});

/// Resolve a free-text country name to its ISO3 code.
///
/// Exact dictionary membership only — case-insensitive and
/// whitespace-trimmed, but no partial or fuzzy matching. Unknown names
/// return `None`; callers decide how that surfaces.
pub fn resolve_country(name: &str) -> Option<&'static str> {
    COUNTRY_CODES
        .get(name.trim().to_lowercase().as_str())
        .copied()
}

/// All known lowercase country names, longest first. Longest-first
/// ordering lets text scanners prefer "south africa" over a bare
/// "africa"-adjacent partial and "united kingdom" over "uk".
pub fn country_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = COUNTRY_CODES.keys().copied().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names
}
