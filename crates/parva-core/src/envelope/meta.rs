use serde::{Deserialize, Serialize};

/// Sentinel used for `method` when the server did not say.
pub const UNKNOWN_METHOD: &str = "unknown";

/// Score reported alongside an unknown confidence level.
pub const UNKNOWN_CONFIDENCE_SCORE: f64 = 0.5;

pub const DEFAULT_POLICY_PROFILE: &str = "np-mainstream";
pub const DEFAULT_POLICY_JURISDICTION: &str = "NP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ResponseEnvelope<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct ResponseMeta {
    pub confidence: Confidence,
    pub method: String,
    pub provenance: Provenance,
    pub uncertainty: Uncertainty,
    pub trace_id: Option<String>,
    pub policy: Policy,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            confidence: Confidence::default(),
            method: UNKNOWN_METHOD.to_string(),
            provenance: Provenance::default(),
            uncertainty: Uncertainty::default(),
            trace_id: None,
            policy: Policy::default(),
        }
    }
}

impl ResponseMeta {
    /// True when the server supplied no confidence information at all.
    pub fn is_unknown(&self) -> bool {
        self.confidence.level == ConfidenceLevel::Unknown && self.method == UNKNOWN_METHOD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Official,
    Computed,
    Estimated,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub score: f64,
}

impl Default for Confidence {
    fn default() -> Self {
        Self {
            level: ConfidenceLevel::Unknown,
            score: UNKNOWN_CONFIDENCE_SCORE,
        }
    }
}

impl From<ConfidenceLevel> for Confidence {
    fn from(level: ConfidenceLevel) -> Self {
        Self {
            level,
            score: UNKNOWN_CONFIDENCE_SCORE,
        }
    }
}

/// Where a computed answer came from and how to verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Provenance {
    pub snapshot_id: Option<String>,
    pub dataset_hash: Option<String>,
    pub rules_hash: Option<String>,
    pub verify_url: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum BoundaryRisk {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Uncertainty {
    pub interval_hours: Option<f64>,
    pub boundary_risk: BoundaryRisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct Policy {
    pub profile: String,
    pub jurisdiction: String,
    pub advisory: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            profile: DEFAULT_POLICY_PROFILE.to_string(),
            jurisdiction: DEFAULT_POLICY_JURISDICTION.to_string(),
            advisory: true,
        }
    }
}
