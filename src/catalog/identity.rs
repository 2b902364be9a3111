use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Versioned key for a flag catalog (e.g., `boost_1.84.0`).
///
/// Declarations name the key they were written against so the host can pick
/// the matching catalog when several vendor versions are registered.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogKey(pub String);

/// Exact name of a vendor toggle flag (e.g., `without_container`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagName(pub String);

/// Semantic capability a consumer asks for (e.g., `coroutine`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(pub String);

impl FlagName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl CapabilityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlagName {
    fn from(value: &str) -> Self {
        FlagName(value.to_string())
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        CapabilityName(value.to_string())
    }
}

/// Vendor subsystem a flag belongs to.
///
/// Known variants keep serialization consistent; `Other` preserves forward
/// compatibility with catalogs that introduce new groupings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FlagCategory {
    DataStructures,
    Execution,
    Diagnostics,
    Serialization,
    TextProcessing,
    Numeric,
    Io,
    Testing,
    Platform,
    Build,
    Other(String),
}

/// How a flag's boolean maps onto "component enabled".
///
/// `Exclude` catalogs spell toggles as `without_<module>`, so `true` removes
/// the component. `Include` catalogs spell them as `with_<module>`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Exclude,
    Include,
}

impl Polarity {
    /// Flag value that realizes the given enabled/disabled decision.
    pub fn flag_value(self, enabled: bool) -> bool {
        match self {
            Polarity::Exclude => !enabled,
            Polarity::Include => enabled,
        }
    }

    /// Whether a flag value leaves its component enabled.
    pub fn is_enabled(self, value: bool) -> bool {
        match self {
            Polarity::Exclude => !value,
            Polarity::Include => value,
        }
    }
}

impl Serialize for FlagCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlagCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

impl FlagCategory {
    pub fn as_str(&self) -> &str {
        match self {
            FlagCategory::DataStructures => "data_structures",
            FlagCategory::Execution => "execution",
            FlagCategory::Diagnostics => "diagnostics",
            FlagCategory::Serialization => "serialization",
            FlagCategory::TextProcessing => "text_processing",
            FlagCategory::Numeric => "numeric",
            FlagCategory::Io => "io",
            FlagCategory::Testing => "testing",
            FlagCategory::Platform => "platform",
            FlagCategory::Build => "build",
            FlagCategory::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "data_structures" => FlagCategory::DataStructures,
            "execution" => FlagCategory::Execution,
            "diagnostics" => FlagCategory::Diagnostics,
            "serialization" => FlagCategory::Serialization,
            "text_processing" => FlagCategory::TextProcessing,
            "numeric" => FlagCategory::Numeric,
            "io" => FlagCategory::Io,
            "testing" => FlagCategory::Testing,
            "platform" => FlagCategory::Platform,
            "build" => FlagCategory::Build,
            other => FlagCategory::Other(other.to_string()),
        }
    }
}
