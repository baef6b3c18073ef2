use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Prefix shared by every counter key
pub const KEY_PREFIX: &str = "hipush-";

/// Delivery platform; each one owns a counter-key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Huawei,
    Xiaomi,
    Vivo,
    Oppo,
    Meizu,
    Honor,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::Ios,
        Platform::Android,
        Platform::Huawei,
        Platform::Xiaomi,
        Platform::Vivo,
        Platform::Oppo,
        Platform::Meizu,
        Platform::Honor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Huawei => "huawei",
            Platform::Xiaomi => "xiaomi",
            Platform::Vivo => "vivo",
            Platform::Oppo => "oppo",
            Platform::Meizu => "meizu",
            Platform::Honor => "honor",
        }
    }

    /// Upstream delivery service for the platform
    pub fn vendor(&self) -> &'static str {
        match self {
            Platform::Ios => "apns",
            Platform::Android => "fcm",
            Platform::Huawei => "hms",
            Platform::Xiaomi => "mi",
            Platform::Vivo => "vivo",
            Platform::Oppo => "oppo",
            Platform::Meizu => "meizu",
            Platform::Honor => "honor",
        }
    }

    /// `hipush-<platform>`
    pub fn key_prefix(&self) -> String {
        format!("{KEY_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    /// Accepts the platform name or its vendor alias, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted || p.vendor() == wanted)
            .ok_or_else(|| AppError::UnknownPlatform {
                name: s.to_string(),
            })
    }
}

/// Counter family tracked for every platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Total,
    Success,
    Failed,
    Send,
    Receive,
    Display,
    Click,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Total,
        Metric::Success,
        Metric::Failed,
        Metric::Send,
        Metric::Receive,
        Metric::Display,
        Metric::Click,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::Success => "success",
            Metric::Failed => "failed",
            Metric::Send => "send",
            Metric::Receive => "receive",
            Metric::Display => "display",
            Metric::Click => "click",
        }
    }

    /// `-<metric>`
    pub fn key_suffix(&self) -> String {
        format!("-{}", self.as_str())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| AppError::UnknownMetric {
                name: s.to_string(),
            })
    }
}

/// Store key for a (platform, metric) pair, e.g. `hipush-ios-total`
pub fn counter_key(platform: Platform, metric: Metric) -> String {
    format!("{}{}", platform.key_prefix(), metric.key_suffix())
}
