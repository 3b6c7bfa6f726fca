use serde::{Deserialize, Serialize};

/// Value carried by a setting change. Numbers are sent as JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Messages the host posts into a running program.
///
/// Delivery is best-effort: there is no acknowledgement and no reply channel.
/// A program that never listens simply ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    SettingChange { key: String, value: SettingValue },
}

impl HostMessage {
    pub fn setting(key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        Self::SettingChange {
            key: key.into(),
            value: value.into(),
        }
    }
}
