use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monthly accumulator for one owner/resource pair (`spec.md` §3 `UsageCounter`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UsageResource {
    AudioMinutes,
    VideoMinutes,
    ConversationMinutes,
    AvatarCreations,
    ApiCalls,
}

impl std::fmt::Display for UsageResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UsageResource::AudioMinutes => "audio-minutes",
            UsageResource::VideoMinutes => "video-minutes",
            UsageResource::ConversationMinutes => "conversation-minutes",
            UsageResource::AvatarCreations => "avatar-creations",
            UsageResource::ApiCalls => "api-calls",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UsageResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio-minutes" => Ok(UsageResource::AudioMinutes),
            "video-minutes" => Ok(UsageResource::VideoMinutes),
            "conversation-minutes" => Ok(UsageResource::ConversationMinutes),
            "avatar-creations" => Ok(UsageResource::AvatarCreations),
            "api-calls" => Ok(UsageResource::ApiCalls),
            other => Err(format!("unknown usage resource: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCounter {
    pub owner_id: Uuid,
    pub resource: UsageResource,
    pub used: f64,
    pub limit: f64,
    /// Start of the current billing cycle; rolled over by an external
    /// process, never by this core (`spec.md` §3).
    pub billing_cycle_anchor: DateTime<Utc>,
}

impl UsageCounter {
    pub fn remaining(&self) -> f64 {
        (self.limit - self.used).max(0.0)
    }
}
