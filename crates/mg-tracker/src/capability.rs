//! Usage-stats capability, selected once at startup.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mg_core::{AppInfo, ForegroundApp, PermissionStatus, UsageError, UsageSource, UsageStat};

/// A usage source that may be missing on this platform.
///
/// `Unavailable` behaves as a null object: permission is reported as
/// unavailable and every query answers with nothing.
#[derive(Debug, Clone)]
pub enum Capability<U> {
    Available(U),
    Unavailable,
}

impl<U> Capability<U> {
    pub fn detect(source: Option<U>) -> Self {
        source.map_or(Self::Unavailable, Self::Available)
    }

    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl<U: UsageSource> UsageSource for Capability<U> {
    async fn permission(&self) -> PermissionStatus {
        match self {
            Self::Available(source) => source.permission().await,
            Self::Unavailable => PermissionStatus::Unavailable,
        }
    }

    async fn query_usage_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        match self {
            Self::Available(source) => source.query_usage_stats(start, end).await,
            Self::Unavailable => Ok(Vec::new()),
        }
    }

    async fn query_event_usage(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UsageStat>, UsageError> {
        match self {
            Self::Available(source) => source.query_event_usage(start, end).await,
            Self::Unavailable => Ok(Vec::new()),
        }
    }

    async fn current_foreground_app(&self) -> Result<Option<ForegroundApp>, UsageError> {
        match self {
            Self::Available(source) => source.current_foreground_app().await,
            Self::Unavailable => Ok(None),
        }
    }

    async fn app_display_names(
        &self,
        package_names: &[String],
    ) -> Result<HashMap<String, AppInfo>, UsageError> {
        match self {
            Self::Available(source) => source.app_display_names(package_names).await,
            Self::Unavailable => Ok(HashMap::new()),
        }
    }
}
