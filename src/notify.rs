use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Toasts disappear after this long.
pub const NOTIFICATION_DURATION_MS: u64 = 3000;

/// Controls the toast colour only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }
}

impl From<&AppError> for Notification {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Import(_) => Notification::error("Ошибка при импорте файла"),
            AppError::Load(_) => Notification::error("Не удалось загрузить базу данных"),
            AppError::NotFound(msg) => Notification::error(format!("Not found: {}", msg)),
            _ => Notification::error("Something went wrong"),
        }
    }
}

/// A result body paired with the toast the UI should show for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notified<T> {
    pub data: T,
    pub notification: Notification,
}

impl<T> Notified<T> {
    pub fn new(data: T, notification: Notification) -> Self {
        Self { data, notification }
    }
}
