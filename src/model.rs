//! Domain records and their closed vocabularies.
//! Category/status/sentiment/priority are tagged enums, never free-form
//! strings: unknown values are rejected at the boundary with a Validation
//! error instead of being persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation("bad_role", format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Delivery,
    Quality,
    Service,
    Technical,
    Billing,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Delivery,
        Category::Quality,
        Category::Service,
        Category::Technical,
        Category::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Delivery => "delivery",
            Category::Quality => "quality",
            Category::Service => "service",
            Category::Technical => "technical",
            Category::Billing => "billing",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "delivery" => Ok(Category::Delivery),
            "quality" => Ok(Category::Quality),
            "service" => Ok(Category::Service),
            "technical" => Ok(Category::Technical),
            "billing" => Ok(Category::Billing),
            other => Err(AppError::validation("bad_category", format!("unknown category '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Pending, Status::InProgress, Status::Resolved, Status::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
            Status::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "pending" => Ok(Status::Pending),
            "in_progress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            "closed" => Ok(Status::Closed),
            other => Err(AppError::validation("bad_status", format!("unknown status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "positive" => Ok(Sentiment::Positive),
            other => Err(AppError::validation("bad_sentiment", format!("unknown sentiment '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(AppError::validation("bad_priority", format!("unknown priority '{}'", other))),
        }
    }
}

/// The core domain record being classified and tracked.
///
/// `submitted_by` is immutable after creation; category and status only
/// change through the lifecycle rules in the service facade. `confidence`
/// reflects the classifier's call at creation time and is cleared when an
/// operator manually corrects the category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Complaint {
    pub id: String,
    pub text: String,
    pub submitted_by: String,
    pub category: Category,
    pub status: Status,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin patch for a complaint: only category and status are operator-mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintPatch {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ComplaintPatch {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// PHC-format hash; opaque to everything except the password hasher.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Admin patch for an account. An absent or empty `password` means
/// "leave the stored hash unchanged", never "clear the password".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
