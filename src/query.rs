//! Deterministic composition of filter + pagination + grouping parameters.
//! Raw query-string values are validated here exactly once; an unrecognized
//! filter value is an error, never silently dropped, so a caller can never
//! believe a filter was applied when it was ignored. Ownership scoping is
//! part of query construction, not post-filtering.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::Identity;
use crate::model::{Category, Complaint, Priority, Sentiment, Status};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    None,
    Category,
    Sentiment,
    Priority,
}

impl GroupBy {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "none" => Ok(GroupBy::None),
            "category" => Ok(GroupBy::Category),
            "sentiment" => Ok(GroupBy::Sentiment),
            "priority" => Ok(GroupBy::Priority),
            other => Err(AppError::validation("bad_group_by", format!("unknown group_by '{}'", other))),
        }
    }
}

/// Filter/pagination parameters exactly as they arrive from a query string,
/// before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFilters {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub group_by: Option<String>,
}

/// A validated list query. `page` is 1-indexed; `page_size` is within
/// 1..=MAX_PAGE_SIZE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySpec {
    pub page: u32,
    pub page_size: u32,
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub sentiment: Option<Sentiment>,
    pub priority: Option<Priority>,
    pub group_by: GroupBy,
}

/// A QuerySpec after ownership scoping. `submitted_by: Some(subject)` pins
/// the result set to one submitter; `None` means unscoped (admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveQuerySpec {
    #[serde(flatten)]
    pub spec: QuerySpec,
    pub submitted_by: Option<String>,
}

fn parse_positive(field: &str, raw: &str) -> AppResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::validation("bad_pagination", format!("{} must be a positive integer, got '{}'", field, raw))),
    }
}

/// Validate raw filters into a QuerySpec. Defaults: page=1, page_size=10;
/// page_size is clamped to MAX_PAGE_SIZE rather than rejected.
pub fn build_query(raw: &RawFilters) -> AppResult<QuerySpec> {
    let page = match raw.page.as_deref() {
        None | Some("") => 1,
        Some(p) => parse_positive("page", p)?,
    };
    let page_size = match raw.page_size.as_deref() {
        None | Some("") => DEFAULT_PAGE_SIZE,
        Some(p) => parse_positive("page_size", p)?.min(MAX_PAGE_SIZE),
    };
    let category = match raw.category.as_deref() {
        None | Some("") => None,
        Some(v) => Some(Category::parse(v)?),
    };
    let status = match raw.status.as_deref() {
        None | Some("") => None,
        Some(v) => Some(Status::parse(v)?),
    };
    let sentiment = match raw.sentiment.as_deref() {
        None | Some("") => None,
        Some(v) => Some(Sentiment::parse(v)?),
    };
    let priority = match raw.priority.as_deref() {
        None | Some("") => None,
        Some(v) => Some(Priority::parse(v)?),
    };
    let group_by = match raw.group_by.as_deref() {
        None | Some("") => GroupBy::None,
        Some(v) => GroupBy::parse(v)?,
    };
    Ok(QuerySpec { page, page_size, category, status, sentiment, priority, group_by })
}

/// Apply ownership scoping. Non-admin identities are pinned to their own
/// submissions no matter what the caller asked for; anonymous callers get
/// no query at all.
pub fn scope_for_identity(identity: &Identity, spec: QuerySpec) -> AppResult<EffectiveQuerySpec> {
    let claims = identity
        .claims()
        .ok_or_else(|| AppError::unauthenticated("no_identity", "authentication required"))?;
    let submitted_by = if identity.is_admin() { None } else { Some(claims.subject.clone()) };
    Ok(EffectiveQuerySpec { spec, submitted_by })
}

impl EffectiveQuerySpec {
    /// Row-level filter predicate; the contract every storage implementation
    /// must honor for list and export.
    pub fn matches(&self, c: &Complaint) -> bool {
        if let Some(sub) = &self.submitted_by {
            if &c.submitted_by != sub { return false; }
        }
        if let Some(cat) = self.spec.category {
            if c.category != cat { return false; }
        }
        if let Some(st) = self.spec.status {
            if c.status != st { return false; }
        }
        if let Some(se) = self.spec.sentiment {
            if c.sentiment != Some(se) { return false; }
        }
        if let Some(pr) = self.spec.priority {
            if c.priority != Some(pr) { return false; }
        }
        true
    }
}

/// Group key for complaints missing the optional grouped field.
pub const UNCLASSIFIED_KEY: &str = "unclassified";

/// Partition an already-fetched page by the grouped field. Key order is the
/// order of first occurrence in the input; this does not re-paginate.
pub fn group(items: &[Complaint], group_by: GroupBy) -> Vec<(String, Vec<Complaint>)> {
    let key_of = |c: &Complaint| -> String {
        match group_by {
            GroupBy::None => String::new(),
            GroupBy::Category => c.category.as_str().to_string(),
            GroupBy::Sentiment => c.sentiment.map(|s| s.as_str()).unwrap_or(UNCLASSIFIED_KEY).to_string(),
            GroupBy::Priority => c.priority.map(|p| p.as_str()).unwrap_or(UNCLASSIFIED_KEY).to_string(),
        }
    };
    let mut out: Vec<(String, Vec<Complaint>)> = Vec::new();
    for c in items {
        let key = key_of(c);
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(c.clone()),
            None => out.push((key, vec![c.clone()])),
        }
    }
    out
}
