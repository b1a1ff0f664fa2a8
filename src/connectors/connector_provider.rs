use async_trait::async_trait;
use chrono::{Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_WINDOW_MONTHS;
use crate::models::{Account, Transaction};
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    #[error("Missing bank code")]
    MissingBankCode,
    #[error("Unsupported bank: {0}")]
    UnsupportedBank(String),
    #[error("Invalid connector configuration: {0}")]
    InvalidConfiguration(String),
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidApiResponse(String),
}

impl From<SessionError> for ConnectorError {
    fn from(e: SessionError) -> Self {
        ConnectorError::ApiRequestFailed(e.to_string())
    }
}
impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        ConnectorError::ApiRequestFailed(e.to_string())
    }
}
impl From<serde_json::Error> for ConnectorError {
    fn from(e: serde_json::Error) -> Self {
        ConnectorError::InvalidApiResponse(e.to_string())
    }
}
impl From<chrono::ParseError> for ConnectorError {
    fn from(e: chrono::ParseError) -> Self {
        ConnectorError::InvalidApiResponse(e.to_string())
    }
}

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Login credentials for an online-banking connector
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BankCredentials {
    pub bank: String,
    pub user_id: String,
    pub password: String,
}

/// Inclusive calendar-date window for transaction retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window ending today and starting one calendar month earlier.
    pub fn past_month() -> Self {
        let end = Local::now().date_naive();
        let start = end
            .checked_sub_months(Months::new(DEFAULT_WINDOW_MONTHS))
            .unwrap_or(end);
        Self { start, end }
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::past_month()
    }
}

#[async_trait]
pub trait BankConnector: Send + Sync + std::fmt::Debug {
    /// Bank code this connector drives.
    fn bank(&self) -> &'static str;

    /// Lists the accounts visible to the authenticated user.
    async fn fetch_accounts(&self) -> Result<Vec<Account>>;

    /// Retrieves the transactions of `account` whose effective date falls
    /// inside `range`, in the order the server returned them. `None`
    /// selects the default window.
    async fn fetch_transactions(
        &self,
        account: &Account,
        range: Option<DateRange>,
    ) -> Result<Vec<Transaction>>;
}
