use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Monetary amount in minor units (cents) paired with its currency code.
///
/// Keeping amounts as scaled integers avoids floating-point currency
/// arithmetic anywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: String) -> Self {
        Self { amount, currency }
    }
}

/// Domain model representing a bank account as reported by a connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub bank: String,
    pub id: String,
    pub name: String,
    pub available_balance: Money,
    pub balance: Money,
    pub currency: String,
    pub iban: String,
    pub description: String,
}

impl Account {
    pub fn new(
        bank: String,
        id: String,
        name: String,
        available_balance: Money,
        balance: Money,
        currency: String,
        iban: String,
        description: String,
    ) -> Self {
        Self {
            bank,
            id,
            name,
            available_balance,
            balance,
            currency,
            iban,
            description,
        }
    }
}

/// Domain model representing a single account movement.
///
/// `balance` is the post-movement account balance; it stays `None` when the
/// server did not report one, which is not the same thing as a zero balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub account_id: String,
    pub id: String,
    pub amount: Money,
    pub description: String,
    pub effective_date: NaiveDate,
    pub currency: String,
    pub balance: Option<Money>,
}

impl Transaction {
    pub fn new(
        account_id: String,
        id: String,
        amount: Money,
        description: String,
        effective_date: NaiveDate,
        currency: String,
        balance: Option<Money>,
    ) -> Self {
        Self {
            account_id,
            id,
            amount,
            description,
            effective_date,
            currency,
            balance,
        }
    }
}
