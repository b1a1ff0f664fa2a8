use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::debug;
use num_traits::ToPrimitive;
use regex::Regex;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, HOST,
    USER_AGENT,
};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::connectors::connector_provider::{
    BankConnector, BankCredentials, ConnectorError, DateRange, Result,
};
use crate::constants::DATE_FORMAT;
use crate::models::{Account, Money, Transaction};
use crate::session::Session;

/// Bank code handled by this connector.
pub const BANK_BMES: &str = "BMES";

static API_BASE: &str = "https://banca.bmes.es";
static LOGIN_PATH: &str = "/DFAUTH/slod/DFServletXML";
static PRODUCTS_PATH: &str = "/ENPP/enpp_mult_web_mobility_02/products/v1";
static ACCOUNTS_PATH: &str = "/ENPP/enpp_mult_web_mobility_02/accounts";

/// Identifying user agent the mobility API routes on; sent both as the
/// regular user agent and through a matching custom header.
static APP_USER_AGENT: &str =
    "4a1f82c9e7d34b6a;Android;samsung;SM-G973F;1080x2042;Android;10;BMES;5.27.1;xxhd";

/// Entity prefix prepended to national ID logins.
static NATIONAL_ID_PREFIX: &str = "0019-0";

lazy_static! {
    static ref NATIONAL_ID_RE: Regex = Regex::new(r"^[0-9]{8}[A-Z]$").unwrap();
}

/// Normalizes a raw user identifier into the form the login endpoint
/// expects: national ID numbers (8 digits plus a letter, any case) get the
/// entity prefix, anything else is forwarded uppercased and untouched.
pub fn normalize_user_id(raw: &str) -> String {
    let upper = raw.to_uppercase();
    if NATIONAL_ID_RE.is_match(&upper) {
        format!("{}{}", NATIONAL_ID_PREFIX, upper)
    } else {
        upper
    }
}

/// Converts a decimal currency amount into minor units.
fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| ConnectorError::InvalidApiResponse(format!("amount {} out of range", amount)))
}

fn default_headers(host: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
    headers.insert(
        HeaderName::from_static("x-client-user-agent"),
        HeaderValue::from_static(APP_USER_AGENT),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("es-ES,es;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HOST,
        HeaderValue::from_str(host)
            .map_err(|e| ConnectorError::InvalidConfiguration(e.to_string()))?,
    );
    headers.insert(
        HeaderName::from_static("cookie2"),
        HeaderValue::from_static("$Version=1"),
    );
    Ok(headers)
}

/// Headers for the read endpoints: the routing layer wants the logical
/// method asserted as GET even though the transport verb is a POST.
fn read_override_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-http-method-override"),
        HeaderValue::from_static("GET"),
    );
    headers
}

/// Two independent opaque continuation tokens echoed between requests.
///
/// After every page the state is replaced wholesale: tokens the server
/// returned are forwarded verbatim on the next request, tokens it omitted
/// are dropped rather than reused from an earlier page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PageCursor {
    offset: Option<String>,
    pagination_balance: Option<String>,
}

impl PageCursor {
    fn advance(&mut self, page: &MovementsPage) {
        self.offset = page.offset.clone();
        self.pagination_balance = page.pagination_balance.clone();
    }

    fn append_to(&self, url: &mut String) {
        if let Some(offset) = &self.offset {
            url.push_str("&offset=");
            url.push_str(&urlencoding::encode(offset));
        }
        if let Some(balance) = &self.pagination_balance {
            url.push_str("&paginationBalance=");
            url.push_str(&urlencoding::encode(balance));
        }
    }
}

#[derive(Debug)]
pub struct BmesProvider {
    session: Session,
    base_url: String,
}

impl BmesProvider {
    /// Connects against the production API and performs the one-shot login.
    pub async fn new(credentials: BankCredentials) -> Result<Self> {
        Self::with_base_url(credentials, API_BASE).await
    }

    /// Same as [`BmesProvider::new`] against an alternative API base.
    pub async fn with_base_url(credentials: BankCredentials, base_url: &str) -> Result<Self> {
        if credentials.user_id.trim().is_empty() || credentials.password.trim().is_empty() {
            return Err(ConnectorError::MissingCredentials(
                "user id and password are required".into(),
            ));
        }
        let base = Url::parse(base_url)
            .map_err(|e| ConnectorError::InvalidConfiguration(e.to_string()))?;
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ConnectorError::InvalidConfiguration(format!(
                    "base URL {} has no host",
                    base_url
                )))
            }
        };

        let provider = Self {
            session: Session::new(default_headers(&host)?)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        provider
            .login(&normalize_user_id(&credentials.user_id), &credentials.password)
            .await?;
        Ok(provider)
    }

    /// One-shot login exchange; session state lands in the cookie store.
    /// The body is not inspected: a non-error HTTP result counts as
    /// success, and a bad login only surfaces on the first data fetch.
    async fn login(&self, user: &str, password: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        let fields = [
            ("origen", "enpp"),
            ("eai_tipoCP", "up"),
            ("eai_user", user),
            ("eai_password", password),
        ];
        self.session.post_form(&url, &fields).await?;
        Ok(())
    }

    fn movements_url(&self, account_id: &str, start: NaiveDate, cursor: &PageCursor) -> String {
        // fromDate only: adding a toDate filter makes the server drop the
        // balance field from every movement in the response.
        let mut url = format!(
            "{}{}/{}/movements/v1?fromDate={}",
            self.base_url,
            ACCOUNTS_PATH,
            account_id,
            start.format(DATE_FORMAT)
        );
        cursor.append_to(&mut url);
        url
    }
}

#[async_trait]
impl BankConnector for BmesProvider {
    fn bank(&self) -> &'static str {
        BANK_BMES
    }

    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        let url = format!("{}{}", self.base_url, PRODUCTS_PATH);
        let body = self.session.post(&url, read_override_headers()).await?;
        let products: ProductsResponse = serde_json::from_str(&body)?;
        debug!("fetched {} accounts", products.accounts.len());
        products.accounts.iter().map(RawAccount::to_account).collect()
    }

    async fn fetch_transactions(
        &self,
        account: &Account,
        range: Option<DateRange>,
    ) -> Result<Vec<Transaction>> {
        let range = range.unwrap_or_default();
        let mut cursor = PageCursor::default();
        let mut transactions = Vec::new();

        loop {
            let url = self.movements_url(&account.id, range.start, &cursor);
            let body = self.session.post(&url, read_override_headers()).await?;
            let page: MovementsPage = serde_json::from_str(&body)?;
            debug!("fetched {} movements", page.movements.len());

            for movement in &page.movements {
                let transaction = movement.to_transaction(&account.id)?;
                if transaction.effective_date <= range.end {
                    transactions.push(transaction);
                }
            }

            // The server's flag is authoritative: a page whose filtered
            // results came up empty must not stop the cursor walk, and the
            // cursor still advances on pages without movements.
            cursor.advance(&page);
            if page.there_are_more_movements != Some(true) {
                break;
            }
        }

        Ok(transactions)
    }
}

// === Response structs ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductsResponse {
    #[serde(default)]
    accounts: Vec<RawAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccount {
    id: String,
    name: String,
    balance: Decimal,
    currency: String,
    iban: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovementsPage {
    #[serde(default)]
    movements: Vec<RawMovement>,
    offset: Option<String>,
    pagination_balance: Option<String>,
    there_are_more_movements: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMovement {
    id: String,
    operation_date: String,
    amount: Decimal,
    currency: String,
    concept_description: Option<String>,
    description: Option<String>,
    balance: Option<Decimal>,
}

// === Converters ===

impl RawAccount {
    fn to_account(&self) -> Result<Account> {
        let balance = Money::new(to_minor_units(self.balance)?, self.currency.clone());
        Ok(Account::new(
            BANK_BMES.to_string(),
            self.id.clone(),
            self.name.clone(),
            balance.clone(),
            balance,
            self.currency.clone(),
            self.iban.clone(),
            format!("{} ({})", self.name, self.iban),
        ))
    }
}

impl RawMovement {
    fn to_transaction(&self, account_id: &str) -> Result<Transaction> {
        let effective_date = NaiveDate::parse_from_str(&self.operation_date, DATE_FORMAT)?;
        let amount = Money::new(to_minor_units(self.amount)?, self.currency.clone());
        let description = self
            .concept_description
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_default();
        let balance = match self.balance {
            Some(value) => Some(Money::new(to_minor_units(value)?, self.currency.clone())),
            None => None,
        };
        Ok(Transaction::new(
            account_id.to_string(),
            self.id.clone(),
            amount,
            description,
            effective_date,
            self.currency.clone(),
            balance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn movement(value: serde_json::Value) -> RawMovement {
        serde_json::from_value(value).unwrap()
    }

    fn page(value: serde_json::Value) -> MovementsPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_national_id_numbers() {
        assert_eq!(normalize_user_id("12345678z"), "0019-012345678Z");
        assert_eq!(normalize_user_id("12345678Z"), "0019-012345678Z");
        assert_eq!(normalize_user_id("00000000a"), "0019-000000000A");
    }

    #[test]
    fn other_identifiers_are_only_uppercased() {
        assert_eq!(normalize_user_id("usuario77"), "USUARIO77");
        assert_eq!(normalize_user_id("1234567z"), "1234567Z");
        assert_eq!(normalize_user_id("123456789"), "123456789");
        assert_eq!(normalize_user_id("12345678zz"), "12345678ZZ");
        assert_eq!(normalize_user_id(""), "");
    }

    #[test]
    fn amounts_scale_to_minor_units() {
        assert_eq!(to_minor_units(dec!(12.34)).unwrap(), 1234);
        assert_eq!(to_minor_units(dec!(-0.01)).unwrap(), -1);
        assert_eq!(to_minor_units(dec!(0.0)).unwrap(), 0);
    }

    #[test]
    fn movements_prefer_the_concept_description() {
        let raw = movement(json!({
            "id": "m1",
            "operationDate": "2026-03-05",
            "amount": 12.34,
            "currency": "EUR",
            "conceptDescription": "Compra tarjeta",
            "description": "Operacion"
        }));
        let transaction = raw.to_transaction("ES123").unwrap();
        assert_eq!(transaction.description, "Compra tarjeta");
        assert_eq!(transaction.amount, Money::new(1234, "EUR".to_string()));

        let raw = movement(json!({
            "id": "m2",
            "operationDate": "2026-03-05",
            "amount": 1.0,
            "currency": "EUR",
            "description": "Operacion"
        }));
        assert_eq!(raw.to_transaction("ES123").unwrap().description, "Operacion");
    }

    #[test]
    fn absent_balance_stays_absent() {
        let raw = movement(json!({
            "id": "m1",
            "operationDate": "2026-03-05",
            "amount": -5.5,
            "currency": "EUR",
            "description": "Recibo"
        }));
        let transaction = raw.to_transaction("ES123").unwrap();
        assert_eq!(transaction.balance, None);

        let raw = movement(json!({
            "id": "m2",
            "operationDate": "2026-03-05",
            "amount": -5.5,
            "currency": "EUR",
            "description": "Recibo",
            "balance": 0.0
        }));
        let transaction = raw.to_transaction("ES123").unwrap();
        assert_eq!(transaction.balance, Some(Money::new(0, "EUR".to_string())));
    }

    #[test]
    fn malformed_operation_dates_are_fatal() {
        let raw = movement(json!({
            "id": "m1",
            "operationDate": "05/03/2026",
            "amount": 1.0,
            "currency": "EUR"
        }));
        let err = raw.to_transaction("ES123").unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidApiResponse(_)));
    }

    #[test]
    fn cursor_forwards_returned_tokens_and_drops_omitted_ones() {
        let mut cursor = PageCursor::default();

        cursor.advance(&page(json!({ "offset": "A", "thereAreMoreMovements": true })));
        assert_eq!(cursor.offset.as_deref(), Some("A"));
        assert_eq!(cursor.pagination_balance, None);

        cursor.advance(&page(json!({ "offset": "B", "paginationBalance": "X" })));
        assert_eq!(cursor.offset.as_deref(), Some("B"));
        assert_eq!(cursor.pagination_balance.as_deref(), Some("X"));

        // an omitted token is dropped, not reused from the earlier page
        cursor.advance(&page(json!({ "paginationBalance": "Y" })));
        assert_eq!(cursor.offset, None);
        assert_eq!(cursor.pagination_balance.as_deref(), Some("Y"));

        cursor.advance(&page(json!({})));
        assert_eq!(cursor, PageCursor::default());
    }

    #[test]
    fn cursor_tokens_are_echoed_into_the_url() {
        let cursor = PageCursor {
            offset: Some("a b".to_string()),
            pagination_balance: Some("X/1".to_string()),
        };
        let mut url = String::from("base?fromDate=2026-03-01");
        cursor.append_to(&mut url);
        assert_eq!(
            url,
            "base?fromDate=2026-03-01&offset=a%20b&paginationBalance=X%2F1"
        );
    }

    #[test]
    fn pages_tolerate_missing_fields() {
        let page = page(json!({}));
        assert!(page.movements.is_empty());
        assert_eq!(page.there_are_more_movements, None);
        assert_eq!(page.offset, None);
        assert_eq!(page.pagination_balance, None);
    }
}
