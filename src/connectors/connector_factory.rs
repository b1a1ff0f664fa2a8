use log::debug;
use std::sync::Arc;

use crate::connectors::banks::bmes_provider::{BmesProvider, BANK_BMES};
use crate::connectors::connector_provider::{BankConnector, BankCredentials, ConnectorError};

pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Builds and logs in the driver for the credentials' bank code.
    pub async fn from_credentials(
        credentials: BankCredentials,
    ) -> Result<Arc<dyn BankConnector>, ConnectorError> {
        debug!("Creating connector for bank {}", credentials.bank);
        match credentials.bank.as_str() {
            BANK_BMES => Ok(Arc::new(BmesProvider::new(credentials).await?)),
            "" => Err(ConnectorError::MissingBankCode),
            other => Err(ConnectorError::UnsupportedBank(other.to_string())),
        }
    }
}
