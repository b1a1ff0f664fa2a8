// Module declarations
pub(crate) mod banks;
pub(crate) mod connector_factory;
pub(crate) mod connector_provider;

// Re-export the public interface
pub use banks::bmes_provider::{BmesProvider, BANK_BMES};
pub use connector_factory::ConnectorFactory;
pub use connector_provider::{BankConnector, BankCredentials, DateRange};

// Re-export error types for convenience
pub use connector_provider::{ConnectorError, Result};
