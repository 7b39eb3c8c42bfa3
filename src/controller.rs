//! Naming and identification shared by database connectors

use crate::database_url::DatabaseUrl;

/// A named connector bound to one connection descriptor
pub trait DbController {
    /// Connector name, used to tell connectors apart in logs and configuration
    fn name(&self) -> &str;

    /// Connection descriptor this connector talks to
    fn url(&self) -> &DatabaseUrl;

    /// Driver name of the descriptor
    fn drivername(&self) -> &str {
        self.url().drivername()
    }
}
