// Builds the reqwest clients used for release checks, registry lookups,
// oracles and local node RPC.

use crate::error::Result;
use nodevin_sdk::NodevinPackage;
use reqwest::Client;

pub struct HttpClientFactory;

impl HttpClientFactory {
    fn user_agent() -> String {
        format!("{}/{}", NodevinPackage::BINARY_NAME, NodevinPackage::VERSION)
    }

    /// Client for public endpoints. Proxy settings come from the environment.
    pub fn create_client() -> Result<Client> {
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(client)
    }

    /// Client for node RPC on the loopback interface; never goes through a proxy.
    pub fn create_local_client() -> Result<Client> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .no_proxy()
            .build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_build() {
        assert!(HttpClientFactory::create_client().is_ok());
        assert!(HttpClientFactory::create_local_client().is_ok());
    }

    #[test]
    fn user_agent_has_version() {
        assert!(HttpClientFactory::user_agent().starts_with("nodevin/"));
    }
}
