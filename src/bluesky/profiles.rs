// Identity resolution — account DID to human-readable handle.
//
// Resolution never fails from the caller's point of view: on any error the
// DID itself is returned as the display identity.

use async_trait::async_trait;
use tracing::warn;

use super::client::PublicAtpClient;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve an account id to its handle, falling back to the id.
    async fn resolve(&self, account_id: &str) -> String;
}

#[async_trait]
impl IdentityResolver for PublicAtpClient {
    async fn resolve(&self, account_id: &str) -> String {
        match self.get_handle(account_id).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(account = account_id, error = %e, "Failed to resolve handle, using DID");
                account_id.to_string()
            }
        }
    }
}

/// Resolver that skips the network and uses the account id as the handle.
pub struct PassthroughResolver;

#[async_trait]
impl IdentityResolver for PassthroughResolver {
    async fn resolve(&self, account_id: &str) -> String {
        account_id.to_string()
    }
}
