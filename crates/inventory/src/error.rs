use droidsync_bridge::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Failed to fetch list of packages: {0}")]
    Listing(#[source] ChannelError),
    #[error("Label resolver pool is shut down")]
    ResolverClosed,
}
