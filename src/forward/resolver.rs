//! Channel lookup with logged failures.

use tracing::{debug, error};

use super::{ChannelGateway, ChannelHandle};
use crate::telegram::ChannelRef;

/// Resolves `identifier` to a channel.
///
/// Any failure (bad identifier, not found, no access, transport error) is
/// logged and yields `None`; callers treat that as fatal for the current
/// operation.
pub async fn resolve<G: ChannelGateway>(gateway: &G, identifier: &str) -> Option<G::Channel> {
    let reference: ChannelRef = match identifier.parse() {
        Ok(reference) => reference,
        Err(e) => {
            error!("Could not resolve '{}': {}", identifier, e);
            return None;
        }
    };

    match gateway.resolve_channel(&reference).await {
        Ok(channel) => {
            debug!(
                "Resolved {} to \"{}\" ({})",
                reference,
                channel.title(),
                channel.dialog_id()
            );
            Some(channel)
        }
        Err(e) => {
            error!("Could not resolve {}: {}", reference, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::testing::FakeGateway;

    #[tokio::test]
    async fn test_resolve_known_channel() {
        let gateway = FakeGateway::new().with_channel("src", -1001, "Source");
        let channel = resolve(&gateway, "@src").await.unwrap();
        assert_eq!(channel.dialog_id(), -1001);
        assert_eq!(channel.title(), "Source");

        let by_id = resolve(&gateway, "-1001").await.unwrap();
        assert_eq!(by_id.title(), "Source");
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_none() {
        let gateway = FakeGateway::new();
        assert!(resolve(&gateway, "@missing").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_bad_identifier_skips_gateway() {
        let gateway = FakeGateway::new();
        assert!(resolve(&gateway, "not a handle").await.is_none());
        assert!(resolve(&gateway, "").await.is_none());
        assert_eq!(gateway.resolve_calls(), 0);
    }
}
