//! Seam between a plug and the network gateway that commands it

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use domain::DomainError;
use domain::event::EventPublisher;
use domain::plug::PlugConfig;

use crate::plug::Plug;

/// One plug's connection to the gateway
#[async_trait]
pub trait GatewaySession: Send + Sync {
    /// Where the plug reports its state
    fn publisher(&self) -> Arc<dyn EventPublisher>;

    /// Deliver inbound commands to `plug` until cancelled or the session is lost
    async fn serve(&self, plug: Arc<Plug>, cancel_token: CancellationToken);

    /// Disconnect, flushing anything already queued
    async fn close(&self);
}

/// Opens gateway sessions for plugs
pub trait GatewayConnector: Send + Sync {
    fn open(&self, config: &PlugConfig) -> Result<Box<dyn GatewaySession>, DomainError>;
}
