//! Interaction gateway.
//!
//! The HTTP surface of the service: a signed webhook endpoint that receives
//! interaction payloads, routes them through the management, dynamic-command,
//! autocomplete and modal handlers, and an authenticated admin surface for
//! registry resets and guild policy.

pub mod admin;
pub mod autocomplete;
pub mod defer;
pub mod dynamic;
pub mod manage;
pub mod modal;
pub mod router;
pub mod server;
pub mod verify;

use std::sync::Arc;

use makro_registry::CommandRegistry;
use makro_store::MakroStore;

use crate::admin::AdminAuth;

/// Shared state behind every handler.
pub struct AppState {
    pub store: Arc<MakroStore>,
    pub registry: Arc<dyn CommandRegistry>,
    /// Raw 32-byte webhook verification key.
    pub public_key: Vec<u8>,
    pub admin: AdminAuth,
}
