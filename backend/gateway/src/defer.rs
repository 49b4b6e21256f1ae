//! Deferred completion.
//!
//! Slow work is acked immediately with a deferred response, then finished in
//! a background task that edits the original response through the interaction
//! token. Errors inside the task go through the same message boundary as
//! immediate replies, so the user always sees something.

use std::future::Future;
use std::sync::Arc;

use tracing::error;

use makro_core::i18n::Locale;
use makro_core::{InteractionResponse, MakroResult};

use crate::{AppState, router};

/// Ack with a deferred ephemeral response and complete `work` out-of-band.
pub fn respond_deferred<F>(
    state: &Arc<AppState>,
    locale: Locale,
    token: String,
    work: F,
) -> InteractionResponse
where
    F: Future<Output = MakroResult<String>> + Send + 'static,
{
    let registry = state.registry.clone();
    tokio::spawn(async move {
        let content = match work.await {
            Ok(content) => content,
            Err(err) => router::error_message(locale, &err),
        };
        if let Err(err) = registry.edit_original(&token, &content).await {
            error!(error = %err, "failed to deliver deferred completion");
        }
    });
    InteractionResponse::deferred(true)
}
