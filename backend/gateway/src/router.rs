//! Interaction dispatch.
//!
//! Maps each inbound interaction shape onto its handler and converts handler
//! errors into localized ephemeral messages at this single boundary, so no
//! raw error text ever reaches the platform.

use std::sync::Arc;

use tracing::{error, warn};

use makro_core::i18n::{self, Locale, Msg};
use makro_core::{
    Interaction, InteractionKind, InteractionResponse, MANAGEMENT_COMMAND, MakroError, PolicyKind,
    ValidationKind,
};

use crate::{AppState, autocomplete, dynamic, manage, modal};

/// Route one verified interaction to a response.
pub async fn route(state: &Arc<AppState>, interaction: Interaction) -> InteractionResponse {
    let locale = Locale::resolve(interaction.locale_tag());
    let result = dispatch(state, interaction).await;
    match result {
        Ok(response) => response,
        Err(err) => InteractionResponse::message(error_message(locale, &err), true),
    }
}

async fn dispatch(
    state: &Arc<AppState>,
    interaction: Interaction,
) -> Result<InteractionResponse, MakroError> {
    let locale = Locale::resolve(interaction.locale_tag());
    match interaction.kind() {
        InteractionKind::Ping => Ok(InteractionResponse::pong()),
        InteractionKind::ApplicationCommand => {
            if interaction.command_name() == Some(MANAGEMENT_COMMAND) {
                manage::handle(state, interaction).await
            } else {
                dynamic::handle(state, interaction).await
            }
        }
        InteractionKind::Autocomplete => autocomplete::handle(state, interaction).await,
        InteractionKind::ModalSubmit => modal::handle(state, interaction).await,
        InteractionKind::Unknown(raw) => {
            warn!(raw, "unsupported interaction type");
            Ok(InteractionResponse::message(i18n::t(locale, Msg::UnsupportedInteraction), true))
        }
    }
}

/// Localized user-facing text for a handler error. Infrastructure failures
/// are logged here and collapse to a generic retry message.
pub fn error_message(locale: Locale, err: &MakroError) -> String {
    match err {
        MakroError::Validation(kind) => {
            let key = match kind {
                ValidationKind::GuildOnly => Msg::GuildOnly,
                ValidationKind::Name => Msg::InvalidName,
                ValidationKind::ReservedName => Msg::ReservedName,
                ValidationKind::Reply => Msg::ReplyRequired,
                ValidationKind::Visibility => Msg::InvalidVisibility,
                ValidationKind::UnsupportedModal => Msg::UnsupportedModal,
            };
            i18n::t(locale, key).to_string()
        }
        MakroError::Policy(kind) => match kind {
            PolicyKind::Banned => i18n::t(locale, Msg::Banned).to_string(),
            PolicyKind::LimitReached(max) => {
                i18n::tf(locale, Msg::LimitReached, &[("max", &max.to_string())])
            }
            PolicyKind::ManageRequired => i18n::t(locale, Msg::ManageRequired).to_string(),
            PolicyKind::RoleDenied => i18n::t(locale, Msg::RoleDenied).to_string(),
        },
        MakroError::NotFound => i18n::t(locale, Msg::NotFound).to_string(),
        MakroError::Conflict => i18n::t(locale, Msg::NameInUse).to_string(),
        MakroError::RemoteSync(reason) => {
            i18n::tf(locale, Msg::SavedSyncFailed, &[("reason", reason)])
        }
        MakroError::Authentication | MakroError::Storage(_) | MakroError::Internal(_) => {
            error!(error = %err, "interaction handling failed");
            i18n::t(locale, Msg::ErrorTryAgain).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;

    fn parse(json: serde_json::Value) -> Interaction {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let (state, _) = test_state();
        let response = route(&state, parse(serde_json::json!({ "type": 1 }))).await;
        assert_eq!(response.kind, makro_core::response::response_type::PONG);
    }

    #[tokio::test]
    async fn unknown_type_is_rejected_politely() {
        let (state, _) = test_state();
        let response = route(&state, parse(serde_json::json!({ "type": 3 }))).await;
        let data = response.data.unwrap();
        assert_eq!(data["content"], serde_json::json!("Unsupported interaction."));
    }

    #[tokio::test]
    async fn errors_become_localized_ephemeral_messages() {
        let (state, _) = test_state();
        // Management command outside a guild, German locale.
        let response = route(
            &state,
            parse(serde_json::json!({
                "type": 2,
                "locale": "de",
                "data": { "name": "makro", "options": [{ "name": "add", "type": 1 }] }
            })),
        )
        .await;
        let data = response.data.unwrap();
        assert_eq!(data["content"], serde_json::json!("Nutze das in einem Server."));
        assert_eq!(data["flags"], serde_json::json!(makro_core::EPHEMERAL));
    }

    #[test]
    fn limit_error_carries_the_quota() {
        let message = error_message(Locale::EnUs, &MakroError::Policy(PolicyKind::LimitReached(5)));
        assert_eq!(message, "Limit reached (5). Delete some first.");
    }

    #[test]
    fn sync_failure_carries_the_reason() {
        let message = error_message(Locale::EnUs, &MakroError::RemoteSync("registry returned 500".into()));
        assert_eq!(message, "Saved, but registry sync failed: registry returned 500");
    }
}
