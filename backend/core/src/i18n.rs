//! User-facing message catalog.
//!
//! Interaction replies are localized against the locale tag the platform
//! attaches to each request: exact match first, then bare language, then the
//! `en-US` fallback. Messages may carry `{placeholder}` variables filled in
//! by [`tf`].

/// Locales with a translated catalog. Everything else falls back to `EnUs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    EnUs,
    De,
    Fr,
    Es,
}

impl Locale {
    /// Resolve a platform locale tag (`de`, `fr`, `es-ES`, `en-GB`, ...).
    pub fn resolve(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::EnUs;
        };
        let lower = tag.to_lowercase();
        let language = lower.split('-').next().unwrap_or("");
        match language {
            "de" => Self::De,
            "fr" => Self::Fr,
            "es" => Self::Es,
            _ => Self::EnUs,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::EnUs => 0,
            Self::De => 1,
            Self::Fr => 2,
            Self::Es => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    GuildOnly,
    ManageRequired,
    ChatInputOnly,
    InvalidName,
    ReservedName,
    ReplyRequired,
    InvalidVisibility,
    NotFound,
    NameInUse,
    Banned,
    LimitReached,
    UnknownCommand,
    RoleDenied,
    NoCommands,
    UnsupportedInteraction,
    UnsupportedModal,
    ErrorTryAgain,
    Added,
    Updated,
    UpdatedRenamed,
    Removed,
    SavedSyncFailed,
    RenameSyncFailed,
}

// [en-US, de, fr, es]
fn entry(key: Msg) -> [&'static str; 4] {
    match key {
        Msg::GuildOnly => [
            "Use this in a server.",
            "Nutze das in einem Server.",
            "Utilise ceci dans un serveur.",
            "Usa esto en un servidor.",
        ],
        Msg::ManageRequired => [
            "Manage Server required.",
            "Server verwalten erforderlich.",
            "Permission Gérer le serveur requise.",
            "Se requiere Gestionar servidor.",
        ],
        Msg::ChatInputOnly => [
            "Use chat input commands.",
            "Nutze Chat-Eingabe-Befehle.",
            "Utilise des commandes de saisie de texte.",
            "Usa comandos de entrada de chat.",
        ],
        Msg::InvalidName => [
            "Provide a valid name.",
            "Gib einen gültigen Namen an.",
            "Fournis un nom valide.",
            "Proporciona un nombre válido.",
        ],
        Msg::ReservedName => [
            "That name is reserved.",
            "Dieser Name ist reserviert.",
            "Ce nom est réservé.",
            "Ese nombre está reservado.",
        ],
        Msg::ReplyRequired => [
            "Reply is required.",
            "Eine Antwort ist erforderlich.",
            "Une réponse est requise.",
            "Se requiere una respuesta.",
        ],
        Msg::InvalidVisibility => [
            "Invalid visibility. Use public or ephemeral.",
            "Ungültige Sichtbarkeit. Nutze public oder ephemeral.",
            "Visibilité invalide. Utilise public ou ephemeral.",
            "Visibilidad no válida. Usa public o ephemeral.",
        ],
        Msg::NotFound => [
            "Command not found.",
            "Befehl nicht gefunden.",
            "Commande introuvable.",
            "Comando no encontrado.",
        ],
        Msg::NameInUse => [
            "That name is already in use.",
            "Dieser Name wird bereits verwendet.",
            "Ce nom est déjà utilisé.",
            "Ese nombre ya está en uso.",
        ],
        Msg::Banned => [
            "This server is banned.",
            "Dieser Server ist gesperrt.",
            "Ce serveur est banni.",
            "Este servidor está baneado.",
        ],
        Msg::LimitReached => [
            "Limit reached ({max}). Delete some first.",
            "Limit erreicht ({max}). Lösche zuerst einige.",
            "Limite atteinte ({max}). Supprime d'abord quelques commandes.",
            "Límite alcanzado ({max}). Elimina algunos primero.",
        ],
        Msg::UnknownCommand => [
            "Unknown command. Use /makro add to create it.",
            "Unbekannter Befehl. Nutze /makro add, um ihn zu erstellen.",
            "Commande inconnue. Utilise /makro add pour la créer.",
            "Comando desconocido. Usa /makro add para crearlo.",
        ],
        Msg::RoleDenied => [
            "You need one of the allowed roles to use this command.",
            "Du brauchst eine der erlaubten Rollen für diesen Befehl.",
            "Il te faut l'un des rôles autorisés pour cette commande.",
            "Necesitas uno de los roles permitidos para este comando.",
        ],
        Msg::NoCommands => [
            "No custom commands yet.",
            "Noch keine eigenen Befehle.",
            "Pas encore de commandes personnalisées.",
            "Aún no hay comandos personalizados.",
        ],
        Msg::UnsupportedInteraction => [
            "Unsupported interaction.",
            "Nicht unterstützte Interaktion.",
            "Interaction non prise en charge.",
            "Interacción no compatible.",
        ],
        Msg::UnsupportedModal => [
            "Unsupported modal.",
            "Nicht unterstütztes Formular.",
            "Formulaire non pris en charge.",
            "Formulario no compatible.",
        ],
        Msg::ErrorTryAgain => [
            "Something went wrong. Please try again.",
            "Etwas ist schiefgelaufen. Bitte versuche es erneut.",
            "Une erreur s'est produite. Réessaie.",
            "Algo salió mal. Inténtalo de nuevo.",
        ],
        Msg::Added => ["/{name} added.", "/{name} hinzugefügt.", "/{name} ajoutée.", "/{name} añadido."],
        Msg::Updated => [
            "/{name} updated.",
            "/{name} aktualisiert.",
            "/{name} mise à jour.",
            "/{name} actualizado.",
        ],
        Msg::UpdatedRenamed => [
            "/{name} updated (was /{old}).",
            "/{name} aktualisiert (vorher /{old}).",
            "/{name} mise à jour (anciennement /{old}).",
            "/{name} actualizado (antes /{old}).",
        ],
        Msg::Removed => ["Removed /{name}.", "/{name} entfernt.", "/{name} supprimée.", "/{name} eliminado."],
        Msg::SavedSyncFailed => [
            "Saved, but registry sync failed: {reason}",
            "Gespeichert, aber die Registrierung ist fehlgeschlagen: {reason}",
            "Enregistré, mais la synchronisation a échoué : {reason}",
            "Guardado, pero falló la sincronización: {reason}",
        ],
        Msg::RenameSyncFailed => [
            "Failed to register the new name: {reason}",
            "Der neue Name konnte nicht registriert werden: {reason}",
            "Impossible d'enregistrer le nouveau nom : {reason}",
            "No se pudo registrar el nuevo nombre: {reason}",
        ],
    }
}

/// Look up a message for a locale.
pub fn t(locale: Locale, key: Msg) -> &'static str {
    entry(key)[locale.index()]
}

/// Look up a message and substitute `{var}` placeholders.
pub fn tf(locale: Locale, key: Msg, vars: &[(&str, &str)]) -> String {
    let mut message = t(locale, key).to_string();
    for (var, value) in vars {
        message = message.replace(&format!("{{{var}}}"), value);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_and_language_prefix() {
        assert_eq!(Locale::resolve(Some("de")), Locale::De);
        assert_eq!(Locale::resolve(Some("fr-FR")), Locale::Fr);
        assert_eq!(Locale::resolve(Some("es-419")), Locale::Es);
    }

    #[test]
    fn unknown_tags_fall_back_to_english() {
        assert_eq!(Locale::resolve(Some("ja")), Locale::EnUs);
        assert_eq!(Locale::resolve(None), Locale::EnUs);
        assert_eq!(t(Locale::resolve(Some("ja")), Msg::NotFound), "Command not found.");
    }

    #[test]
    fn substitutes_variables() {
        let message = tf(Locale::EnUs, Msg::UpdatedRenamed, &[("name", "new"), ("old", "old")]);
        assert_eq!(message, "/new updated (was /old).");
    }

    #[test]
    fn localizes_when_available() {
        assert_eq!(t(Locale::De, Msg::Banned), "Dieser Server ist gesperrt.");
    }
}
