pub mod error;
pub mod i18n;
pub mod interaction;
pub mod name;
pub mod response;

pub use error::{MakroError, MakroResult, PolicyKind, ValidationKind};
pub use interaction::{
    CommandOption, Interaction, InteractionData, InteractionKind, Member, ModalComponent,
    ModalRow, User, has_manage_guild, parse_loose_bool, parse_visibility,
};
pub use name::{MANAGEMENT_COMMAND, MAX_NAME_LEN, is_reserved, normalize};
pub use response::{Choice, EPHEMERAL, InteractionResponse, MAX_CONTENT_LEN, ModalPrefill};
