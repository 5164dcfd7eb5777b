/// Core error type for the bot.
///
/// Adapter crates map their transport failures into this type so handlers can
/// log failures consistently at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to fetch members from the channel: {0}")]
    MembershipFetch(String),

    #[error("members cache is empty")]
    MembershipUnavailable,

    #[error("failed to invite user to the channel: {0}")]
    Invite(String),

    #[error("failed to kick user from the channel: {0}")]
    Kick(String),

    #[error("dm cleanup failed: {0}")]
    DmCleanup(String),

    /// The platform answered but reported `ok: false`.
    #[error("slack api error: {method}: {error}")]
    Api { method: String, error: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
