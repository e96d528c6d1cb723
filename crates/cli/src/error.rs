use pledge_session::SessionError;
use uuid::Uuid;

/// Ways a command ends without success.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("deal not submitted: confirmation declined")]
    UserDeclined,

    #[error("deal {deal_uuid} rejected by provider: {message}")]
    Rejected { deal_uuid: Uuid, message: String },

    #[error("{kind}: {err}", kind = .0.kind(), err = .0)]
    Session(#[from] SessionError),

    #[error("invalid {field} {input:?}: {reason}")]
    InvalidArgument { field: &'static str, input: String, reason: String },
}
