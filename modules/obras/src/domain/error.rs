use clientkit::{ApiError, ErrorKind, SessionError};
use thiserror::Error;

use crate::domain::messages;

/// Screen action that triggered a remote call; selects the message shown on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    ListWorks,
    LoadWork,
    CreateWork,
    UpdateWork,
    WorkDetail,
    CreateSubgroup,
    CreatePart,
    PartDetail,
    SaveExpense,
    DeleteExpense,
    Receipt,
    ListUsers,
    LoadUser,
    UserDetail,
    RegisterUser,
    UpdateUser,
    ChangePassword,
    DeleteUser,
}

impl Action {
    /// Static message for a failed call. Session expiry wins over everything
    /// else; login and delete-user distinguish statuses, and a 403 anywhere
    /// else is reported as not permitted.
    pub fn failure_message(self, err: &ApiError) -> &'static str {
        if matches!(err, ApiError::SessionExpired(_)) {
            return messages::SESSION_EXPIRED;
        }

        match self {
            Action::Login => match err {
                ApiError::Unauthorized => messages::LOGIN_BAD_CREDENTIALS,
                ApiError::Transport(_) => messages::SERVER_UNREACHABLE,
                e if e.status() == Some(500) => messages::LOGIN_SERVER_ERROR,
                _ => messages::LOGIN_UNKNOWN,
            },
            Action::DeleteUser => match err.status() {
                Some(400) => messages::DELETE_USER_HAS_WORKS,
                Some(403) => messages::DELETE_USER_FORBIDDEN,
                _ => messages::DELETE_USER_UNEXPECTED,
            },
            _ if err.kind() == ErrorKind::Transport => messages::SERVER_UNREACHABLE,
            _ if err.kind() == ErrorKind::Authorization => messages::FORBIDDEN,
            Action::ListWorks => messages::LIST_WORKS_FAILED,
            Action::LoadWork => messages::LOAD_WORK_FAILED,
            Action::CreateWork => messages::CREATE_WORK_FAILED,
            Action::UpdateWork => messages::UPDATE_WORK_FAILED,
            Action::WorkDetail => messages::WORK_DETAIL_FAILED,
            Action::CreateSubgroup => messages::CREATE_SUBGROUP_FAILED,
            Action::CreatePart => messages::CREATE_PART_FAILED,
            Action::PartDetail => messages::PART_DETAIL_FAILED,
            Action::SaveExpense => messages::SAVE_EXPENSE_FAILED,
            Action::DeleteExpense => messages::DELETE_EXPENSE_FAILED,
            Action::Receipt => messages::RECEIPT_FAILED,
            Action::ListUsers => messages::LIST_USERS_FAILED,
            Action::LoadUser => messages::LOAD_USER_FAILED,
            Action::UserDetail => messages::USER_DETAIL_FAILED,
            Action::RegisterUser => messages::REGISTER_USER_FAILED,
            Action::UpdateUser => messages::UPDATE_USER_FAILED,
            Action::ChangePassword => messages::PASSWORD_CHANGE_FAILED,
        }
    }
}

/// Errors surfaced by the screens. `Display` is the localized message.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{}", messages::NOT_SIGNED_IN)]
    NotSignedIn,

    #[error("{}", messages::ADMIN_ONLY)]
    AdminOnly,

    #[error("{}", messages::FILL_ALL_FIELDS)]
    MissingFields { fields: Vec<&'static str> },

    #[error("{}", messages::END_BEFORE_START)]
    EndBeforeStart,

    #[error("{}", messages::DELETE_ADMIN_REJECTED)]
    CannotDeleteAdmin,

    #[error("{}", messages::EDIT_OTHER_USER)]
    CannotEditOtherUser,

    #[error("{}", messages::VIEW_OTHER_USER)]
    CannotViewOtherUser,

    #[error("{}", messages::EXPENSE_NOT_OWNED)]
    ExpenseNotOwned { expense_id: i64 },

    #[error("{}", messages::PASSWORD_MISMATCH)]
    PasswordMismatch,

    #[error("{}", messages::EXPENSE_DATE_IN_FUTURE)]
    ExpenseDateInFuture,

    #[error("{}", messages::RECEIPT_BAD_TYPE)]
    UnsupportedReceipt { file_name: String },

    #[error("{}", messages::RECEIPT_MISSING)]
    NoReceipt { expense_id: i64 },

    #[error("{}", messages::LOGOUT_FAILED)]
    Session(#[source] SessionError),

    /// A remote call failed; `message` was picked from the action and the error.
    #[error("{message}")]
    Api {
        action: Action,
        message: &'static str,
        #[source]
        source: ApiError,
    },
}

impl DomainError {
    pub fn api(action: Action, source: ApiError) -> Self {
        Self::Api {
            action,
            message: action.failure_message(&source),
            source,
        }
    }

    pub fn missing_fields(fields: Vec<&'static str>) -> Self {
        Self::MissingFields { fields }
    }

    /// The session is gone and the user must log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, DomainError::NotSignedIn)
            || matches!(
                self,
                DomainError::Api {
                    source: ApiError::SessionExpired(_),
                    ..
                }
            )
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DomainError::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}
