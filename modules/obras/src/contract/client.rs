use async_trait::async_trait;
use clientkit::{ApiError, TokenPair};

use crate::contract::model::{
    Credentials, Expense, ExpenseInput, NewPart, NewSubgroup, NewUser, NewWork, Part,
    PasswordChange, ReceiptLink, Subgroup, User, UserDetail, UserPatch, Work,
};

/// Remote obras API, one method per endpoint the screens use.
///
/// The HTTP gateway is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait ObrasApi: Send + Sync {
    /// `POST /users/login`; bypasses the refresh interceptor.
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;

    async fn list_works(&self) -> Result<Vec<Work>, ApiError>;
    async fn get_work(&self, id: i64) -> Result<Work, ApiError>;
    async fn create_work(&self, work: &NewWork) -> Result<(), ApiError>;
    async fn update_work(&self, id: i64, work: &NewWork) -> Result<(), ApiError>;

    async fn list_subgroups(&self, work_id: i64, page: u32, limit: u32)
        -> Result<Vec<Subgroup>, ApiError>;
    async fn create_subgroup(&self, work_id: i64, subgroup: &NewSubgroup) -> Result<(), ApiError>;

    async fn list_parts(&self, work_id: i64, page: u32, limit: u32) -> Result<Vec<Part>, ApiError>;
    async fn get_part(&self, id: i64) -> Result<Part, ApiError>;
    async fn create_part(&self, work_id: i64, part: &NewPart) -> Result<(), ApiError>;

    async fn list_expenses(&self, part_id: i64) -> Result<Vec<Expense>, ApiError>;
    async fn create_expense(&self, part_id: i64, expense: &ExpenseInput) -> Result<(), ApiError>;
    async fn update_expense(&self, id: i64, expense: &ExpenseInput) -> Result<(), ApiError>;
    async fn delete_expense(&self, id: i64) -> Result<(), ApiError>;
    async fn receipt_link(&self, expense_id: i64) -> Result<ReceiptLink, ApiError>;
    /// Fetch a signed URL without API credentials.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError>;

    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    async fn get_user(&self, id: i64) -> Result<UserDetail, ApiError>;
    async fn register_user(&self, user: &NewUser) -> Result<(), ApiError>;
    async fn update_user(&self, id: i64, patch: &UserPatch) -> Result<(), ApiError>;
    async fn change_password(&self, id: i64, change: &PasswordChange) -> Result<(), ApiError>;
    async fn delete_user(&self, id: i64) -> Result<(), ApiError>;
}
