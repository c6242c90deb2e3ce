use chrono::NaiveDate;
use rust_decimal::Decimal;

pub use clientkit::session::Role;

/// Account as listed by the user endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Work the user is in charge of, as embedded in the user detail payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetail {
    pub user: User,
    pub works: Vec<WorkRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Profile update. `role` is only ever sent by admins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A construction project ("obra").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub id: i64,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget: Decimal,
    pub admin_id: Option<i64>,
}

/// Body for both create and update of a work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWork {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_budget: Decimal,
    /// User in charge of the work.
    pub admin_id: i64,
}

/// Budget subdivision of a work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgroup {
    pub id: i64,
    pub work_id: i64,
    pub name: String,
    pub budget: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubgroup {
    pub name: String,
    pub budget: Decimal,
}

/// Budget line ("partida"). `subgroup_id == None` means uncategorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub id: i64,
    pub work_id: i64,
    pub subgroup_id: Option<i64>,
    pub name: String,
    pub budget: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPart {
    pub name: String,
    pub budget: Decimal,
    pub subgroup_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: i64,
    pub part_id: i64,
    pub user_id: Option<i64>,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    /// Name of the user who recorded the expense, when the server includes it.
    pub author: Option<String>,
    pub has_receipt: bool,
}

/// Receipt file picked by the user for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Body for both create and update of an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseInput {
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub receipt: Option<ReceiptFile>,
}

/// Short-lived download link for a stored receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLink {
    pub signed_url: String,
    pub file_extension: Option<String>,
}
