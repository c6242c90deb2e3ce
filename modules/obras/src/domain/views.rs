//! View-models returned by the service, one per screen.

use rust_decimal::Decimal;

use crate::contract::model::{Expense, Part, ReceiptLink, User, UserDetail, Work};
use crate::domain::budget::WorkBudget;
use crate::domain::messages;
use crate::domain::receipt::ReceiptKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCard {
    pub work: Work,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub cards: Vec<WorkCard>,
    /// "Crear Obra" is offered to admins only.
    pub can_create: bool,
}

/// Data for the create/edit work form: the work being edited (if any) and the
/// users that can be put in charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFormView {
    pub work: Option<Work>,
    pub candidates: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDetailView {
    pub work: Work,
    pub budget: WorkBudget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRow {
    pub expense: Expense,
    /// Edit and delete are offered to admins and to the expense author.
    pub can_modify: bool,
}

impl ExpenseRow {
    pub fn author_label(&self) -> &str {
        self.expense
            .author
            .as_deref()
            .unwrap_or(messages::UNKNOWN_AUTHOR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDetailView {
    pub part: Part,
    pub rows: Vec<ExpenseRow>,
}

impl PartDetailView {
    pub fn total_spent(&self) -> Decimal {
        self.rows.iter().map(|r| r.expense.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptView {
    pub expense_id: i64,
    pub link: ReceiptLink,
    pub kind: ReceiptKind,
    /// Suggested local file name for a download.
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListView {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetailView {
    pub detail: UserDetail,
    pub is_self: bool,
    /// Edit/delete controls for admins.
    pub can_manage: bool,
}

impl UserDetailView {
    /// Empty-state line shown when the user has no works in charge.
    pub fn works_placeholder(&self) -> Option<&'static str> {
        self.detail
            .works
            .is_empty()
            .then_some(messages::NO_WORKS_IN_CHARGE)
    }
}
