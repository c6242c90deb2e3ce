use clientkit::TokenPair;
use rust_decimal::Decimal;

use crate::contract::model::{
    Expense, Part, ReceiptLink, Subgroup, User, UserDetail, Work, WorkRef,
};
use crate::infra::http::dto::{
    ExpenseDto, PartDto, ReceiptLinkDto, SubgroupDto, TokenPairDto, UserDetailDto, UserDto,
    WorkDto,
};

impl From<TokenPairDto> for TokenPair {
    fn from(d: TokenPairDto) -> Self {
        Self {
            access_token: d.access_token,
            refresh_token: d.refresh_token,
        }
    }
}

impl From<UserDto> for User {
    fn from(d: UserDto) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            role: d.role,
        }
    }
}

impl From<UserDetailDto> for UserDetail {
    fn from(d: UserDetailDto) -> Self {
        Self {
            user: User {
                id: d.id,
                name: d.name,
                email: d.email,
                role: d.role,
            },
            works: d
                .works
                .unwrap_or_default()
                .into_iter()
                .map(|w| WorkRef {
                    id: w.id,
                    name: w.name,
                })
                .collect(),
        }
    }
}

impl From<WorkDto> for Work {
    fn from(d: WorkDto) -> Self {
        Self {
            id: d.id,
            name: d.name,
            start_date: d.start_date,
            end_date: d.end_date,
            total_budget: d.total_budget.unwrap_or(Decimal::ZERO),
            admin_id: d.admin_id,
        }
    }
}

/// Subgroups and parts are listed per work; a missing `workId` is taken from the route.
pub fn subgroup_from_dto(d: SubgroupDto, work_id: i64) -> Subgroup {
    Subgroup {
        id: d.id,
        work_id: d.work_id.unwrap_or(work_id),
        name: d.name,
        budget: d.budget,
    }
}

pub fn part_from_dto(d: PartDto, work_id: Option<i64>) -> Part {
    Part {
        id: d.id,
        work_id: d.work_id.or(work_id).unwrap_or_default(),
        subgroup_id: d.subgroup_id,
        name: d.name,
        budget: d.budget,
    }
}

pub fn expense_from_dto(d: ExpenseDto, part_id: i64) -> Expense {
    Expense {
        id: d.id,
        part_id: d.part_id.unwrap_or(part_id),
        user_id: d.user_id,
        amount: d.amount,
        description: d.description,
        date: d.date,
        author: d
            .user
            .and_then(|u| u.name)
            .filter(|n| !n.trim().is_empty()),
        has_receipt: d.receipt_url.is_some_and(|u| !u.trim().is_empty()),
    }
}

impl From<ReceiptLinkDto> for ReceiptLink {
    fn from(d: ReceiptLinkDto) -> Self {
        Self {
            signed_url: d.signed_url,
            file_extension: d
                .file_extension
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty()),
        }
    }
}
