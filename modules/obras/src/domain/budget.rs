//! Per-work budget aggregation: parts grouped under their subgroup, with the
//! spent figures gathered from each part's expenses.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::contract::model::{Expense, Part, Subgroup};
use crate::domain::messages;

/// A part with the totals of its expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpend {
    pub part: Part,
    pub spent: Decimal,
    pub expense_count: usize,
    /// `false` when the expense listing failed and `spent` is a placeholder zero.
    pub complete: bool,
}

impl PartSpend {
    pub fn from_expenses(part: Part, expenses: &[Expense]) -> Self {
        Self {
            spent: expenses.iter().map(|e| e.amount).sum(),
            expense_count: expenses.len(),
            complete: true,
            part,
        }
    }

    pub fn unavailable(part: Part) -> Self {
        Self {
            part,
            spent: Decimal::ZERO,
            expense_count: 0,
            complete: false,
        }
    }
}

/// One tab of the work detail: a subgroup, or the uncategorized bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetTab {
    pub label: String,
    /// `None` for the uncategorized tab.
    pub subgroup: Option<Subgroup>,
    pub parts: Vec<PartSpend>,
    /// Sum of the budgets of `parts`.
    pub accumulated_budget: Decimal,
    /// Sum of the spent totals of `parts`.
    pub accumulated_spent: Decimal,
}

impl BudgetTab {
    fn new(label: String, subgroup: Option<Subgroup>, parts: Vec<PartSpend>) -> Self {
        let accumulated_budget = parts.iter().map(|p| p.part.budget).sum();
        let accumulated_spent = parts.iter().map(|p| p.spent).sum();
        Self {
            label,
            subgroup,
            parts,
            accumulated_budget,
            accumulated_spent,
        }
    }

    /// Budget the subgroup was planned with, as opposed to the sum of its parts.
    pub fn estimated_budget(&self) -> Option<Decimal> {
        self.subgroup.as_ref().map(|s| s.budget)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.subgroup.is_none()
    }

    /// All figures in this tab come from successful expense listings.
    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(|p| p.complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkBudget {
    /// One tab per subgroup in listing order, then the uncategorized tab when
    /// at least one part has no subgroup.
    pub tabs: Vec<BudgetTab>,
    /// Parts whose subgroup is not part of this work's listing.
    pub orphaned: Vec<Part>,
}

impl WorkBudget {
    /// Group `spends` under `subgroups`.
    pub fn group(subgroups: Vec<Subgroup>, spends: Vec<PartSpend>) -> Self {
        let mut by_subgroup: HashMap<i64, Vec<PartSpend>> = HashMap::new();
        let mut uncategorized = Vec::new();
        let mut orphaned = Vec::new();

        let known: std::collections::HashSet<i64> = subgroups.iter().map(|s| s.id).collect();
        for spend in spends {
            match spend.part.subgroup_id {
                None => uncategorized.push(spend),
                Some(id) if known.contains(&id) => by_subgroup.entry(id).or_default().push(spend),
                Some(id) => {
                    tracing::warn!(
                        part_id = spend.part.id,
                        subgroup_id = id,
                        "part references a subgroup outside this work; skipped"
                    );
                    orphaned.push(spend.part);
                }
            }
        }

        let mut tabs: Vec<BudgetTab> = subgroups
            .into_iter()
            .map(|s| {
                let parts = by_subgroup.remove(&s.id).unwrap_or_default();
                BudgetTab::new(s.name.clone(), Some(s), parts)
            })
            .collect();

        if !uncategorized.is_empty() {
            tabs.push(BudgetTab::new(
                messages::UNCATEGORIZED_TAB.to_string(),
                None,
                uncategorized,
            ));
        }

        Self { tabs, orphaned }
    }

    pub fn uncategorized(&self) -> Option<&BudgetTab> {
        self.tabs.iter().find(|t| t.is_uncategorized())
    }

    pub fn is_complete(&self) -> bool {
        self.tabs.iter().all(BudgetTab::is_complete)
    }

    pub fn total_spent(&self) -> Decimal {
        self.tabs.iter().map(|t| t.accumulated_spent).sum()
    }
}
