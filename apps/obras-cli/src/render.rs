//! Plain-text rendering of the screen view-models.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write as _;

use obras::domain::budget::BudgetTab;
use obras::domain::messages;
use obras::model::{User, Work};
use obras::{DashboardView, PartDetailView, ReceiptView, UserDetailView, UserListView, WorkDetailView};

/// Chilean-style grouping: `.` between thousands, `,` before decimals.
pub fn number(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (plain, String::new()),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if decimals > 0 {
        let mut frac = frac_part;
        while frac.len() < decimals as usize {
            frac.push('0');
        }
        out.push(',');
        out.push_str(&frac);
    }
    out
}

/// Whole pesos, as shown on the dashboard cards.
pub fn currency(value: Decimal) -> String {
    format!("${}", number(value, 0))
}

pub fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    if view.cards.is_empty() {
        out.push_str("(sin obras)\n");
    }
    for card in &view.cards {
        let _ = writeln!(out, "{}", work_line(&card.work));
    }
    if view.can_create {
        out.push_str("\nCrear Obra: obras works create\n");
    }
    out
}

fn work_line(w: &Work) -> String {
    format!(
        "#{:<5} {:<30} {} - {}  {}",
        w.id,
        w.name,
        date(w.start_date),
        date(w.end_date),
        currency(w.total_budget)
    )
}

pub fn users_for_form(users: &[User]) -> String {
    let mut out = String::from("Encargados disponibles:\n");
    for u in users {
        let _ = writeln!(out, "  #{:<5} {} <{}>", u.id, u.name, u.email);
    }
    out
}

pub fn work_detail(view: &WorkDetailView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", work_line(&view.work));
    for tab in &view.budget.tabs {
        out.push('\n');
        out.push_str(&budget_tab(tab));
    }
    if !view.budget.orphaned.is_empty() {
        let _ = writeln!(
            out,
            "\n{} partida(s) con subgrupo desconocido omitidas",
            view.budget.orphaned.len()
        );
    }
    let _ = writeln!(out, "\nGastado total: {}", number(view.budget.total_spent(), 2));
    out
}

fn budget_tab(tab: &BudgetTab) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", tab.label);
    if let Some(estimated) = tab.estimated_budget() {
        let _ = writeln!(out, "Presupuesto estimado:   {}", number(estimated, 2));
    }
    let _ = writeln!(out, "Presupuesto acumulado:  {}", number(tab.accumulated_budget, 2));
    let _ = writeln!(out, "Gastado acumulado:      {}", number(tab.accumulated_spent, 2));
    for p in &tab.parts {
        let marker = if p.complete { "" } else { " (incompleto)" };
        let _ = writeln!(
            out,
            "  #{:<5} {:<28} presupuesto {:>16}  gastado {:>16}  gastos {}{}",
            p.part.id,
            p.part.name,
            number(p.part.budget, 2),
            number(p.spent, 2),
            p.expense_count,
            marker
        );
    }
    out
}

pub fn part_detail(view: &PartDetailView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "#{} {}  presupuesto {}  gastado {}",
        view.part.id,
        view.part.name,
        number(view.part.budget, 2),
        number(view.total_spent(), 2)
    );
    for row in &view.rows {
        let e = &row.expense;
        let _ = writeln!(
            out,
            "  #{:<5} {:>14}  {}  {:<30} {:<20} recibo: {}{}",
            e.id,
            number(e.amount, 2),
            date(Some(e.date)),
            e.description,
            row.author_label(),
            if e.has_receipt { "sí" } else { messages::RECEIPT_MISSING },
            if row.can_modify { "  [editable]" } else { "" }
        );
    }
    out
}

pub fn receipt(view: &ReceiptView) -> String {
    format!(
        "Recibo del gasto #{} ({:?}): {}\n",
        view.expense_id, view.kind, view.link.signed_url
    )
}

pub fn user_list(view: &UserListView) -> String {
    let mut out = String::new();
    for u in &view.users {
        let _ = writeln!(out, "#{:<5} {:<25} {:<30} {}", u.id, u.name, u.email, u.role);
    }
    out
}

pub fn user_detail(view: &UserDetailView) -> String {
    let u = &view.detail.user;
    let mut out = format!("#{} {} <{}> ({})\n", u.id, u.name, u.email, u.role);
    out.push_str("Obras a cargo:\n");
    match view.works_placeholder() {
        Some(empty) => {
            let _ = writeln!(out, "  {}", empty);
        }
        None => {
            for w in &view.detail.works {
                let _ = writeln!(out, "  #{} {}", w.id, w.name);
            }
        }
    }
    out
}
