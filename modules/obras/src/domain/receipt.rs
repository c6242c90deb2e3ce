//! Receipt attachment rules.

use chrono::NaiveDate;

use crate::contract::model::ReceiptFile;
use crate::domain::error::DomainError;

/// Accepted receipt extensions, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// How a stored receipt should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Image,
    Pdf,
    /// Anything else is offered as a plain download.
    Other,
}

pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn mime_for(file_name: &str) -> Option<&'static str> {
    match extension_of(file_name)?.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

pub fn kind_of(extension: Option<&str>) -> ReceiptKind {
    match extension.map(|e| e.trim_start_matches('.').to_ascii_lowercase()) {
        Some(e) if e == "pdf" => ReceiptKind::Pdf,
        Some(e) if matches!(e.as_str(), "jpg" | "jpeg" | "png") => ReceiptKind::Image,
        _ => ReceiptKind::Other,
    }
}

/// Local file name for a downloaded receipt, e.g. `recibo-12.pdf`.
pub fn download_name(expense_id: i64, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("recibo-{}.{}", expense_id, ext),
        _ => format!("recibo-{}", expense_id),
    }
}

pub fn validate_receipt(file: &ReceiptFile) -> Result<(), DomainError> {
    let allowed = extension_of(&file.file_name)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if allowed {
        Ok(())
    } else {
        Err(DomainError::UnsupportedReceipt {
            file_name: file.file_name.clone(),
        })
    }
}

/// Expense dates may not lie after `today`.
pub fn validate_expense_date(date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if date > today {
        Err(DomainError::ExpenseDateInFuture)
    } else {
        Ok(())
    }
}
