//! Wire shapes of the obras REST API.
//!
//! Responses are decoded leniently: lists may or may not be wrapped in
//! `{"data": ...}`, money may be a number or a numeric string, and dates may be
//! plain `YYYY-MM-DD` or full RFC 3339 timestamps.

use chrono::NaiveDate;
use clientkit::session::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{"data": T}` or a bare `T`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

pub mod wire_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer};

    /// Calendar date of a `YYYY-MM-DD` string or of an RFC 3339 timestamp in UTC.
    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(d);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid date '{}'", raw))),
            }
        }
    }
}

// -------- responses --------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct WorkRefDto {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub works: Option<Vec<WorkRefDto>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDto {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "wire_date::option")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire_date::option")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_budget: Option<Decimal>,
    #[serde(default)]
    pub admin_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgroupDto {
    pub id: i64,
    #[serde(default)]
    pub work_id: Option<i64>,
    pub name: String,
    pub budget: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDto {
    pub id: i64,
    #[serde(default)]
    pub work_id: Option<i64>,
    #[serde(default)]
    pub subgroup_id: Option<i64>,
    pub name: String,
    pub budget: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AuthorDto {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDto {
    pub id: i64,
    #[serde(default)]
    pub part_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub user: Option<AuthorDto>,
    #[serde(default, alias = "receiptKey")]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLinkDto {
    pub signed_url: String,
    #[serde(default)]
    pub file_extension: Option<String>,
}

// -------- requests --------

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest<'a> {
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_budget: Decimal,
    pub admin_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgroupRequest<'a> {
    pub name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    pub work_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRequest<'a> {
    pub name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub budget: Decimal,
    /// Serialized as `null` for uncategorized parts.
    pub subgroup_id: Option<i64>,
    pub work_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserPatchRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest<'a> {
    pub current_password: &'a str,
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope<Vec<SubgroupDto>> = serde_json::from_value(
            json!({"data": [{"id": 1, "workId": 2, "name": "Obra gruesa", "budget": "1000.50"}]}),
        )
        .unwrap();
        assert_eq!(wrapped.into_inner().len(), 1);

        let bare: Envelope<Vec<ExpenseDto>> = serde_json::from_value(json!([
            {"id": 1, "amount": 10, "date": "2024-02-01"}
        ]))
        .unwrap();
        assert_eq!(bare.into_inner()[0].amount, Decimal::from(10));
    }

    #[test]
    fn bare_object_is_not_mistaken_for_envelope() {
        let work: Envelope<WorkDto> = serde_json::from_value(json!({
            "id": 3, "name": "Edificio", "startDate": "2024-01-10T03:00:00.000Z",
            "endDate": null, "totalBudget": "25000000", "adminId": 4
        }))
        .unwrap();
        let work = work.into_inner();
        assert_eq!(work.start_date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(work.end_date, None);
        assert_eq!(work.total_budget, Some(Decimal::from(25_000_000)));
    }

    #[test]
    fn money_accepts_numbers_and_strings() {
        let a: PartDto =
            serde_json::from_value(json!({"id": 1, "name": "p", "budget": 1234.5})).unwrap();
        let b: PartDto =
            serde_json::from_value(json!({"id": 1, "name": "p", "budget": "1234.50"})).unwrap();
        assert_eq!(a.budget, b.budget);
        assert_eq!(a.subgroup_id, None);
    }

    #[test]
    fn timestamps_reduce_to_utc_date() {
        assert_eq!(
            wire_date::parse("2024-03-31T23:30:00-03:00"),
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(wire_date::parse("2024-03-31"), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(wire_date::parse("31/03/2024"), None);
    }

    #[test]
    fn part_request_keeps_null_subgroup() {
        let body = serde_json::to_value(PartRequest {
            name: "Excavación",
            budget: Decimal::new(150_000, 0),
            subgroup_id: None,
            work_id: 8,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"name": "Excavación", "budget": 150000.0, "subgroupId": null, "workId": 8})
        );
    }

    #[test]
    fn user_patch_omits_role_unless_set() {
        let body = serde_json::to_value(UserPatchRequest {
            name: "Ana",
            email: "ana@obras.cl",
            role: None,
        })
        .unwrap();
        assert_eq!(body, json!({"name": "Ana", "email": "ana@obras.cl"}));
    }
}
