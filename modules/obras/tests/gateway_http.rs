//! The screens end to end against a mock obras API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::NaiveDate;
use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

use clientkit::{ApiClient, MemoryTokenStore, Session, TokenStore};
use obras::model::{ExpenseInput, NewPart, ReceiptFile, Role};
use obras::{DomainError, HttpObrasClient, ObrasConfig, Service};

fn jwt(user_id: i64, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"userId": user_id, "role": role}).to_string());
    format!("{}.{}.sig", header, payload)
}

struct Harness {
    service: Service,
    session: Arc<Session>,
    store: Arc<MemoryTokenStore>,
}

fn harness(server: &MockServer) -> Harness {
    let store = Arc::new(MemoryTokenStore::new());
    let session = Arc::new(Session::hydrate(store.clone()).unwrap());
    let api = ApiClient::new(
        reqwest::Client::new(),
        url::Url::parse(&server.base_url()).unwrap(),
        session.clone(),
    );
    let service = Service::new(
        Arc::new(HttpObrasClient::new(api)),
        session.clone(),
        ObrasConfig::default(),
    );
    Harness {
        service,
        session,
        store,
    }
}

async fn log_in(server: &MockServer, h: &Harness, user_id: i64, role: &str) -> String {
    let access = jwt(user_id, role);
    server.mock(|when, then| {
        when.method(POST).path("/users/login");
        then.status(200)
            .json_body(json!({"accessToken": access.clone(), "refreshToken": "r-1"}));
    });
    h.service.login("ana@obras.cl", "secreto").await.unwrap();
    access
}

#[tokio::test]
async fn login_stores_tokens_and_decodes_the_admin_role() {
    let server = MockServer::start();
    let h = harness(&server);
    let access = jwt(1, "admin");
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/users/login")
            .json_body(json!({"email": "admin@obras.cl", "password": "secreto"}));
        then.status(200)
            .json_body(json!({"accessToken": access.clone(), "refreshToken": "r-1"}));
    });

    let identity = h.service.login("admin@obras.cl", "secreto").await.unwrap();

    login.assert();
    assert_eq!(identity.role, Role::Admin);
    assert_eq!(identity.user_id, 1);
    assert!(h.session.is_signed_in());
    assert_eq!(h.store.get("accessToken").unwrap().as_deref(), Some(access.as_str()));
    assert_eq!(h.store.get("refreshToken").unwrap().as_deref(), Some("r-1"));
}

#[tokio::test]
async fn rejected_login_shows_the_credentials_message() {
    let server = MockServer::start();
    let h = harness(&server);
    server.mock(|when, then| {
        when.method(POST).path("/users/login");
        then.status(401).json_body(json!({"message": "Invalid credentials"}));
    });

    let err = h.service.login("admin@obras.cl", "mala").await.unwrap_err();

    assert_eq!(err.to_string(), obras::domain::messages::LOGIN_BAD_CREDENTIALS);
    assert!(!h.session.is_signed_in());
}

#[tokio::test]
async fn dashboard_renders_one_card_per_work_with_numeric_budget() {
    let server = MockServer::start();
    let h = harness(&server);
    let access = log_in(&server, &h, 1, "admin").await;
    let works = server.mock(|when, then| {
        when.method(GET)
            .path("/works")
            .header("Authorization", format!("Bearer {}", access));
        then.status(200).json_body(json!({"data": [
            {"id": 1, "name": "Torre A", "startDate": "2024-01-10", "endDate": null,
             "totalBudget": "1500000.50", "adminId": 2},
            {"id": 2, "name": "Casa B", "startDate": "2024-02-01T00:00:00.000Z",
             "endDate": "2024-12-31", "totalBudget": 820000, "adminId": 3}
        ]}));
    });

    let view = h.service.dashboard().await.unwrap();

    works.assert();
    assert_eq!(view.cards.len(), 2);
    assert!(view.can_create);
    assert_eq!(view.cards[0].work.total_budget, "1500000.50".parse::<Decimal>().unwrap());
    assert_eq!(view.cards[0].work.end_date, None);
    assert_eq!(view.cards[1].work.total_budget, Decimal::from(820_000));
    assert_eq!(view.cards[1].work.start_date, NaiveDate::from_ymd_opt(2024, 2, 1));
}

#[tokio::test]
async fn work_detail_pages_listings_and_aggregates_expenses() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 2, "user").await;

    server.mock(|when, then| {
        when.method(GET).path("/works/5");
        then.status(200).json_body(json!({
            "id": 5, "name": "Torre A", "startDate": "2024-01-10", "endDate": "2024-10-10",
            "totalBudget": 1000, "adminId": 2
        }));
    });
    let subgroups = server.mock(|when, then| {
        when.method(GET)
            .path("/subgroups/5/subgroups")
            .query_param("page", "1")
            .query_param("limit", "100");
        then.status(200).json_body(json!({"data": [
            {"id": 10, "workId": 5, "name": "Terminaciones", "budget": 600}
        ]}));
    });
    let parts = server.mock(|when, then| {
        when.method(GET)
            .path("/parts/5/parts")
            .query_param("page", "1")
            .query_param("limit", "100");
        then.status(200).json_body(json!({"data": [
            {"id": 100, "workId": 5, "subgroupId": 10, "name": "Pintura", "budget": 400},
            {"id": 101, "workId": 5, "subgroupId": null, "name": "Aseo", "budget": 50}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/expenses/parts/100/expenses");
        then.status(200).json_body(json!([
            {"id": 1, "amount": "120.5", "description": "Látex", "date": "2024-03-01",
             "userId": 2, "user": {"name": "Ana"}},
            {"id": 2, "amount": 79.5, "description": "Rodillos", "date": "2024-03-02",
             "userId": 3, "receiptUrl": "receipts/2.pdf"}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/expenses/parts/101/expenses");
        then.status(404).json_body(json!({"message": "No expenses found"}));
    });

    let view = h.service.work_detail(5).await.unwrap();

    subgroups.assert();
    parts.assert();
    assert_eq!(view.budget.tabs.len(), 2);
    let terminaciones = &view.budget.tabs[0];
    assert_eq!(terminaciones.label, "Terminaciones");
    assert_eq!(terminaciones.accumulated_spent, Decimal::from(200));
    assert_eq!(terminaciones.parts[0].expense_count, 2);

    let unc = view.budget.uncategorized().unwrap();
    assert_eq!(unc.accumulated_budget, Decimal::from(50));
    assert_eq!(unc.accumulated_spent, Decimal::ZERO);
    assert!(view.budget.is_complete());
}

#[tokio::test]
async fn create_part_sends_null_subgroup_then_refetches() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 2, "user").await;

    let create = server.mock(|when, then| {
        when.method(POST).path("/parts/5/parts").json_body(json!({
            "name": "Aseo", "budget": 50.0, "subgroupId": null, "workId": 5
        }));
        then.status(201).json_body(json!({"id": 101}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/works/5");
        then.status(200).json_body(json!({"id": 5, "name": "Torre A", "totalBudget": 1000}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/subgroups/5/subgroups");
        then.status(200).json_body(json!({"data": []}));
    });
    let parts = server.mock(|when, then| {
        when.method(GET).path("/parts/5/parts");
        then.status(200).json_body(json!({"data": [
            {"id": 101, "workId": 5, "subgroupId": null, "name": "Aseo", "budget": 50}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/expenses/parts/101/expenses");
        then.status(200).json_body(json!([]));
    });

    let view = h
        .service
        .create_part(
            5,
            NewPart {
                name: "Aseo".into(),
                budget: Decimal::from(50),
                subgroup_id: None,
            },
        )
        .await
        .unwrap();

    create.assert();
    parts.assert();
    assert_eq!(view.budget.tabs.len(), 1);
    assert!(view.budget.tabs[0].is_uncategorized());
}

#[tokio::test]
async fn expense_with_receipt_is_posted_as_multipart() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 2, "user").await;

    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/expenses/parts/100/expenses")
            .header_exists("content-type")
            .body_includes(r#"name="description""#)
            .body_includes("Cemento")
            .body_includes(r#"filename="boleta.pdf""#);
        then.status(201).json_body(json!({"id": 9}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/parts/100");
        then.status(200).json_body(json!({
            "id": 100, "workId": 5, "subgroupId": null, "name": "Obra gruesa", "budget": 900
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/expenses/parts/100/expenses");
        then.status(200).json_body(json!([
            {"id": 9, "amount": 1200, "description": "Cemento", "date": "2024-03-01",
             "userId": 2, "user": {"name": "Ana"}, "receiptUrl": "r/9.pdf"}
        ]));
    });

    let view = h
        .service
        .add_expense(
            100,
            ExpenseInput {
                amount: Decimal::from(1200),
                description: "Cemento".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                receipt: Some(ReceiptFile {
                    file_name: "boleta.pdf".into(),
                    bytes: b"%PDF-1.4".to_vec(),
                }),
            },
        )
        .await
        .unwrap();

    create.assert();
    assert_eq!(view.rows.len(), 1);
    assert!(view.rows[0].can_modify);
    assert!(view.rows[0].expense.has_receipt);
    assert_eq!(view.rows[0].author_label(), "Ana");
}

#[tokio::test]
async fn unsupported_receipt_never_reaches_the_server() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 2, "user").await;
    let create = server.mock(|when, then| {
        when.method(POST).path("/expenses/parts/100/expenses");
        then.status(201);
    });

    let err = h
        .service
        .add_expense(
            100,
            ExpenseInput {
                amount: Decimal::from(10),
                description: "Factura".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                receipt: Some(ReceiptFile {
                    file_name: "factura.docx".into(),
                    bytes: vec![1, 2, 3],
                }),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::UnsupportedReceipt { .. }));
    create.assert_hits(0);
}

#[tokio::test]
async fn receipt_link_resolves_and_downloads_without_bearer() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 1, "admin").await;

    let signed = format!("{}/storage/r/9.pdf?sig=abc", server.base_url());
    server.mock(|when, then| {
        when.method(GET).path("/expenses/9/receipt");
        then.status(200)
            .json_body(json!({"signedUrl": signed.clone(), "fileExtension": ".PDF"}));
    });
    let file = server.mock(|when, then| {
        when.method(GET).path("/storage/r/9.pdf").query_param("sig", "abc");
        then.status(200).body("%PDF-1.4");
    });

    let (view, bytes) = h.service.download_receipt(9).await.unwrap();

    file.assert();
    assert_eq!(bytes, b"%PDF-1.4");
    assert_eq!(view.kind, obras::domain::receipt::ReceiptKind::Pdf);
    assert_eq!(view.file_name, "recibo-9.pdf");
}

#[tokio::test]
async fn deleting_a_user_with_works_shows_the_server_reason() {
    let server = MockServer::start();
    let h = harness(&server);
    log_in(&server, &h, 1, "admin").await;
    server.mock(|when, then| {
        when.method(DELETE).path("/users/4");
        then.status(400).json_body(json!({"message": "User has works"}));
    });

    let user = obras::model::User {
        id: 4,
        name: "Pedro".into(),
        email: "pedro@obras.cl".into(),
        role: Role::User,
    };
    let err = h.service.delete_user(&user).await.unwrap_err();

    assert_eq!(err.to_string(), obras::domain::messages::DELETE_USER_HAS_WORKS);
}
