use anyhow::Result;
use axum::http::{Method, StatusCode};
use caixa_service::{domain::models::Role, infrastructure::state::AppState};
use futures::future::{join, join_all};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

#[path = "test_harness.rs"]
mod test_harness;

use test_harness::{
    app, run_test, seed_employee, seed_unit, send, test_config, token_for, DEV_CREDENTIAL,
};

#[tokio::test]
async fn register_open_record_close_and_settle() -> Result<()> {
    run_test(run_scenario).await
}

async fn run_scenario(pool: PgPool) -> Result<()> {
    let state = Arc::new(AppState::new(test_config(), pool.clone()));
    let app = app(&state);

    let unit_id = seed_unit(&pool, "Loja Centro").await?;
    let operator = seed_employee(&pool, Role::Operator, Some(unit_id)).await?;
    let manager = seed_employee(&pool, Role::Manager, Some(unit_id)).await?;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": operator.login, "credential": DEV_CREDENTIAL })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "operador");
    let operator_token = body["token"].as_str().unwrap_or_default().to_string();
    assert!(!operator_token.is_empty());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": operator.login, "credential": "wrong" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/registers",
        Some(&operator_token),
        Some(json!({
            "business_date": "2024-05-10",
            "opening_count": [
                { "value_cents": 5000, "quantity": 2 },
                { "value_cents": 100, "quantity": 10 }
            ]
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["register"]["status"], "aberto");
    assert_eq!(body["register"]["opening_balance_cents"], 11_000);
    let register_id = body["register"]["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/registers",
        Some(&operator_token),
        Some(json!({ "opening_balance_cents": 0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let entries = [
        json!({ "register_id": register_id, "amount_cents": 5_000, "payment_method": "dinheiro" }),
        json!({ "register_id": register_id, "amount_cents": 3_000, "payment_method": "pix", "payment_status": "pendente" }),
        json!({ "register_id": register_id, "amount_cents": 1_000, "payment_method": "dinheiro", "direction": "saida", "description": "sangria" }),
        json!({ "register_id": register_id, "amount_cents": 2_500, "payment_method": "cartao_debito" }),
    ];
    let mut pending_id = String::new();
    for entry in entries {
        let (status, body) = send(&app, Method::POST, "/api/movements", Some(&operator_token), Some(entry)).await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["movement"]["business_date"], "2024-05-10");
        if body["movement"]["payment_status"] == "pendente" {
            pending_id = body["movement"]["id"].as_str().unwrap_or_default().to_string();
        }
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/movements",
        Some(&operator_token),
        Some(json!({ "register_id": register_id, "amount_cents": 0, "payment_method": "pix" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/registers/{register_id}/summary"),
        Some(&operator_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["count"], 4);
    assert_eq!(body["summary"]["realized"], 6_500);
    assert_eq!(body["summary"]["pending"], 3_000);
    assert_eq!(body["summary"]["grand_total"], 9_500);
    assert_eq!(body["expected_cash"], 15_000);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/payments/{pending_id}/settle"),
        Some(&operator_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/registers/{register_id}/close"),
        Some(&operator_token),
        Some(json!({ "counted_cents": 14_900, "notes": "faltou troco" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["register"]["status"], "fechado");
    assert_eq!(body["register"]["expected_cents"], 15_000);
    assert_eq!(body["register"]["difference_cents"], -100);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/registers/{register_id}/close"),
        Some(&operator_token),
        Some(json!({ "counted_cents": 14_900 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/movements",
        Some(&operator_token),
        Some(json!({ "register_id": register_id, "amount_cents": 100, "payment_method": "dinheiro" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let manager_token = token_for(&state, &manager)?;
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/payments/pending",
        Some(&manager_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/payments/{pending_id}/settle"),
        Some(&manager_token),
        Some(json!({ "payment_method": "cartao_credito" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["payment"]["payment_status"], "realizado");
    assert_eq!(body["payment"]["payment_method"], "cartao_credito");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/payments/{pending_id}/settle"),
        Some(&manager_token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn movements_of_an_open_register_can_be_removed_by_their_author() -> Result<()> {
    run_test(removal_scenario).await
}

async fn removal_scenario(pool: PgPool) -> Result<()> {
    let state = Arc::new(AppState::new(test_config(), pool.clone()));
    let app = app(&state);

    let unit_id = seed_unit(&pool, "Loja Bairro").await?;
    let author = seed_employee(&pool, Role::Operator, Some(unit_id)).await?;
    let colleague = seed_employee(&pool, Role::Operator, Some(unit_id)).await?;
    let author_token = token_for(&state, &author)?;
    let colleague_token = token_for(&state, &colleague)?;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/registers",
        Some(&author_token),
        Some(json!({ "opening_balance_cents": 2_000 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let register_id = body["register"]["id"].as_str().unwrap_or_default().to_string();

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/movements",
        Some(&author_token),
        Some(json!({ "register_id": register_id, "amount_cents": 750, "payment_method": "dinheiro" })),
    )
    .await?;
    let movement_uri = format!(
        "/api/movements/{}",
        body["movement"]["id"].as_str().unwrap_or_default()
    );

    let (status, _) = send(&app, Method::DELETE, &movement_uri, Some(&colleague_token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &movement_uri, Some(&author_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &movement_uri, Some(&author_token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn closing_counts_every_movement_recorded_alongside_it() -> Result<()> {
    run_test(concurrent_close_scenario).await
}

async fn concurrent_close_scenario(pool: PgPool) -> Result<()> {
    let state = Arc::new(AppState::new(test_config(), pool.clone()));
    let app = app(&state);

    let unit_id = seed_unit(&pool, "Loja Estação").await?;
    let operator = seed_employee(&pool, Role::Operator, Some(unit_id)).await?;
    let token = token_for(&state, &operator)?;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/registers",
        Some(&token),
        Some(json!({ "opening_balance_cents": 1_000 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let register_id = body["register"]["id"].as_str().unwrap_or_default().to_string();

    let (router, bearer) = (&app, token.as_str());
    let sale = json!({ "register_id": register_id, "amount_cents": 100, "payment_method": "dinheiro" });
    let sales = (0..12).map(move |_| {
        send(router, Method::POST, "/api/movements", Some(bearer), Some(sale.clone()))
    });
    let close_uri = format!("/api/registers/{register_id}/close");
    let close = send(
        &app,
        Method::POST,
        &close_uri,
        Some(&token),
        Some(json!({ "counted_cents": 1_000 })),
    );
    let (recorded, closed) = join(join_all(sales), close).await;

    let mut accepted = 0_i64;
    for result in recorded {
        let (status, body) = result?;
        match status {
            StatusCode::CREATED => accepted += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}: {body}"),
        }
    }

    let (status, body) = closed?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["register"]["expected_cents"], 1_000 + 100 * accepted);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/movements?register_id={register_id}"),
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["movements"].as_array().map(Vec::len),
        Some(accepted as usize)
    );

    Ok(())
}
