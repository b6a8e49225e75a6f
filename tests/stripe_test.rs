mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use fitmat::{
    domain::{NewMembershipPurchase, Role},
    payments::FakePaymentGateway,
    repository::{MembershipRepository, SqliteMembershipRepository},
};
use serde_json::json;

use common::{message, TestApp};

const GOLD: &str = "price_gold_1299";
const BRONZE: &str = "price_bronze_499";

fn webhook(payload: String, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/stripe/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

async fn open_checkout(app: &TestApp, user_id: i64, price_id: &str) -> String {
    let (status, body) = app
        .post("/api/stripe/checkout", None, json!({ "userId": user_id, "priceId": price_id }))
        .await;
    assert_eq!(status, 200, "{}", body);
    assert!(body["url"].as_str().unwrap().starts_with("https://"));
    body["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn plans_are_listed() {
    let app = TestApp::new().await;
    let (status, plans) = app.get("/api/stripe/plans", None).await;
    assert_eq!(status, 200);

    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 3);
    for plan in plans {
        for key in ["priceId", "role", "amount", "currency", "label"] {
            assert!(plan.get(key).is_some(), "plan is missing {}", key);
        }
    }
    assert_eq!(plans[1]["role"], "USER_GOLD");
}

#[tokio::test]
async fn checkout_validation() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let gold = app.user("gold@fitmat.test", Role::UserGold).await;
    let trainer = app.user("coach@fitmat.test", Role::Trainer).await;

    let cases = [
        (json!({ "priceId": GOLD }), 400, "userId required"),
        (json!({ "userId": 1 }), 400, "priceId required"),
        (json!({ "userId": 1, "priceId": "price_unknown" }), 400, "invalid priceId"),
        (json!({ "userId": "abc", "priceId": GOLD }), 400, "must be a number"),
        (json!({ "userId": 999999, "priceId": GOLD }), 404, "user not found"),
        (json!({ "userId": gold.id, "priceId": GOLD }), 409, "equal or higher role"),
        (json!({ "userId": gold.id, "priceId": BRONZE }), 409, "equal or higher role"),
        (json!({ "userId": trainer.id, "priceId": GOLD }), 409, "equal or higher role"),
    ];

    for (payload, expected, fragment) in cases {
        let (status, body) = app.post("/api/stripe/checkout", None, payload.clone()).await;
        assert_eq!(status.as_u16(), expected, "payload {}", payload);
        assert!(message(&body).contains(fragment), "payload {} gave {}", payload, body);
    }
    Ok(())
}

#[tokio::test]
async fn checkout_accepts_numeric_string_ids() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let member = app.user("member@fitmat.test", Role::User).await;

    let (status, body) = app
        .post("/api/stripe/checkout", None, json!({ "userId": member.id.to_string(), "priceId": GOLD }))
        .await;
    assert_eq!(status, 200);

    let session = app.gateway.session(body["sessionId"].as_str().unwrap()).await.unwrap();
    assert_eq!(session.metadata["userId"], member.id.to_string());
    assert_eq!(session.metadata["role"], "USER_GOLD");
    assert_eq!(session.metadata["priceId"], GOLD);
    assert!(!session.paid);
    Ok(())
}

#[tokio::test]
async fn paid_webhook_upgrades_once() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let session_id = open_checkout(&app, member.id, GOLD).await;
    app.gateway.mark_paid(&session_id).await;

    let event = FakePaymentGateway::completed_event(&session_id);
    for _ in 0..2 {
        let (status, body) = app.send(webhook(event.clone(), FakePaymentGateway::VALID_SIGNATURE)).await;
        assert_eq!(status, 200);
        assert_eq!(body["received"], true);
    }

    assert_eq!(app.role_of(member.id).await, Role::UserGold);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM membership_purchases")
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(count, 1);

    let purchase = SqliteMembershipRepository::new(app.pool.clone())
        .find_by_session(&session_id)
        .await?
        .unwrap();
    assert_eq!(purchase.user_id, member.id);
    assert_eq!(purchase.role, Role::UserGold);
    assert_eq!(purchase.amount, 129_900);
    Ok(())
}

#[tokio::test]
async fn unpaid_completion_changes_nothing() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let session_id = open_checkout(&app, member.id, GOLD).await;

    let (status, _) = app
        .send(webhook(FakePaymentGateway::completed_event(&session_id), FakePaymentGateway::VALID_SIGNATURE))
        .await;
    assert_eq!(status, 200);
    assert_eq!(app.role_of(member.id).await, Role::User);
    Ok(())
}

#[tokio::test]
async fn fulfillment_never_downgrades() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let member = app.user("member@fitmat.test", Role::User).await;

    // Buy bronze, then gold, then let the bronze payment land last.
    let bronze = open_checkout(&app, member.id, BRONZE).await;
    let gold = open_checkout(&app, member.id, GOLD).await;
    app.gateway.mark_paid(&bronze).await;
    app.gateway.mark_paid(&gold).await;

    for session_id in [&gold, &bronze] {
        let (status, _) = app
            .send(webhook(FakePaymentGateway::completed_event(session_id), FakePaymentGateway::VALID_SIGNATURE))
            .await;
        assert_eq!(status, 200);
    }

    assert_eq!(app.role_of(member.id).await, Role::UserGold);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_fulfillments_of_one_session_both_succeed() -> anyhow::Result<()> {
    let app = TestApp::on_disk(10).await;
    let repo = Arc::new(SqliteMembershipRepository::new(app.pool.clone()));

    for round in 0..20 {
        let member = app.user(&format!("buyer{}@fitmat.test", round), Role::User).await;
        let purchase = NewMembershipPurchase {
            user_id: member.id,
            role: Role::UserGold,
            price_id: GOLD.to_string(),
            amount: 129_900,
            currency: "THB".to_string(),
            stripe_session_id: format!("cs_test_round_{}", round),
        };

        let (first, second) = tokio::join!(
            tokio::spawn({
                let repo = repo.clone();
                let purchase = purchase.clone();
                async move { repo.fulfill(purchase).await }
            }),
            tokio::spawn({
                let repo = repo.clone();
                let purchase = purchase.clone();
                async move { repo.fulfill(purchase).await }
            }),
        );
        let (first, second) = (first??, second??);

        assert!(first.newly_recorded ^ second.newly_recorded, "round {}", round);
        assert_eq!(first.purchase.id, second.purchase.id);
        assert_eq!(first.role, Role::UserGold);
        assert_eq!(second.role, Role::UserGold);
        assert_eq!(app.role_of(member.id).await, Role::UserGold);
    }

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM membership_purchases")
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(count, 20);
    Ok(())
}

#[tokio::test]
async fn fulfilling_for_a_missing_user_records_nothing() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let repo = SqliteMembershipRepository::new(app.pool.clone());

    let result = repo
        .fulfill(NewMembershipPurchase {
            user_id: 424242,
            role: Role::UserGold,
            price_id: GOLD.to_string(),
            amount: 129_900,
            currency: "THB".to_string(),
            stripe_session_id: "cs_test_orphan".to_string(),
        })
        .await;

    assert!(matches!(result, Err(fitmat::error::AppError::NotFound(m)) if m == "user not found"));
    assert!(repo.find_by_session("cs_test_orphan").await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn webhook_and_verify_racing_on_a_paid_session() -> anyhow::Result<()> {
    let app = TestApp::on_disk(10).await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let session_id = open_checkout(&app, member.id, GOLD).await;
    app.gateway.mark_paid(&session_id).await;

    let event = FakePaymentGateway::completed_event(&session_id);
    let uri = format!("/api/stripe/verify?session_id={}", session_id);
    let ((hook_status, _), (verify_status, verified)) = tokio::join!(
        app.send(webhook(event, FakePaymentGateway::VALID_SIGNATURE)),
        app.get(&uri, None),
    );

    assert_eq!(hook_status, 200);
    assert_eq!(verify_status, 200);
    assert_eq!(verified["role"], "USER_GOLD");
    assert_eq!(app.role_of(member.id).await, Role::UserGold);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM membership_purchases")
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn bad_signatures_are_rejected_in_plain_text() {
    let app = TestApp::new().await;
    let (status, body) = app.send(webhook("{}".to_string(), "t=1,v1=forged")).await;
    assert_eq!(status, 400);
    assert!(body.as_str().unwrap().starts_with("Webhook Error:"));
}

#[tokio::test]
async fn other_event_types_are_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({ "type": "invoice.paid", "sessionId": "cs_test_x" }).to_string();
    let (status, _) = app.send(webhook(payload, FakePaymentGateway::VALID_SIGNATURE)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn verify_fulfills_paid_sessions() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let session_id = open_checkout(&app, member.id, GOLD).await;

    let (status, body) = app.get("/api/stripe/verify", None).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("session_id required"));

    let uri = format!("/api/stripe/verify?session_id={}", session_id);
    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["paid"], false);
    assert_eq!(body["status"], "open");
    assert!(body.get("role").is_none());

    app.gateway.mark_paid(&session_id).await;
    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["paid"], true);
    assert_eq!(body["role"], "USER_GOLD");

    // The webhook arriving afterwards is a no-op.
    app.send(webhook(FakePaymentGateway::completed_event(&session_id), FakePaymentGateway::VALID_SIGNATURE))
        .await;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM membership_purchases")
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn unconfigured_gateway_answers_503_after_validation() -> anyhow::Result<()> {
    let app = TestApp::unconfigured().await;
    let member = app.user("member@fitmat.test", Role::User).await;

    let (status, _) = app.post("/api/stripe/checkout", None, json!({ "priceId": GOLD })).await;
    assert_eq!(status, 400);

    let (status, body) = app
        .post("/api/stripe/checkout", None, json!({ "userId": member.id, "priceId": GOLD }))
        .await;
    assert_eq!(status, 503);
    assert!(message(&body).contains("not configured"));

    let (status, _) = app.send(webhook("{}".to_string(), "sig")).await;
    assert_eq!(status, 503);

    let (status, _) = app.get("/api/stripe/verify?session_id=cs_test_x", None).await;
    assert_eq!(status, 503);

    // The catalog does not depend on the gateway.
    let (_, plans) = app.get("/api/stripe/plans", None).await;
    assert_eq!(plans.as_array().map(Vec::len), Some(3));
    Ok(())
}
