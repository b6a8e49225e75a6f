mod common;

use std::sync::Arc;

use axum::http::header;
use chrono::Utc;
use fitmat::{
    config::Settings,
    domain::{CreateContactRequest, Role},
    email::RecordingMailer,
    service::ServiceContext,
    test_support::test_pool,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{message, multipart, ClassSpec, TestApp};

#[tokio::test]
async fn root_and_health() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Fitmat API");

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn category_crud_and_guard() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let admin = app.user("admin@fitmat.test", Role::Admin).await;
    let trainer = app.user("coach@fitmat.test", Role::Trainer).await;
    let token = app.token(&admin);

    let (status, body) = app.post("/api/categories", Some(&token), json!({})).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("required"));

    let (status, yoga) = app
        .post("/api/categories", Some(&token), json!({ "name": "Yoga", "description": "Stretch" }))
        .await;
    assert_eq!(status, 201);
    let yoga_id = yoga["id"].as_i64().unwrap();

    let (status, body) = app.post("/api/categories", Some(&token), json!({ "name": "Yoga" })).await;
    assert_eq!(status, 409);
    assert!(message(&body).contains("already exists"));

    let (status, body) = app.put(&format!("/api/categories/{}", yoga_id), Some(&token), json!({})).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("No fields"));

    let (status, body) = app.put("/api/categories/invalid", Some(&token), json!({ "name": "x" })).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));

    let (status, body) = app
        .put(&format!("/api/categories/{}", yoga_id), Some(&token), json!({ "name": "Hatha Yoga" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Hatha Yoga");
    assert_eq!(body["description"], "Stretch");

    app.class(&trainer, ClassSpec { category_id: Some(yoga_id), ..Default::default() }).await;

    let (_, list) = app.get("/api/categories", None).await;
    assert_eq!(list[0]["classCount"], 1);

    let (status, body) = app.delete(&format!("/api/categories/{}", yoga_id), Some(&token)).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("in use by 1 class"));

    // Category and class both survive the refused delete.
    assert_eq!(app.get(&format!("/api/categories/{}", yoga_id), None).await.0, 200);
    let (_, classes) = app.get(&format!("/api/classes?categoryId={}", yoga_id), None).await;
    assert_eq!(classes.as_array().unwrap().len(), 1);

    let (status, body) = app.delete("/api/categories/999999", Some(&token)).await;
    assert_eq!(status, 404);
    assert!(message(&body).contains("not found"));

    let (_, unused) = app.post("/api/categories", Some(&token), json!({ "name": "Spin" })).await;
    let (status, body) = app.delete(&format!("/api/categories/{}", unused["id"]), Some(&token)).await;
    assert_eq!(status, 200);
    assert!(message(&body).contains("deleted successfully"));

    let member = app.user("member@fitmat.test", Role::User).await;
    let (status, _) = app.post("/api/categories", Some(&app.token(&member)), json!({ "name": "Boxing" })).await;
    assert_eq!(status, 403);
    Ok(())
}

#[tokio::test]
async fn reviews_and_trainer_profiles() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let trainer = app.user("coach@fitmat.test", Role::Trainer).await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let admin = app.user("admin@fitmat.test", Role::Admin).await;
    let token = app.token(&member);

    let (status, _) = app.post("/api/reviews", None, json!({})).await;
    assert_eq!(status, 401);
    let (status, _) = app.post("/api/reviews", Some("invalid-token"), json!({})).await;
    assert_eq!(status, 401);

    let cases = [
        (json!({ "trainerId": trainer.id, "rating": 5 }), 400, "required"),
        (json!({ "trainerId": trainer.id, "rating": 6, "comment": "Great" }), 400, "between 1 and 5"),
        (json!({ "trainerId": member.id, "rating": 4, "comment": "Not a coach" }), 404, "Trainer not found"),
    ];
    for (payload, expected, fragment) in cases {
        let (status, body) = app.post("/api/reviews", Some(&token), payload.clone()).await;
        assert_eq!(status.as_u16(), expected, "payload {}", payload);
        assert!(message(&body).contains(fragment));
    }

    let (status, first) = app
        .post("/api/reviews", Some(&token), json!({ "trainerId": trainer.id, "rating": 5, "comment": "Great" }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(first["reviewer"]["id"], member.id);
    app.post("/api/reviews", Some(&token), json!({ "trainerId": trainer.id, "rating": 4, "comment": "Good" }))
        .await;

    let (_, summary) = app.get("/api/reviews/summary", None).await;
    assert_eq!(summary["totalReviews"], 2);
    assert_eq!(summary["averageRating"], 4.5);
    assert_eq!(summary["ratingCounts"]["5"], 1);

    let (status, per_trainer) = app.get(&format!("/api/reviews/trainer/{}", trainer.id), None).await;
    assert_eq!(status, 200);
    assert_eq!(per_trainer["trainer"]["id"], trainer.id);
    assert_eq!(per_trainer["totalReviews"], 2);
    assert_eq!(per_trainer["reviews"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/reviews/trainer/invalid", None).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));

    let (_, trainers) = app.get("/api/trainers", None).await;
    assert_eq!(trainers.as_array().unwrap().len(), 1);
    assert_eq!(trainers[0]["averageRating"], 4.5);

    let (status, _) = app.get(&format!("/api/trainers/{}", member.id), None).await;
    assert_eq!(status, 404);
    let (status, body) = app.get("/api/trainers/invalid", None).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));

    // Auth is checked before the id on admin routes.
    let (status, body) = app.delete("/api/reviews/invalid", None).await;
    assert_eq!(status, 401);
    assert!(message(&body).contains("Missing"));
    let (status, body) = app.delete("/api/reviews/invalid", Some(&token)).await;
    assert_eq!(status, 403);
    assert!(message(&body).contains("Only admins"));

    let admin_token = app.token(&admin);
    let (status, body) = app.delete("/api/reviews/invalid", Some(&admin_token)).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));
    assert_eq!(app.delete("/api/reviews/999999", Some(&admin_token)).await.0, 404);

    let (status, body) = app.delete(&format!("/api/reviews/{}", first["id"]), Some(&admin_token)).await;
    assert_eq!(status, 200);
    assert!(message(&body).contains("deleted successfully"));
    Ok(())
}

#[tokio::test]
async fn user_administration() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let admin = app.user("admin@fitmat.test", Role::Admin).await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let token = app.token(&admin);

    assert_eq!(app.get("/api/users", None).await.0, 401);
    assert_eq!(app.get("/api/users", Some(&app.token(&member))).await.0, 403);

    let (status, users) = app.get("/api/users", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (_, roles) = app.get("/api/users/roles", Some(&token)).await;
    assert_eq!(roles, json!(["USER", "USER_BRONZE", "USER_GOLD", "USER_PLATINUM", "TRAINER", "ADMIN"]));

    let uri = format!("/api/users/{}/role", member.id);
    let (status, body) = app.put(&uri, Some(&token), json!({ "role": "SUPERUSER" })).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("must be one of"));

    let (status, body) = app.put(&uri, Some(&token), json!({ "role": "TRAINER" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["role"], "TRAINER");

    assert_eq!(app.put("/api/users/999999/role", Some(&token), json!({ "role": "USER" })).await.0, 404);

    let (status, body) = app.get(&format!("/api/users/{}", member.id), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["email"], "member@fitmat.test");

    let (status, body) = app.get("/api/users/invalid/classes", None).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));
    assert_eq!(app.get("/api/users/999999/classes", None).await.0, 404);
    Ok(())
}

#[tokio::test]
async fn admin_token_is_trusted_without_a_stored_account() {
    let app = TestApp::new().await;
    let ghost = fitmat::domain::User {
        id: 999,
        email: "admin@review.test".to_string(),
        name: None,
        role: Role::Admin,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let (status, body) = app.get("/api/payment/all", Some(&app.token(&ghost))).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn payment_proof_upload_and_review() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let admin = app.user("admin@fitmat.test", Role::Admin).await;
    let member = app.user("member@fitmat.test", Role::User).await;
    let user_id = member.id.to_string();
    let image: &[u8] = b"fake-image-data";

    let (status, body) = app.send(multipart(&[("amount", "1500")], None)).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("paymentImage"));

    // A plain JSON body still gets the JSON error envelope.
    let (status, body) = app
        .post("/api/payment", None, json!({ "userId": user_id, "amount": "1000" }))
        .await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("paymentImage file is required"));
    assert_eq!(body["error"], body["message"]);

    let (status, body) = app
        .send(multipart(&[("userId", "invalid"), ("amount", "1500")], Some(("paymentImage", "slip.jpg", image))))
        .await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("must be a number"));

    let (status, body) = app
        .send(multipart(&[("amount", "invalid")], Some(("paymentImage", "slip.jpg", image))))
        .await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("must be a number"));

    let (status, body) = app
        .send(multipart(&[("amount", "10")], Some(("paymentImage", "slip.pdf", image))))
        .await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("Invalid file type"));

    let (status, _) = app
        .send(multipart(&[("userId", "999999"), ("amount", "10")], Some(("paymentImage", "slip.jpg", image))))
        .await;
    assert_eq!(status, 404);

    let (status, proof) = app
        .send(multipart(
            &[("userId", &user_id), ("amount", "1500"), ("note", "March")],
            Some(("paymentImage", "slip.jpg", image)),
        ))
        .await;
    assert_eq!(status, 201);
    assert_eq!(proof["userId"], member.id);
    assert_eq!(proof["filename"], "slip.jpg");
    assert_eq!(proof["mimeType"], "image/jpeg");
    assert!(proof.get("imageData").is_none());

    let (status, anonymous) = app
        .send(multipart(&[("amount", "500")], Some(("paymentImage", "cash.png", image))))
        .await;
    assert_eq!(status, 201);
    assert_eq!(anonymous["userId"], Value::Null);

    let token = app.token(&admin);
    assert_eq!(app.get("/api/payment", None).await.0, 401);
    assert_eq!(app.get("/api/payment", Some(&app.token(&member))).await.0, 403);

    let (_, all) = app.get("/api/payment/all", Some(&token)).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = app.get(&format!("/api/payment?userId={}", member.id), Some(&token)).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["userId"], member.id);

    let (status, body) = app.get("/api/payment?userId=invalid", Some(&token)).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("must be a number"));

    let (status, body) = app.get("/api/payment/invalid/image", Some(&token)).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("valid number"));
    assert_eq!(app.get("/api/payment/999999/image", Some(&token)).await.0, 404);

    let response = app
        .router
        .clone()
        .oneshot(common::request(
            axum::http::Method::GET,
            &format!("/api/payment/{}/image", proof["id"]),
            Some(&token),
            None,
        ))
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], image);
    Ok(())
}

#[tokio::test]
async fn contact_requests() -> anyhow::Result<()> {
    let app = TestApp::new().await;
    let admin = app.user("admin@fitmat.test", Role::Admin).await;
    let member = app.user("member@fitmat.test", Role::User).await;

    let (status, body) = app.post("/api/contact", None, json!({ "name": "Only name" })).await;
    assert_eq!(status, 400);
    assert!(message(&body).contains("required"));

    let (status, body) = app
        .post("/api/contact", None, json!({
            "name": "Pat",
            "email": "pat@example.com",
            "phoneNumber": "0812345678",
            "subject": "Opening hours",
            "message": "Test message content",
        }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["phoneNumber"], "0812345678");
    assert_eq!(body["message"], "Test message content");

    assert_eq!(app.get("/api/contact", None).await.0, 401);
    assert_eq!(app.get("/api/contact", Some(&app.token(&member))).await.0, 403);

    let (status, list) = app.get("/api/contact", Some(&app.token(&admin))).await;
    assert_eq!(status, 200);
    assert_eq!(list[0]["subject"], "Opening hours");
    Ok(())
}

#[tokio::test]
async fn contact_notification_reaches_the_admin_inbox() -> anyhow::Result<()> {
    let mut settings = Settings::default();
    settings.email.admin_address = Some("front-desk@fitmat.test".to_string());
    let mailer = Arc::new(RecordingMailer::new());
    let services = ServiceContext::new(test_pool().await, &settings, None, Some(mailer.clone()));

    services
        .contact_service
        .submit(CreateContactRequest {
            name: Some("Pat".to_string()),
            email: Some("pat@example.com".to_string()),
            phone_number: Some("0812345678".to_string()),
            subject: Some("Trial class".to_string()),
            message: Some("Can I try a class?".to_string()),
        })
        .await?;

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "front-desk@fitmat.test");
    assert!(sent[0].subject.contains("Trial class"));
    assert!(sent[0].body.contains("Can I try a class?"));
    Ok(())
}
