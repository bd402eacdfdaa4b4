use super::*;
use crate::test_helpers::PASSWORD;
use serde_json::json;

fn device(ip: &str) -> Value {
    json!({"ip": ip, "username": "admin", "password": PASSWORD})
}

#[tokio::test]
async fn idle_schedule_reports_null_next_run() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (app, _service, _temp_dir) = test_app(&fake);

    let response = app.oneshot(get("/schedule")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"state": "idle", "next_run": null})
    );
}

#[tokio::test]
async fn set_then_replace_then_cancel() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (app, _service, _temp_dir) = test_app(&fake);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/schedule",
            json!({"hour": 9, "minute": 30, "devices": [device("10.0.0.1")]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["replaced"], false);
    assert_eq!(body["device_count"], 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/schedule",
            json!({"hour": 10, "minute": 0, "devices": [device("10.0.0.1"), device("10.0.0.2")]}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["replaced"], true);

    let body = body_json(app.clone().oneshot(get("/schedule")).await.unwrap()).await;
    assert_eq!(body["state"], "scheduled");
    assert_eq!(body["hour"], 10);
    assert_eq!(body["devices"], json!(["10.0.0.1", "10.0.0.2"]));
    assert!(body["next_run"].is_string());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/schedule")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["outcome"], "cancelled");

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/schedule")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["outcome"], "nothing_to_cancel");
}

#[tokio::test]
async fn out_of_range_hour_is_400_and_slot_stays_idle() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (app, service, _temp_dir) = test_app(&fake);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/schedule",
            json!({"hour": 25, "minute": 0, "devices": [device("10.0.0.1")]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_time");
    assert_eq!(body["error"]["details"]["hour"], 25);
    assert!(service.schedule_status().await.next_run.is_none());
}

#[tokio::test]
async fn empty_device_list_is_rejected() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (app, _service, _temp_dir) = test_app(&fake);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/schedule",
            json!({"hour": 9, "minute": 0, "devices": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "empty_batch");
}
