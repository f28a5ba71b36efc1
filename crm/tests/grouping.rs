use crm::bulk::PollPolicy;
use crm::error::ErrorKind;
use crm::grouping::{DuplicateGroup, GroupingEngine, RuleSelection};
use crm::transport::SESSION_HEADER;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

use support::{ACCESS_TOKEN, paths, spawn_org};

const RULE_QUERY: &str =
    "SELECT Id, MasterLabel, DeveloperName FROM DuplicateRule WHERE DeveloperName = 'Test_Regel'";

fn group(members: &[&str]) -> DuplicateGroup {
    DuplicateGroup::new(members.iter().map(|id| (*id).to_owned()).collect()).unwrap()
}

fn fast_polling() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        deadline: Some(Duration::from_secs(5)),
    }
}

async fn mount_rule(server: &MockServer, rule_id: &str) {
    Mock::given(method("GET"))
        .and(path("/services/data/v42.0/query"))
        .and(query_param("q", RULE_QUERY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"Id": rule_id, "MasterLabel": "Test Regel", "DeveloperName": "Test_Regel"}]
        })))
        .mount(server)
        .await;
}

/// Mounts the lifecycle of one insert job on `object`.
///
/// The batch reports `InProgress` for `pending_checks` checks before completing with `result`.
async fn mount_insert_job(
    server: &MockServer,
    object: &str,
    job_id: &str,
    batch: Value,
    pending_checks: u64,
    result: Value,
) {
    let job = format!("/services/async/42.0/job/{job_id}");
    let batch_path = format!("{job}/batch/{job_id}-B");

    Mock::given(method("POST"))
        .and(path("/services/async/42.0/job"))
        .and(header(SESSION_HEADER, ACCESS_TOKEN))
        .and(body_json(json!({
            "operation": "insert",
            "object": object,
            "contentType": "JSON"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": job_id})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{job}/batch")))
        .and(body_json(batch))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": format!("{job_id}-B"),
            "state": "Queued"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(job.as_str()))
        .and(body_partial_json(json!({"state": "Closed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id})))
        .expect(1)
        .mount(server)
        .await;

    if pending_checks > 0 {
        Mock::given(method("GET"))
            .and(path(batch_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": format!("{job_id}-B"),
                "state": "InProgress"
            })))
            .up_to_n_times(pending_checks)
            .expect(pending_checks)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(batch_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": format!("{job_id}-B"),
            "state": "Completed"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{batch_path}/result")))
        .respond_with(ResponseTemplate::new(200).set_body_json(result))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn groups_are_materialized_through_two_bulk_jobs() {
    let (server, transport) = spawn_org().await;
    mount_rule(&server, "0Bm1").await;
    mount_insert_job(
        &server,
        "DuplicateRecordSet",
        "750S",
        json!([{"DuplicateRuleId": "0Bm1"}, {"DuplicateRuleId": "0Bm1"}]),
        2,
        json!([
            {"id": "0GK1", "success": true, "created": true, "errors": []},
            {"id": "0GK2", "success": true, "created": true, "errors": []}
        ]),
    )
    .await;
    mount_insert_job(
        &server,
        "DuplicateRecordItem",
        "750I",
        json!([
            {"DuplicateRecordSetId": "0GK1", "RecordId": "001A"},
            {"DuplicateRecordSetId": "0GK1", "RecordId": "001B"},
            {"DuplicateRecordSetId": "0GK2", "RecordId": "001C"},
            {"DuplicateRecordSetId": "0GK2", "RecordId": "001D"},
            {"DuplicateRecordSetId": "0GK2", "RecordId": "001E"}
        ]),
        0,
        json!([
            {"id": "0GL1", "success": true, "created": true, "errors": []},
            {"id": "0GL2", "success": true, "created": true, "errors": []},
            {"id": "0GL3", "success": true, "created": true, "errors": []},
            {"id": null, "success": false, "created": false, "errors": [
                {"statusCode": "DUPLICATE_VALUE", "message": "already in a set"}
            ]},
            {"id": "0GL5", "success": true, "created": true, "errors": []}
        ]),
    )
    .await;

    let engine = GroupingEngine::new(transport, paths(), RuleSelection::named("Test_Regel"))
        .with_poll_policy(fast_polling());
    let report = engine
        .materialize(&[
            group(&["001A", "001B"]),
            group(&["001C", "001D", "001E"]),
        ])
        .await
        .unwrap();

    assert_eq!(report.rule_id.as_deref(), Some("0Bm1"));
    assert_eq!(report.group_ids, vec!["0GK1", "0GK2"]);
    assert_eq!(report.memberships.len(), 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 3);
    assert_eq!(report.memberships[3].record_id, "001D");
}

#[tokio::test]
async fn failed_set_batch_stops_before_memberships() {
    let (server, transport) = spawn_org().await;
    mount_rule(&server, "0Bm1").await;

    Mock::given(method("POST"))
        .and(path("/services/async/42.0/job"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "750S"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/async/42.0/job/750S/batch"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "751S", "state": "Queued"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/async/42.0/job/750S"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "750S"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/async/42.0/job/750S/batch/751S"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "751S",
            "state": "Failed",
            "stateMessage": "InvalidBatch : Field name not found : DuplicateRuleId"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = GroupingEngine::new(transport, paths(), RuleSelection::named("Test_Regel"))
        .with_poll_policy(fast_polling());
    let err = engine
        .materialize(&[group(&["001A", "001B"])])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BulkBatchFailed);
    assert!(err.detail().unwrap_or_default().contains("InvalidBatch"));
}

#[tokio::test]
async fn missing_rule_stops_before_any_job() {
    let (server, transport) = spawn_org().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v42.0/query"))
        .and(query_param("q", RULE_QUERY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 0,
            "done": true,
            "records": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let engine = GroupingEngine::new(transport, paths(), RuleSelection::named("Test_Regel"));
    let err = engine
        .materialize(&[group(&["001A", "001B"])])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RuleNotFound);
}
