//! HTTP round-trips for the Data Processing client against a mock API.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ovh_spark_submit::api::{DataProcessingClient, EngineParameter, JobService, JobSubmission};
use ovh_spark_submit::config::OvhConf;
use ovh_spark_submit::error::ApiError;

const PROJECT_ID: &str = "test";
const JOB_ID: &str = "9b9c8d09-c95e-478b-a258-5f4dab826dad";

/// Mock API that also serves /auth/time, which the client fetches once to
/// compute its signing clock drift.
async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("1457018875", "text/plain"))
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> DataProcessingClient {
    DataProcessingClient::new(&OvhConf {
        endpoint: server.uri(),
        application_key: "app-key".to_string(),
        application_secret: "app-secret".to_string(),
        consumer_key: "consumer-key".to_string(),
    })
}

fn submission() -> JobSubmission {
    JobSubmission {
        container_name: "ovh-odp".to_string(),
        engine: "spark".to_string(),
        name: "hello".to_string(),
        region: "GRA".to_string(),
        engine_version: "2.4.3".to_string(),
        engine_parameters: vec![EngineParameter::new("driver_cores", "2")],
        ttl: None,
    }
}

#[tokio::test]
async fn submit_posts_the_serialized_job() {
    let server = mock_server().await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/cloud/project/{PROJECT_ID}/dataProcessing/jobs"
        )))
        .and(body_partial_json(json!({
            "containerName": "ovh-odp",
            "engine": "spark",
            "engineVersion": "2.4.3",
            "engineParameters": [{"name": "driver_cores", "value": "2"}],
        })))
        .and(header_exists("X-Ovh-Signature"))
        .and(header_exists("X-Ovh-Timestamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB_ID,
            "name": "hello",
            "status": "PENDING",
            "startDate": "2019-12-03T09:40:15Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let job = client.submit(PROJECT_ID, &submission()).await.unwrap();
    assert_eq!(job.id, JOB_ID);
    assert_eq!(job.name, "hello");
    assert_eq!(job.start_date, "2019-12-03T09:40:15Z");
}

#[tokio::test]
async fn get_status_returns_the_full_snapshot() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/cloud/project/{PROJECT_ID}/dataProcessing/jobs/{JOB_ID}"
        )))
        .and(header_exists("X-Ovh-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB_ID,
            "name": "hello",
            "region": "GRA",
            "status": "RUNNING",
            "returnCode": 0,
            "engineParameters": [
                {"name": "job_type", "value": "java"},
                {"name": "main_class_name", "value": "org.apache.spark.examples.SparkPi"},
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let job = client.get_status(PROJECT_ID, JOB_ID).await.unwrap();
    assert_eq!(job.status, "RUNNING");
    assert_eq!(job.engine_parameters.len(), 2);
}

#[tokio::test]
async fn get_log_last_replays_the_seen_timestamp() {
    let server = mock_server().await;
    let logs_path = format!("/cloud/project/{PROJECT_ID}/dataProcessing/jobs/{JOB_ID}/logs");

    // Specific mock first: the second fetch must carry the `from` bound at
    // millisecond precision.
    Mock::given(method("GET"))
        .and(path(&logs_path))
        .and(query_param("from", "2019-12-03T09:40:15.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [],
            "logsAddress": "",
            "startDate": "2019-12-03T09:40:13Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(&logs_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [
                {"content": "My first log", "id": 1, "timestamp": "2019-12-03T09:40:15Z"},
            ],
            "logsAddress": "",
            "startDate": "2019-12-03T09:40:13Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let batch = client.get_log(PROJECT_ID, JOB_ID, None).await.unwrap();
    assert_eq!(batch.logs[0].content, "My first log");
    assert_eq!(batch.start_date, "2019-12-03T09:40:13Z");

    let batch = client.get_log_last(PROJECT_ID, JOB_ID).await.unwrap();
    assert!(batch.logs.is_empty());
}

#[tokio::test]
async fn api_errors_carry_status_class_and_query_id() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/cloud/project/{PROJECT_ID}/dataProcessing/jobs/{JOB_ID}"
        )))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Ovh-Queryid", "EU.ext-99.some-query")
                .set_body_json(json!({
                    "class": "Client::NotFound",
                    "message": "Job does not exist",
                })),
        )
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let err = client.get_status(PROJECT_ID, JOB_ID).await.unwrap_err();
    match err {
        ApiError::Api {
            status,
            class,
            message,
            query_id,
        } => {
            assert_eq!(status, 404);
            assert_eq!(class, "Client::NotFound");
            assert_eq!(message, "Job does not exist");
            assert_eq!(query_id, "EU.ext-99.some-query");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn unprocessable_submissions_are_flagged() {
    let server = mock_server().await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/cloud/project/{PROJECT_ID}/dataProcessing/jobs"
        )))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "class": "Client::UnprocessableEntity",
            "message": "Unprocessable Entity",
        })))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let err = client.submit(PROJECT_ID, &submission()).await.unwrap_err();
    assert!(err.is_unprocessable());
}

#[tokio::test]
async fn kill_issues_a_delete() {
    let server = mock_server().await;
    Mock::given(method("DELETE"))
        .and(path(format!(
            "/cloud/project/{PROJECT_ID}/dataProcessing/jobs/{JOB_ID}"
        )))
        .and(header_exists("X-Ovh-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("null", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.kill(PROJECT_ID, JOB_ID).await.unwrap();
}
