use lambda_http::{http::StatusCode, run, service_fn, Body, Error, Request, Response};
use shared::{
    config::{get_grant_policy, GrantPolicy, StorageConfig},
    grant::issue_upload_grant,
    http::{error_response, json_response, upload_request},
    signer::{S3Signer, Signer},
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // CloudWatch adds the ingestion time.
        .without_time()
        .init();

    let storage = StorageConfig::from_env();
    let missing = storage.missing();
    if !missing.is_empty() {
        tracing::error!(
            "storage configuration incomplete, every request will fail: {}",
            missing.join(", ")
        );
    }
    tracing::event!(tracing::Level::DEBUG, "{:?}", storage);

    let policy = get_grant_policy("get-upload-uri").await?;
    let signer = S3Signer::from_config(&storage);

    run(service_fn(|req| get_upload_uri(req, &storage, &policy, &signer))).await
}

pub async fn get_upload_uri<S: Signer>(
    req: Request,
    storage: &StorageConfig,
    policy: &GrantPolicy,
    signer: &S,
) -> Result<Response<Body>, Error> {
    let upload = upload_request(&req);

    match issue_upload_grant(&upload, storage, policy, signer).await {
        Ok(grant) => json_response(StatusCode::OK, &grant),
        Err(err) => error_response(&err),
    }
}
