use lambda_http::{http::StatusCode, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use serde_json::json;

use crate::{error::GrantError, grant::UploadRequest};

/// Reads `fileName` and `contentType` from the query string.
pub fn upload_request(event: &Request) -> UploadRequest {
    let params = event.query_string_parameters();

    UploadRequest {
        file_name: params.first("fileName").map(str::to_string),
        content_type: params.first("contentType").map(str::to_string),
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(serde_json::to_string(body)?.into())?)
}

/// `{"error": ...}` with the status class of the failure.
pub fn error_response(err: &GrantError) -> Result<Response<Body>, Error> {
    let status = err.status_code();

    if status.is_server_error() {
        tracing::error!("{}: {:?}", err, err);
    } else {
        tracing::warn!("{}", err);
    }

    json_response(status, &json!({ "error": err.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        match resp.body() {
            Body::Text(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected text body, got {:?}", other),
        }
    }

    #[test]
    fn reads_query_parameters() {
        let req = Request::default().with_query_string_parameters(HashMap::from([
            ("fileName".to_string(), "logo.png".to_string()),
            ("contentType".to_string(), "image/png".to_string()),
        ]));
        let upload = upload_request(&req);

        assert_eq!(upload.file_name.as_deref(), Some("logo.png"));
        assert_eq!(upload.content_type.as_deref(), Some("image/png"));
        assert!(upload_request(&Request::default()).file_name.is_none());
    }

    #[test]
    fn validation_error_is_bad_request() {
        let resp = error_response(&GrantError::Validation).unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()["content-type"], "application/json");
        assert_eq!(body_json(&resp)["error"], "fileName is required");
    }

    #[test]
    fn configuration_error_is_server_error() {
        let resp =
            error_response(&GrantError::Configuration(vec!["R2_ACCESS_KEY_ID"])).unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&resp)["error"],
            "Missing required configuration: R2_ACCESS_KEY_ID"
        );
    }
}
