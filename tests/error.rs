use serde_json::Value;
use tasksync::error::{exit_codes, Error, JsonError};

#[test]
fn exit_code_user_error() {
    for err in [
        Error::InvalidArgument("bad input".to_string()),
        Error::InvalidConfig("bad config".to_string()),
        Error::TaskNotFound("t1".to_string()),
    ] {
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }
}

#[test]
fn exit_code_operation_failed() {
    for err in [
        Error::OperationFailed("boom".to_string()),
        Error::ChannelClosed("s1".to_string()),
        Error::Decode("garbage".to_string()),
        Error::Server {
            status: 500,
            message: None,
        },
    ] {
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    }
}

#[test]
fn server_error_display_tolerates_missing_message() {
    let err = Error::Server {
        status: 502,
        message: None,
    };
    assert_eq!(err.to_string(), "Server error (502): no error message");
    assert!(err.server_message().is_none());

    let err = Error::Server {
        status: 400,
        message: Some("Title is required".to_string()),
    };
    assert_eq!(err.to_string(), "Server error (400): Title is required");
    assert_eq!(err.server_message(), Some("Title is required"));
}

#[test]
fn details_include_server_fields() {
    let err = Error::Server {
        status: 400,
        message: Some("Title is required".to_string()),
    };
    let details = err.details().expect("details");
    assert_eq!(details["status"], Value::from(400));
    assert_eq!(details["message"], Value::String("Title is required".to_string()));
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::TaskNotFound("t9".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert!(json.error.contains("Task not found"));
    assert!(json.details.is_none());

    let err = Error::Server {
        status: 503,
        message: None,
    };
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::OPERATION_FAILED);
    assert_eq!(json.details.expect("details")["message"], Value::Null);
}
