//! Interpretation of gateway replies.

use crate::transport::TransportResponse;
use mailer_core::{MailerError, MailerResult};
use serde_json::Value;

/// Outcome of a call that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply {
    Accepted(Value),
    Rejected(String),
}

impl GatewayReply {
    pub fn into_result(self) -> MailerResult<Value> {
        match self {
            GatewayReply::Accepted(payload) => Ok(payload),
            GatewayReply::Rejected(message) => Err(MailerError::GatewayRejected(message)),
        }
    }
}

/// Decode a raw reply. A non-empty `error` field wins over the HTTP status:
/// the provider reports semantic refusals with 200 and sometimes with 4xx.
/// A non-2xx reply without that field is a transport failure.
pub fn decode_reply(response: &TransportResponse) -> MailerResult<GatewayReply> {
    let success = (200..300).contains(&response.status);

    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(e) if success => return Err(MailerError::MalformedResponse(e.to_string())),
        Err(_) => {
            return Err(MailerError::GatewayUnreachable(format!(
                "HTTP {}",
                response.status
            )))
        }
    };

    if let Some(message) = error_message(&body) {
        return Ok(GatewayReply::Rejected(message));
    }

    if !success {
        return Err(MailerError::GatewayUnreachable(format!(
            "HTTP {}",
            response.status
        )));
    }

    Ok(GatewayReply::Accepted(body))
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(status: u16, body: Value) -> TransportResponse {
        TransportResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_accepted_payload() {
        let decoded = decode_reply(&reply(200, json!({"id": 9332, "cnt": 1}))).unwrap();
        assert_eq!(decoded, GatewayReply::Accepted(json!({"id": 9332, "cnt": 1})));
    }

    #[test]
    fn test_error_field_rejects_regardless_of_status() {
        for status in [200, 400, 500] {
            let decoded = decode_reply(&reply(
                status,
                json!({"error": "authorise error", "error_code": 2}),
            ))
            .unwrap();
            assert_eq!(decoded, GatewayReply::Rejected("authorise error".to_string()));
        }
    }

    #[test]
    fn test_empty_error_field_is_ignored() {
        let decoded = decode_reply(&reply(200, json!({"id": 1, "error": ""}))).unwrap();
        assert!(matches!(decoded, GatewayReply::Accepted(_)));

        let decoded = decode_reply(&reply(200, json!({"id": 1, "error": null}))).unwrap();
        assert!(matches!(decoded, GatewayReply::Accepted(_)));
    }

    #[test]
    fn test_falsy_error_values_are_ignored() {
        for error in [json!(0), json!(0.0), json!(false), json!([]), json!({})] {
            let decoded = decode_reply(&reply(200, json!({"id": 1, "error": error}))).unwrap();
            assert!(matches!(decoded, GatewayReply::Accepted(_)), "error = {error}");
        }

        let decoded = decode_reply(&reply(200, json!({"error": 9}))).unwrap();
        assert_eq!(decoded, GatewayReply::Rejected("9".to_string()));
    }

    #[test]
    fn test_non_success_without_error_field_is_unreachable() {
        let result = decode_reply(&reply(503, json!({"id": 1})));
        assert!(matches!(result, Err(MailerError::GatewayUnreachable(_))));

        let result = decode_reply(&TransportResponse {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
        });
        assert!(matches!(result, Err(MailerError::GatewayUnreachable(_))));
    }

    #[test]
    fn test_garbage_success_body_is_malformed() {
        let result = decode_reply(&TransportResponse::ok("OK - 1 SMS"));
        assert!(matches!(result, Err(MailerError::MalformedResponse(_))));
    }

    #[test]
    fn test_into_result() {
        let err = GatewayReply::Rejected("no money".to_string())
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "no money");
    }
}
