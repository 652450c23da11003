//! OpenAPI specification served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SMS Mailer API",
        version = "0.1.0",
        description = "Submit SMS mailings through the SMSC gateway and follow their delivery.\n\nLive status is streamed over the `/ws` websocket as `SMSMailingStatus` messages.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Mailings", description = "Mailing submission"),
        (name = "Operations", description = "Health and liveness probes"),
    ),
    paths(
        crate::rest::handle_send,
        crate::rest::health_check,
        crate::rest::liveness,
    ),
    components(schemas(
        crate::rest::SendForm,
        crate::rest::SendErrorResponse,
        crate::rest::HealthResponse,
        // Status stream message
        mailer_core::StatusUpdate,
        mailer_core::MailingSummary,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_send_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/send/"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
