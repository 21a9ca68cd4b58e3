//! OpenAPI/Utoipa configuration.

use crate::api::{admin::ADMIN_TAG, auth::AUTH_TAG, health::MISC_TAG};
use utoipa::{
    OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Name of the security scheme referenced by authenticated operations.
pub const SESSION_SCHEME: &str = "SessionToken";

/// Document the session token header. The header name is configurable, so
/// this is applied at router build time rather than through a derive modifier.
pub fn add_session_scheme(openapi: &mut utoipa::openapi::OpenApi, header: &str) {
    let components = openapi.components.get_or_insert_with(Default::default);
    let scheme = ApiKey::Header(ApiKeyValue::with_description(
        header,
        "Session token returned by `/auth/login` or a provider callback.",
    ));
    components.add_security_scheme(SESSION_SCHEME, SecurityScheme::ApiKey(scheme));
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Identity Core API",
        version = "1.0.0",
        description = "Password and federated (Google, GitHub) login with signed session tokens."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = AUTH_TAG, description = "Login, registration and federated login"),
        (name = ADMIN_TAG, description = "Administrative endpoints (admin role required)")
    )
)]
pub struct ApiDoc;
