use super::handlers::{health, post_login};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(post_login::execute))
        .routes(routes!(post_login::resume));

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service status".to_string());

    let mut hook_tag = Tag::new("post-login");
    hook_tag.description = Some("Invitation gate hooks called by the identity provider".to_string());

    router.get_openapi_mut().tags = Some(vec![health_tag, hook_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.license = Some(License::new(env!("CARGO_PKG_LICENSE")));

    OpenApiBuilder::new().info(info).build()
}
