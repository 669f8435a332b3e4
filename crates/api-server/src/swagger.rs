//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nexus Analytics API",
        version = "0.1.0",
        description = "Event analytics for tracked projects.\n\nServes rolling-cohort user retention for the dashboard.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Retention", description = "Cohort retention analytics"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        crate::retention_rest::handle_retention,
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        nexus_reporting::RetentionReport,
        nexus_reporting::CohortRetention,
        nexus_reporting::KeyMetric,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
