use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia dialog service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::turn::handle_turn,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::turn::TurnRequest,
            crate::dto::turn::TurnResponse,
            crate::state::state_machine::Slots,
            crate::state::session::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dialog", description = "Conversation turns"),
    )
)]
pub struct ApiDoc;
