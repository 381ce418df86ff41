use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::video::handler::process_video,
        crate::modules::video::handler::download_video,
        crate::modules::video::handler::serve_video,
    ),
    components(
        schemas(
            crate::modules::video::dto::ProcessVideoResponse,
            crate::common::response::ErrorBody,
        )
    ),
    tags(
        (name = "Video", description = "Pose-annotated video processing and one-shot delivery")
    )
)]
pub struct ApiDoc;
