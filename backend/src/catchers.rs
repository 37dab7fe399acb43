use rocket::{Request, catch, serde::json::Json};
use vote_shared::ErrorResponse;

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "Invalid request parameters.".into(),
        status: 400
    })
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "The requested resource was not found.".into(),
        status: 404
    })
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "Malformed vote form.".into(),
        status: 422
    })
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "An internal server error occurred.".into(),
        status: 500
    })
}

#[catch(503)]
pub fn unavailable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: "Voting backend temporarily unavailable.".into(),
        status: 503
    })
}
