//! Render REST Service
//!
//! Exposes the converter and artifact store over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /convert` - Convert a zip of Gerber layers (multipart field `file`)
//! - `GET /images/:name` - Download a rendered PNG
//! - `GET /list-images` - List stored images, optionally `?conversion_id=`
//! - `DELETE /conversions/:conversion_id` - Release one conversion's images
//! - `GET /health/live` - Liveness check

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_conversion_metrics};
pub use routes::{create_router, status_for, AppState, ErrorResponse};
pub use state::ServiceState;
