use crate::cli::{
    actions::{auth, web, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Web(args) => web::execute(args).await,
        Action::Auth(args) => auth::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
