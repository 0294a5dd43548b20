mod cli;
mod infra;
mod routes;
mod server;

use lease_onboarding::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
