mod cli;
mod infra;
mod routes;
mod server;

use rorstay::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
