use std::process::ExitCode;

use log::error;
use purpleair_ingest::configuration::get_configuration;
use purpleair_ingest::error::IngestError;
use purpleair_ingest::ingestion::{handle_invocation, Outcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Trigger arguments carry no information for this job.
    let response = match get_configuration() {
        Ok(settings) => handle_invocation(&settings).await,
        Err(e) => {
            error!("Failed to read configuration: {}", e);
            Outcome::from(IngestError::from(e)).into_response()
        }
    };

    match serde_json::to_string(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize invocation response: {}", e),
    }

    if response.status_code == 200 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
