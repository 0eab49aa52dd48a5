
pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod extractor;
pub mod partitioner;
pub mod persistence;
pub mod processor;
pub mod publisher;
pub mod records;
pub mod xml_tree;

use {
    config::Config,
    envelope::ReqPayload,
    errors::ProcessorError,
    persistence::SqlitePersister,
    processor::Camt59Processor,
    publisher::{ErrorSink, LogPublisher, Publisher},
    std::sync::Arc,
    tokio::io::{AsyncBufReadExt, BufReader},
};

#[tokio::main]
pub async fn main() -> Result<(), ProcessorError> {
    dotenv::dotenv().ok();

    let config = Config::from_env();

    // Initialize logger, writing to stderr
    let mut builder = if config.rust_log.is_some() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    } else {
        env_logger::Builder::from_default_env()
    };
    builder.target(env_logger::Target::Stderr).init();

    log::info!("🚀 Starting CAMT.059 inward router...");
    log::info!("📊 Configuration:");
    log::info!("   FC_TOPIC: {}", config.fc_topic);
    log::info!("   EPH_TOPIC: {}", config.eph_topic);
    log::info!("   ERROR_TOPIC: {}", config.error_topic);
    log::info!("   DATABASE_PATH: {}", config.database_path);

    let persister = Arc::new(SqlitePersister::open(&config.database_path)?);
    let publisher: Arc<dyn Publisher> = Arc::new(LogPublisher);
    let error_sink = ErrorSink::new(publisher.clone(), config.error_topic.clone());
    let processor = Camt59Processor::new(
        persister,
        publisher,
        config.fc_topic.clone(),
        config.eph_topic.clone(),
    );

    // Front-door stand-in: one JSON envelope per stdin line. The HTTP/RPC
    // layer that normally decodes the envelope lives outside this crate.
    log::info!("📡 Reading envelopes from stdin...");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                log::error!("Failed reading stdin: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let envelope: ReqPayload = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(err) => {
                log::error!("Dropping undecodable envelope: {err}");
                continue;
            }
        };

        if envelope.header.invalid_payload {
            // Validation happened upstream; record the row and redirect the
            // envelope to the error topic.
            if let Err(err) = processor.save_invalid_payload(&envelope).await {
                log::error!("Failed to record invalid payload: {err}");
            }
            if let Err(err) = error_sink.handle_invalid_payload(&envelope).await {
                log::error!("Failed to redirect invalid payload: {err}");
            }
        } else {
            processor.process_envelope(&envelope).await;
        }
    }

    log::info!("✅ Input drained, shutting down");
    Ok(())
}
