use {
    crate::envelope::ReqPayload,
    crate::errors::ProcessorError,
    async_trait::async_trait,
    std::sync::Arc,
};

/// Topic-based hand-off for generated sub-documents.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &str, topic: &str, key: &str) -> Result<(), ProcessorError>;
}

/// Stand-in publisher that logs instead of hitting a broker.
///
/// The production deployment swaps this for the real topic binding; the
/// processor only ever sees the trait.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, payload: &str, topic: &str, key: &str) -> Result<(), ProcessorError> {
        log::info!(
            "📤 Published {} bytes to topic {} (key {})",
            payload.len(),
            topic,
            key
        );
        Ok(())
    }
}

/// Redirection path for envelopes flagged invalid upstream.
///
/// Retargets the envelope at the error topic and republishes its serialized
/// form, keyed by message id.
pub struct ErrorSink {
    publisher: Arc<dyn Publisher>,
    error_topic: String,
}

impl ErrorSink {
    pub fn new(publisher: Arc<dyn Publisher>, error_topic: String) -> Self {
        Self {
            publisher,
            error_topic,
        }
    }

    pub async fn handle_invalid_payload(&self, envelope: &ReqPayload) -> Result<(), ProcessorError> {
        let mut retargeted = envelope.clone();
        retargeted.header.target = self.error_topic.clone();

        let serialized = serde_json::to_string(&retargeted)
            .map_err(|err| ProcessorError::Publish(format!("envelope serialization: {err}")))?;

        self.publisher
            .publish(&serialized, &self.error_topic, &retargeted.header.msg_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Header;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            payload: &str,
            topic: &str,
            key: &str,
        ) -> Result<(), ProcessorError> {
            self.published.lock().unwrap().push((
                payload.to_string(),
                topic.to_string(),
                key.to_string(),
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_error_sink_retargets_and_republishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let sink = ErrorSink::new(publisher.clone(), "nil-error-topic".to_string());

        let envelope = ReqPayload {
            header: Header {
                msg_id: "MSG123".to_string(),
                target: "dispatcher".to_string(),
                invalid_payload: true,
                ..Header::default()
            },
            ..ReqPayload::default()
        };
        sink.handle_invalid_payload(&envelope).await.unwrap();

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (payload, topic, key) = &published[0];
        assert_eq!(topic, "nil-error-topic");
        assert_eq!(key, "MSG123");
        // The serialized envelope carries the rewritten target.
        let reparsed: ReqPayload = serde_json::from_str(payload).unwrap();
        assert_eq!(reparsed.header.target, "nil-error-topic");
    }
}
