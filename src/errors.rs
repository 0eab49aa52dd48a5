use thiserror::Error;

/// Failure taxonomy for one inbound message.
///
/// `Parse` aborts the whole message before anything is persisted. `Persist`
/// and `Publish` surface collaborator failures unchanged; retry policy lives
/// with the collaborators, not here.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("persistence error: {0}")]
    Persist(String),

    #[error("publish error: {0}")]
    Publish(String),
}

impl From<quick_xml::Error> for ProcessorError {
    fn from(err: quick_xml::Error) -> Self {
        ProcessorError::Parse(format!("malformed XML: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for ProcessorError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ProcessorError::Parse(format!("malformed XML attribute: {err}"))
    }
}

impl From<chrono::ParseError> for ProcessorError {
    fn from(err: chrono::ParseError) -> Self {
        ProcessorError::Parse(format!("unparseable timestamp: {err}"))
    }
}

impl From<rusqlite::Error> for ProcessorError {
    fn from(err: rusqlite::Error) -> Self {
        ProcessorError::Persist(err.to_string())
    }
}
