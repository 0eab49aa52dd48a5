use serde::{Deserialize, Serialize};

/// Envelope header attached by the upstream front door.
///
/// Every field is optional on the wire; missing fields deserialize to their
/// defaults so a sparse envelope still routes through the flow-type check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Header {
    pub msg_id: String,
    pub source: String,
    pub target: String,
    pub flow_type: String,
    pub replay_ind: bool,
    pub invalid_payload: bool,
    /// Free-text prefix applied to both payload snapshots in tracker rows.
    pub prefix: String,
    pub status: String,
    pub msg_type: String,
}

/// Envelope body holding the raw CAMT.059 XML text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    pub payload: String,
}

/// Inbound request envelope: header metadata plus the raw XML payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReqPayload {
    pub header: Header,
    pub body: Body,
}

impl Header {
    /// Only inward-flow messages are processed; everything else is a no-op.
    pub fn is_inward(&self) -> bool {
        self.flow_type.eq_ignore_ascii_case("INWARD")
    }
}
