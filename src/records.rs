use {
    crate::aggregator,
    crate::classifier::Channel,
    crate::envelope::ReqPayload,
    crate::errors::ProcessorError,
    crate::extractor::ExtractedMessage,
    chrono::{NaiveDate, NaiveDateTime},
    rust_decimal::Decimal,
};

pub const SOURCE_SFMS: &str = "SFMS";
pub const STATUS_SENT_TO_DISPATCHER: &str = "SENT_TO_DISPATCHER";
pub const MSG_TYPE_CAMT59: &str = "camt.059.001.06";
pub const FLOW_INWARD: &str = "INWARD";
/// Batch id column is populated with a single space upstream.
pub const BLANK_BATCH_ID: &str = " ";

/// One dispatch-attempt row, written once per channel actually used by a
/// message. Immutable after construction.
#[derive(Debug, Clone)]
pub struct TrackerRecord {
    pub msg_id: String,
    pub source: String,
    pub target: String,
    pub flow_type: String,
    pub batch_id: String,
    pub status: String,
    pub msg_type: String,
    /// Prefixed original payload.
    pub orgnl_req: String,
    /// Prefixed filtered payload; absent on invalid-payload rows.
    pub intermediate_req: Option<String>,
    pub batch_date: Option<NaiveDate>,
    pub batch_timestamp: Option<NaiveDateTime>,
    pub invalid_payload: bool,
    pub consolidate_amt: Option<Decimal>,
    /// Items routed to this channel.
    pub intermediate_count: Option<i64>,
    /// All items in the message, both channels.
    pub orgnl_req_count: Option<i64>,
    /// Snapshot of the structured inbound envelope.
    pub transformed_json_req: Option<ReqPayload>,
}

/// One per-item audit row, written regardless of channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub msg_id: String,
    pub end_to_end_id: String,
    pub txn_id: String,
    pub msg_type: String,
    pub source: String,
    pub amount: Decimal,
    pub target: String,
    pub batch_date: NaiveDate,
    pub batch_timestamp: NaiveDateTime,
    pub flow_type: String,
    pub req_payload: String,
}

/// Build the tracker row for one channel batch.
pub fn build_tracker(
    envelope: &ReqPayload,
    extracted: &ExtractedMessage,
    channel: Channel,
    filtered_xml: &str,
    consolidated: Decimal,
) -> TrackerRecord {
    let prefix = &envelope.header.prefix;
    let channel_count = extracted
        .items
        .iter()
        .filter(|item| item.channel == channel)
        .count() as i64;

    TrackerRecord {
        msg_id: extracted.biz_msg_idr.clone(),
        source: SOURCE_SFMS.to_string(),
        target: channel.dispatcher_target().to_string(),
        flow_type: envelope.header.flow_type.clone(),
        batch_id: BLANK_BATCH_ID.to_string(),
        status: STATUS_SENT_TO_DISPATCHER.to_string(),
        msg_type: extracted.msg_def_idr.clone(),
        orgnl_req: format!("{prefix}{}", envelope.body.payload),
        intermediate_req: Some(format!("{prefix}{filtered_xml}")),
        batch_date: Some(extracted.batch_date),
        batch_timestamp: Some(extracted.batch_timestamp),
        invalid_payload: envelope.header.invalid_payload,
        consolidate_amt: Some(consolidated),
        intermediate_count: Some(channel_count),
        orgnl_req_count: Some(extracted.items.len() as i64),
        transformed_json_req: Some(envelope.clone()),
    }
}

/// Build the minimal tracker row for an envelope flagged invalid upstream.
pub fn build_invalid_payload_tracker(envelope: &ReqPayload, msg_id: &str) -> TrackerRecord {
    TrackerRecord {
        msg_id: msg_id.to_string(),
        source: SOURCE_SFMS.to_string(),
        target: envelope.header.target.clone(),
        flow_type: String::new(),
        batch_id: BLANK_BATCH_ID.to_string(),
        status: String::new(),
        msg_type: String::new(),
        orgnl_req: format!("{}{}", envelope.header.prefix, envelope.body.payload),
        intermediate_req: None,
        batch_date: None,
        batch_timestamp: None,
        invalid_payload: envelope.header.invalid_payload,
        consolidate_amt: None,
        intermediate_count: None,
        orgnl_req_count: None,
        transformed_json_req: None,
    }
}

/// Build one audit row per extracted item, in item order.
pub fn build_audits(
    extracted: &ExtractedMessage,
    raw_xml: &str,
) -> Result<Vec<AuditRecord>, ProcessorError> {
    extracted
        .items
        .iter()
        .map(|item| {
            Ok(AuditRecord {
                msg_id: extracted.biz_msg_idr.clone(),
                end_to_end_id: item.end_to_end_id.clone(),
                txn_id: item.orgnl_itm_id.clone(),
                msg_type: MSG_TYPE_CAMT59.to_string(),
                source: SOURCE_SFMS.to_string(),
                amount: aggregator::parse_amount(item)?,
                target: item.channel.audit_target().to_string(),
                batch_date: extracted.batch_date,
                batch_timestamp: extracted.batch_timestamp,
                flow_type: FLOW_INWARD.to_string(),
                req_payload: raw_xml.to_string(),
            })
        })
        .collect()
}
