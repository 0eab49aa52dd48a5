use {
    crate::classifier::{classify, Channel},
    crate::errors::ProcessorError,
    crate::xml_tree::XmlElement,
    chrono::{DateTime, NaiveDate, NaiveDateTime, Utc},
};

/// One status-report line item pulled out of the inbound document.
#[derive(Debug, Clone, PartialEq)]
pub struct Camt59Fields {
    /// Business message id from the application header, shared by all items.
    pub biz_msg_idr: String,
    pub end_to_end_id: String,
    pub orgnl_itm_id: String,
    /// Settlement amount exactly as written in the source.
    pub amount: String,
    pub channel: Channel,
}

/// Header identifiers plus the ordered item list for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMessage {
    pub biz_msg_idr: String,
    pub msg_def_idr: String,
    pub batch_timestamp: NaiveDateTime,
    pub batch_date: NaiveDate,
    pub items: Vec<Camt59Fields>,
}

impl ExtractedMessage {
    /// Distinct channels present among the items, FC first.
    pub fn channels_present(&self) -> Vec<Channel> {
        [Channel::Fc, Channel::Eph]
            .into_iter()
            .filter(|channel| self.items.iter().any(|item| item.channel == *channel))
            .collect()
    }
}

/// Pull header identifiers and every line item out of a parsed document.
///
/// Items are matched by local name anywhere under the `Document` block,
/// regardless of nesting depth or namespace prefix. Missing per-item fields
/// yield empty strings; an unparseable header timestamp aborts the message.
pub fn extract(doc: &XmlElement) -> Result<ExtractedMessage, ProcessorError> {
    let app_hdr = doc.child("AppHdr");
    let biz_msg_idr = app_hdr
        .map(|hdr| hdr.child_text("BizMsgIdr"))
        .unwrap_or_default();
    let msg_def_idr = app_hdr
        .map(|hdr| hdr.child_text("MsgDefIdr"))
        .unwrap_or_default();
    let cre_dt = app_hdr
        .map(|hdr| hdr.child_text("CreDt"))
        .unwrap_or_default();

    // One parse feeds both the timestamp and the calendar-date view, so the
    // two can never disagree on the same input. The source shape is a strict
    // UTC-designated ISO 8601 timestamp.
    let created: DateTime<Utc> = DateTime::parse_from_rfc3339(&cre_dt)?.with_timezone(&Utc);
    let batch_timestamp = created.naive_utc();
    let batch_date = created.date_naive();

    let items = match doc.child("Document") {
        Some(document) => document
            .find_all("OrgnlItmAndSts")
            .into_iter()
            .map(|item| build_fields(item, &biz_msg_idr))
            .collect(),
        None => Vec::new(),
    };

    Ok(ExtractedMessage {
        biz_msg_idr,
        msg_def_idr,
        batch_timestamp,
        batch_date,
        items,
    })
}

fn build_fields(item: &XmlElement, biz_msg_idr: &str) -> Camt59Fields {
    let orgnl_itm_id = item.child_text("OrgnlItmId");
    let channel = classify(&orgnl_itm_id);
    Camt59Fields {
        biz_msg_idr: biz_msg_idr.to_string(),
        end_to_end_id: item.child_text("OrgnlEndToEndId"),
        orgnl_itm_id,
        amount: item.child_text("Amt"),
        channel,
    }
}
