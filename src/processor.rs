use {
    crate::aggregator,
    crate::classifier::Channel,
    crate::envelope::ReqPayload,
    crate::errors::ProcessorError,
    crate::extractor,
    crate::partitioner,
    crate::persistence::Persister,
    crate::publisher::Publisher,
    crate::records,
    crate::xml_tree,
    std::sync::Arc,
};

/// Single-pass pipeline for one inbound CAMT.059 message.
///
/// Stateless: every invocation owns its own extracted items and records, so
/// any number of messages may be processed concurrently. Blocking is confined
/// to the persister and publisher calls.
pub struct Camt59Processor {
    persister: Arc<dyn Persister>,
    publisher: Arc<dyn Publisher>,
    fc_topic: String,
    eph_topic: String,
}

impl Camt59Processor {
    pub fn new(
        persister: Arc<dyn Persister>,
        publisher: Arc<dyn Publisher>,
        fc_topic: String,
        eph_topic: String,
    ) -> Self {
        Self {
            persister,
            publisher,
            fc_topic,
            eph_topic,
        }
    }

    fn topic_for(&self, channel: Channel) -> &str {
        match channel {
            Channel::Fc => &self.fc_topic,
            Channel::Eph => &self.eph_topic,
        }
    }

    /// Message boundary: failures are logged and swallowed so one bad message
    /// never crashes the host loop or blocks the next message.
    pub async fn process_envelope(&self, envelope: &ReqPayload) {
        if let Err(err) = self.process_inward_message(envelope).await {
            log::error!(
                "❌ Error processing CAMT.059 message {:?}: {err}",
                envelope.header.msg_id
            );
        }
    }

    /// Parse, classify, partition, aggregate, and record one inward message.
    ///
    /// Sequencing per message: for each channel present (FC first), persist
    /// the tracker row and then publish the filtered document; after both
    /// channel branches, persist all audit rows in one batch. A parse failure
    /// anywhere aborts before the first persist call.
    pub async fn process_inward_message(&self, envelope: &ReqPayload) -> Result<(), ProcessorError> {
        if !envelope.header.is_inward() {
            log::debug!(
                "Skipping non-inward message {:?} (flow type {:?})",
                envelope.header.msg_id,
                envelope.header.flow_type
            );
            return Ok(());
        }

        let raw_xml = &envelope.body.payload;
        let original = xml_tree::parse(raw_xml)?;
        let extracted = extractor::extract(&original)?;

        // Both totals are computed up front so a malformed amount on either
        // channel aborts the message before anything is persisted.
        let fc_total = aggregator::sum_amounts(&extracted.items, Channel::Fc)?;
        let eph_total = aggregator::sum_amounts(&extracted.items, Channel::Eph)?;
        let audits = records::build_audits(&extracted, raw_xml)?;

        for channel in extracted.channels_present() {
            let consolidated = match channel {
                Channel::Fc => fc_total,
                Channel::Eph => eph_total,
            };
            let (min_digit, max_digit) = channel.digit_range();
            let filtered = partitioner::partition(&original, min_digit, max_digit);
            let filtered_xml = filtered.to_xml(true);

            let tracker = records::build_tracker(
                envelope,
                &extracted,
                channel,
                &filtered_xml,
                consolidated,
            );
            self.persister.save_tracker(&tracker).await?;
            self.publisher
                .publish(&filtered_xml, self.topic_for(channel), &tracker.msg_id)
                .await?;

            log::info!(
                "📦 {} batch for {}: {} of {} items, consolidated {}",
                channel.as_str(),
                tracker.msg_id,
                tracker.intermediate_count.unwrap_or_default(),
                tracker.orgnl_req_count.unwrap_or_default(),
                consolidated
            );
        }

        self.persister.save_audit_batch(&audits).await?;
        log::info!(
            "✅ Message {} processed: {} audit rows",
            extracted.biz_msg_idr,
            audits.len()
        );
        Ok(())
    }

    /// Record an envelope the upstream validation layer flagged invalid.
    ///
    /// Only the message id is read from the payload; the rest of the row comes
    /// from the envelope header.
    pub async fn save_invalid_payload(&self, envelope: &ReqPayload) -> Result<(), ProcessorError> {
        let original = xml_tree::parse(&envelope.body.payload)?;
        let msg_id = original
            .child("AppHdr")
            .map(|hdr| hdr.child_text("BizMsgIdr"))
            .unwrap_or_default();

        let tracker = records::build_invalid_payload_tracker(envelope, &msg_id);
        self.persister.save_tracker(&tracker).await
    }
}
