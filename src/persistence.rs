use {
    crate::errors::ProcessorError,
    crate::records::{AuditRecord, TrackerRecord},
    async_trait::async_trait,
    rusqlite::Connection,
    std::sync::{Arc, Mutex},
};

/// Durable storage for tracker and audit rows.
///
/// Retry policy belongs to the implementation; the processor issues each call
/// exactly once per message and propagates failures unchanged.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Persist one dispatch-tracker row.
    async fn save_tracker(&self, tracker: &TrackerRecord) -> Result<(), ProcessorError>;

    /// Persist every audit row of one message in a single batch.
    async fn save_audit_batch(&self, audits: &[AuditRecord]) -> Result<(), ProcessorError>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS msg_event_tracker (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    msg_id TEXT NOT NULL,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    flow_type TEXT,
    batch_id TEXT,
    status TEXT,
    msg_type TEXT,
    orgnl_req TEXT,
    intermediate_req TEXT,
    batch_date TEXT,
    batch_timestamp TEXT,
    invalid_payload INTEGER NOT NULL DEFAULT 0,
    consolidate_amt TEXT,
    intermediate_count INTEGER,
    orgnl_req_count INTEGER,
    transformed_json_req TEXT
);

CREATE TABLE IF NOT EXISTS transaction_audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    msg_id TEXT NOT NULL,
    end_to_end_id TEXT,
    txn_id TEXT,
    msg_type TEXT,
    source TEXT,
    amount TEXT,
    target TEXT,
    batch_date TEXT,
    batch_timestamp TEXT,
    flow_type TEXT,
    req_payload TEXT
);
"#;

/// SQLite-backed `Persister`.
pub struct SqlitePersister {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersister {
    /// Open (or create) the database and run the idempotent schema migration.
    pub fn open(db_path: &str) -> Result<Self, ProcessorError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl Persister for SqlitePersister {
    async fn save_tracker(&self, tracker: &TrackerRecord) -> Result<(), ProcessorError> {
        let transformed = tracker
            .transformed_json_req
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| ProcessorError::Persist(format!("envelope snapshot: {err}")))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO msg_event_tracker (
                msg_id, source, target, flow_type, batch_id, status, msg_type,
                orgnl_req, intermediate_req, batch_date, batch_timestamp,
                invalid_payload, consolidate_amt, intermediate_count,
                orgnl_req_count, transformed_json_req
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                tracker.msg_id,
                tracker.source,
                tracker.target,
                tracker.flow_type,
                tracker.batch_id,
                tracker.status,
                tracker.msg_type,
                tracker.orgnl_req,
                tracker.intermediate_req,
                tracker.batch_date.map(|date| date.to_string()),
                tracker.batch_timestamp.map(|ts| ts.to_string()),
                tracker.invalid_payload,
                tracker.consolidate_amt.map(|amt| amt.to_string()),
                tracker.intermediate_count,
                tracker.orgnl_req_count,
                transformed,
            ],
        )?;
        Ok(())
    }

    async fn save_audit_batch(&self, audits: &[AuditRecord]) -> Result<(), ProcessorError> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        for audit in audits {
            tx.execute(
                r#"
                INSERT INTO transaction_audit (
                    msg_id, end_to_end_id, txn_id, msg_type, source, amount,
                    target, batch_date, batch_timestamp, flow_type, req_payload
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                rusqlite::params![
                    audit.msg_id,
                    audit.end_to_end_id,
                    audit.txn_id,
                    audit.msg_type,
                    audit.source,
                    audit.amount.to_string(),
                    audit.target,
                    audit.batch_date.to_string(),
                    audit.batch_timestamp.to_string(),
                    audit.flow_type,
                    audit.req_payload,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Channel;
    use crate::envelope::ReqPayload;
    use crate::records;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn open_test_db() -> (NamedTempFile, SqlitePersister) {
        let temp_file = NamedTempFile::new().unwrap();
        let persister = SqlitePersister::open(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, persister)
    }

    fn tracker() -> TrackerRecord {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        TrackerRecord {
            msg_id: "MSG123".to_string(),
            source: records::SOURCE_SFMS.to_string(),
            target: Channel::Fc.dispatcher_target().to_string(),
            flow_type: "INWARD".to_string(),
            batch_id: records::BLANK_BATCH_ID.to_string(),
            status: records::STATUS_SENT_TO_DISPATCHER.to_string(),
            msg_type: records::MSG_TYPE_CAMT59.to_string(),
            orgnl_req: "<RequestPayload/>".to_string(),
            intermediate_req: Some("<Filtered/>".to_string()),
            batch_date: Some(date),
            batch_timestamp: date.and_hms_opt(10, 15, 30),
            invalid_payload: false,
            consolidate_amt: Some(Decimal::from_str("100.00").unwrap()),
            intermediate_count: Some(1),
            orgnl_req_count: Some(2),
            transformed_json_req: Some(ReqPayload::default()),
        }
    }

    fn audit(txn_id: &str) -> AuditRecord {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        AuditRecord {
            msg_id: "MSG123".to_string(),
            end_to_end_id: "E2E-1".to_string(),
            txn_id: txn_id.to_string(),
            msg_type: records::MSG_TYPE_CAMT59.to_string(),
            source: records::SOURCE_SFMS.to_string(),
            amount: Decimal::from_str("100.00").unwrap(),
            target: Channel::Fc.audit_target().to_string(),
            batch_date: date,
            batch_timestamp: date.and_hms_opt(10, 15, 30).unwrap(),
            flow_type: records::FLOW_INWARD.to_string(),
            req_payload: "<RequestPayload/>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tracker_row_round_trips() {
        let (_file, persister) = open_test_db();
        persister.save_tracker(&tracker()).await.unwrap();

        let conn = persister.conn.lock().unwrap();
        let (target, amount, count): (String, String, i64) = conn
            .query_row(
                "SELECT target, consolidate_amt, intermediate_count FROM msg_event_tracker",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(target, "DISPATCHER_FC");
        assert_eq!(amount, "100.00");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_audit_batch_saves_all_rows() {
        let (_file, persister) = open_test_db();
        persister
            .save_audit_batch(&[audit("TXN1"), audit("TXN2"), audit("TXN3")])
            .await
            .unwrap();

        let conn = persister.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM transaction_audit", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_schema_migration_is_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();
        drop(SqlitePersister::open(&path).unwrap());
        // Reopening runs the migration again over the existing tables.
        let persister = SqlitePersister::open(&path).unwrap();
        persister.save_tracker(&tracker()).await.unwrap();
    }
}
