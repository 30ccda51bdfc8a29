use crate::domain::{
    payment::{Gateway, PaymentLogEntry},
    value_objects::{PaymentId, PaymentLogId},
};
use crate::ports::payment_log_store::{PaymentLogStore as PaymentLogStoreTrait, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::str::FromStr;

use super::invalid_data;

fn map_row_to_entry(row: &PgRow) -> Result<PaymentLogEntry> {
    let gateway_str: &str = row.get("gateway");

    Ok(PaymentLogEntry {
        log_id: PaymentLogId::from_uuid(row.get("log_id")),
        payment_id: PaymentId::from_uuid(row.get("payment_id")),
        gateway: Gateway::from_str(gateway_str).map_err(invalid_data)?,
        transaction_id: row.get("transaction_id"),
        payload: row.get("payload"),
        created_at: row.get("created_at"),
    })
}

/// PostgreSQL implementation of PaymentLogStore
///
/// Reads the append-only gateway log. Entries are written by the payment
/// repository in the same transaction as the status change. `sequence_number`
/// is a BIGSERIAL, so entries are read back in insertion order.
pub struct PaymentLogStore {
    pool: PgPool,
}

impl PaymentLogStore {
    /// Create a new PaymentLogStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append entries for one payment inside the caller's transaction
///
/// Uses batch INSERT with UNNEST. `WITH ORDINALITY` keeps the batch order
/// when sequence numbers are assigned.
pub(crate) async fn append_entries(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: PaymentId,
    entries: &[PaymentLogEntry],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut log_ids = Vec::with_capacity(entries.len());
    let mut gateways = Vec::with_capacity(entries.len());
    let mut transaction_ids = Vec::with_capacity(entries.len());
    let mut payloads = Vec::with_capacity(entries.len());
    let mut created_at_list = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.payment_id != payment_id {
            return Err(format!(
                "log entry {} belongs to payment {}, not {}",
                entry.log_id, entry.payment_id, payment_id
            )
            .into());
        }
        log_ids.push(entry.log_id.value());
        gateways.push(entry.gateway.as_str());
        transaction_ids.push(entry.transaction_id.clone());
        payloads.push(entry.payload.clone());
        created_at_list.push(entry.created_at);
    }

    sqlx::query(
        r#"
        INSERT INTO payment_logs (
            log_id,
            payment_id,
            gateway,
            transaction_id,
            payload,
            created_at
        )
        SELECT l, $1, g, t, p, c
        FROM UNNEST($2::uuid[], $3::varchar[], $4::varchar[], $5::text[], $6::timestamptz[])
            WITH ORDINALITY AS batch(l, g, t, p, c, ord)
        ORDER BY ord
        "#,
    )
    .bind(payment_id.value())
    .bind(&log_ids)
    .bind(&gateways)
    .bind(&transaction_ids)
    .bind(&payloads)
    .bind(&created_at_list)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl PaymentLogStoreTrait for PaymentLogStore {
    /// Load all entries for a payment in the order they were appended
    async fn load(&self, payment_id: PaymentId) -> Result<Vec<PaymentLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT log_id, payment_id, gateway, transaction_id, payload, created_at
            FROM payment_logs
            WHERE payment_id = $1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(payment_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_entry).collect()
    }

    async fn find_by_gateway(&self, gateway: Gateway) -> Result<Vec<PaymentLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT log_id, payment_id, gateway, transaction_id, payload, created_at
            FROM payment_logs
            WHERE gateway = $1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(gateway.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_entry).collect()
    }

    /// Stream all entries in insertion order
    fn stream_all(&self) -> BoxStream<'_, Result<PaymentLogEntry>> {
        let stream = sqlx::query(
            r#"
            SELECT log_id, payment_id, gateway, transaction_id, payload, created_at
            FROM payment_logs
            ORDER BY sequence_number ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|row_result| -> Result<PaymentLogEntry> {
            let row = row_result?;
            map_row_to_entry(&row)
        });

        Box::pin(stream)
    }
}
