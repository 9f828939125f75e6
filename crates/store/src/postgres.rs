use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{Money, Order, OrderId, OrderItem, OrderStatus, ProductId, UserId};

use crate::{
    CommitOutcome, FulfillmentStore, InventoryRecord, InventoryStore, OrderStore, Result,
    StockDecrement, StockRequest, StockVersion, StoreError,
};

/// PostgreSQL-backed fulfillment store implementation.
///
/// The conditional decrement is a single `UPDATE ... WHERE version = $n AND
/// quantity >= $q`, so the version check and the write are one atomic
/// statement. The processing commit wraps every decrement and the status
/// transition in one transaction.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL fulfillment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<InventoryRecord> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(InventoryRecord {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::CorruptRecord(format!("negative stock: {quantity}")))?,
            version: StockVersion::new(row.try_get("version")?),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: u32::try_from(quantity).map_err(|_| {
                StoreError::CorruptRecord(format!("negative item quantity: {quantity}"))
            })?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn get_record(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        let row = sqlx::query(
            r#"SELECT product_id, quantity, version FROM inventory WHERE product_id = $1"#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn upsert_record(&self, record: InventoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity, version)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, version = EXCLUDED.version
            "#,
        )
        .bind(record.product_id.as_str())
        .bind(record.quantity as i32)
        .bind(record.version.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn snapshot_versions(
        &self,
        requests: &[StockRequest],
    ) -> Result<HashMap<ProductId, StockVersion>> {
        let product_ids: Vec<String> = requests
            .iter()
            .map(|r| r.product_id.as_str().to_string())
            .collect();

        let rows = sqlx::query(
            r#"SELECT product_id, quantity, version FROM inventory WHERE product_id = ANY($1)"#,
        )
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut records = HashMap::new();
        for row in rows {
            let record = Self::row_to_record(row)?;
            records.insert(record.product_id.clone(), record);
        }

        let mut versions = HashMap::new();
        let mut insufficient = Vec::new();

        for request in requests {
            match records.get(&request.product_id) {
                Some(record) if record.quantity >= request.quantity => {
                    versions.insert(request.product_id.clone(), record.version);
                }
                _ => insufficient.push(request.product_id.clone()),
            }
        }

        if !insufficient.is_empty() {
            return Err(StoreError::InsufficientStock {
                product_ids: insufficient,
            });
        }

        Ok(versions)
    }

    async fn decrement(
        &self,
        product_id: &ProductId,
        expected_version: StockVersion,
        quantity: u32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - $3, version = version + 1
            WHERE product_id = $1 AND version = $2 AND quantity >= $3
            "#,
        )
        .bind(product_id.as_str())
        .bind(expected_version.as_i64())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_amount_cents, shard_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.total_amount().cents())
        .bind(order.shard_id() as i32)
        .bind(order.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id());
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(item.product_id.as_str())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, user_id, status, total_amount_cents, shard_id, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;

        let status: OrderStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|e: common::OrderStatusParseError| StoreError::CorruptRecord(e.to_string()))?;

        let shard_id: i32 = row.try_get("shard_id")?;

        Ok(Some(Order::from_parts(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            Money::from_cents(row.try_get("total_amount_cents")?),
            u32::try_from(shard_id)
                .map_err(|_| StoreError::CorruptRecord(format!("negative shard id: {shard_id}")))?,
            items,
            row.try_get("created_at")?,
        )))
    }
}

#[async_trait]
impl FulfillmentStore for PostgresStore {
    async fn commit_processing(
        &self,
        order_id: OrderId,
        decrements: &[StockDecrement],
    ) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        for decrement in decrements {
            let result = sqlx::query(
                r#"
                UPDATE inventory
                SET quantity = quantity - $3, version = version + 1
                WHERE product_id = $1 AND version = $2 AND quantity >= $3
                "#,
            )
            .bind(decrement.product_id.as_str())
            .bind(decrement.expected_version.as_i64())
            .bind(decrement.quantity as i32)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                // Dropping the transaction rolls back every prior decrement.
                tracing::debug!(
                    product_id = %decrement.product_id,
                    expected_version = %decrement.expected_version,
                    "conditional decrement missed"
                );
                return Ok(CommitOutcome::Conflict {
                    product_id: decrement.product_id.clone(),
                });
            }
        }

        let updated = sqlx::query(r#"UPDATE orders SET status = $2 WHERE id = $1"#)
            .bind(order_id.as_uuid())
            .bind(OrderStatus::Processed.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() != 1 {
            return Err(StoreError::OrderNotFound(order_id));
        }

        tx.commit().await?;
        Ok(CommitOutcome::Committed)
    }
}
