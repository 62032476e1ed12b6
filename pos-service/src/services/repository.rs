//! Local store for orders and payments.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{NewOrder, NewPayment, Order, OrderItem, Payment};
use crate::services::metrics::DB_QUERY_DURATION;

#[async_trait]
pub trait PosRepository: Send + Sync {
    /// Record an order and its items atomically.
    async fn add_order(&self, order: NewOrder) -> Result<Order, AppError>;

    /// Order by id, with its items.
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError>;

    /// Every order recorded for a table, oldest first.
    async fn get_orders_by_table(&self, table_number: &str) -> Result<Vec<Order>, AppError>;

    /// Remove an order and its items. Returns false when nothing was deleted.
    async fn delete_order(&self, order_id: &str) -> Result<bool, AppError>;

    async fn add_payment(&self, payment: NewPayment) -> Result<Payment, AppError>;

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError>;

    /// Check the store is reachable.
    async fn health_check(&self) -> Result<(), AppError>;
}

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Create a new database connection pool.
    #[instrument(skip(config), fields(service = "pos-service"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(config.url.expose_secret())
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn load_items(&self, order_ids: &[String]) -> Result<Vec<OrderItem>, AppError> {
        sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, name, quantity, price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load order items: {}", e)))
    }
}

#[async_trait]
impl PosRepository for PgRepository {
    #[instrument(skip(self, order), fields(order_id = %order.id, table_number = %order.table_number))]
    async fn add_order(&self, order: NewOrder) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_order"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let mut created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, table_number, location_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, table_number, location_id, created_at
            "#,
        )
        .bind(&order.id)
        .bind(&order.table_number)
        .bind(&order.location_id)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create order: {}", e)))?;

        for item in &order.items {
            let stored = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (order_id, name, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, name, quantity, price
                "#,
            )
            .bind(&order.id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create order item: {}", e))
            })?;
            created.items.push(stored);
        }

        tx.commit().await?;
        timer.observe_duration();

        info!(items = created.items.len(), "Order recorded");

        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, table_number, location_id, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e)))?;

        let order = match order {
            Some(mut order) => {
                order.items = self.load_items(&[order.id.clone()]).await?;
                Some(order)
            }
            None => None,
        };

        timer.observe_duration();

        Ok(order)
    }

    #[instrument(skip(self))]
    async fn get_orders_by_table(&self, table_number: &str) -> Result<Vec<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_orders_by_table"])
            .start_timer();

        let mut orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, table_number, location_id, created_at
            FROM orders
            WHERE table_number = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(table_number)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list orders: {}", e)))?;

        if !orders.is_empty() {
            let ids: Vec<String> = orders.iter().map(|o| o.id.clone()).collect();
            let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
            for item in self.load_items(&ids).await? {
                by_order.entry(item.order_id.clone()).or_default().push(item);
            }
            for order in &mut orders {
                order.items = by_order.remove(&order.id).unwrap_or_default();
            }
        }

        timer.observe_duration();

        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn delete_order(&self, order_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_order"])
            .start_timer();

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete order: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Order deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self, payment), fields(order_id = %payment.order_id))]
    async fn add_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, order_id, bill_amount, tip_amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, bill_amount, tip_amount, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&payment.order_id)
        .bind(payment.bill_amount)
        .bind(payment.tip_amount)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)))?;

        timer.observe_duration();

        info!(payment_id = %payment.id, "Payment recorded");

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, order_id, bill_amount, tip_amount, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    orders: HashMap<String, Order>,
    payments: HashMap<Uuid, Payment>,
    next_item_id: i64,
}

/// Process-local repository. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("in-memory store poisoned")))
    }
}

#[async_trait]
impl PosRepository for InMemoryRepository {
    async fn add_order(&self, order: NewOrder) -> Result<Order, AppError> {
        let mut state = self.lock()?;
        if state.orders.contains_key(&order.id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Order {} already recorded",
                order.id
            )));
        }

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            state.next_item_id += 1;
            items.push(OrderItem {
                id: state.next_item_id,
                order_id: order.id.clone(),
                name: item.name,
                quantity: item.quantity,
                price: item.price,
            });
        }

        let stored = Order {
            id: order.id,
            table_number: order.table_number,
            location_id: order.location_id,
            created_at: order.created_at,
            items,
        };
        state.orders.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.lock()?.orders.get(order_id).cloned())
    }

    async fn get_orders_by_table(&self, table_number: &str) -> Result<Vec<Order>, AppError> {
        let state = self.lock()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.table_number == table_number)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn delete_order(&self, order_id: &str) -> Result<bool, AppError> {
        // Items live inside the order, so removing it removes them too.
        Ok(self.lock()?.orders.remove(order_id).is_some())
    }

    async fn add_payment(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let stored = Payment {
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            bill_amount: payment.bill_amount,
            tip_amount: payment.tip_amount,
            created_at: Utc::now(),
        };
        self.lock()?.payments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self.lock()?.payments.get(&payment_id).cloned())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}
