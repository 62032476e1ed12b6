//! Order orchestration: build the processor payload, call the processor, map
//! the response.

use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::dtos::{OrderRequest, OrderView};
use crate::services::builder::build_create_order_request;
use crate::services::mapper::map_order;
use crate::services::metrics::record_order_created;
use crate::services::square::{PaymentProcessor, ProcessorError, SearchOrdersRequest};

#[derive(Clone)]
pub struct OrderService {
    processor: Arc<dyn PaymentProcessor>,
    location_id: String,
}

impl OrderService {
    pub fn new(processor: Arc<dyn PaymentProcessor>, location_id: impl Into<String>) -> Self {
        Self {
            processor,
            location_id: location_id.into(),
        }
    }

    /// Create the order remotely and return the processor's view of it.
    #[instrument(skip(self, request), fields(table_number = %request.table_number, items = request.items.len()))]
    pub async fn create_order(&self, request: &OrderRequest) -> Result<OrderView, AppError> {
        let payload = build_create_order_request(&self.location_id, request)?;

        let result = match self.processor.create_order(&payload).await {
            Ok(order) => map_order(&order),
            Err(e) => Err(e),
        };

        match result {
            Ok(view) => {
                record_order_created("success");
                info!(order_id = %view.id, "Order created");
                Ok(view)
            }
            Err(e) => {
                record_order_created("error");
                error!(error = %e, "Failed to create order");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<OrderView, AppError> {
        let order = self
            .processor
            .retrieve_order(order_id)
            .await
            .and_then(|order| {
                order.ok_or_else(|| {
                    ProcessorError::NotFound(format!("Order with ID {} was not found.", order_id))
                })
            })
            .map_err(|e| {
                error!(error = %e, "Failed to retrieve order");
                e
            })?;

        Ok(map_order(&order)?)
    }

    /// Orders at the configured location whose reference matches the table.
    /// The processor returns every order for the location; filtering is local.
    #[instrument(skip(self))]
    pub async fn get_orders_by_table(&self, table_number: &str) -> Result<Vec<OrderView>, AppError> {
        let request = SearchOrdersRequest {
            location_ids: vec![self.location_id.clone()],
        };

        let orders = self.processor.search_orders(&request).await.map_err(|e| {
            error!(error = %e, "Failed to search orders");
            e
        })?;

        let views = orders
            .iter()
            .filter(|order| order.reference_id.as_deref() == Some(table_number))
            .map(map_order)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            searched = orders.len(),
            matched = views.len(),
            "Orders for table retrieved"
        );

        Ok(views)
    }
}
