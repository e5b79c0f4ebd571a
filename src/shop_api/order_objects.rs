use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Order, Product};

/// The result of an allocation attempt on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub order: Order,
    /// The code payloads bound to the order, in binding order.
    pub codes: Vec<String>,
    /// Advisory count of unsold units left for the product after this allocation.
    pub remaining: i64,
    /// `true` when this call was a replay against an already-approved order and no inventory was touched.
    pub already: bool,
}

/// An order together with its bound codes and the product's advisory remaining stock. This is the shape the
/// request layer returns for order-status lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithCodes {
    pub order: Order,
    pub codes: Vec<String>,
    pub remaining: i64,
}

/// A product annotated with its advisory unsold-unit count at read time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub stock: i64,
}

/// The result of a bulk code intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockAdded {
    /// How many code units were appended.
    pub added: i64,
    /// Advisory unsold count for the product after the intake.
    pub stock: i64,
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{OrderId, OrderStatusType, UsdAmount};

    // The request layer serialises these objects verbatim, so their JSON shape is part of the engine's contract.
    #[test]
    fn allocation_result_serialises_with_codes_and_remaining() {
        let order = Order {
            id: 1,
            order_id: OrderId("CS-20260810-AAAAAA".into()),
            product_id: 1,
            qty: 2,
            total: UsdAmount::from_cents(200),
            pay_method: "BTC".into(),
            txid: "deadbeef".into(),
            contact: None,
            status: OrderStatusType::Approved,
            created_at: Utc::now(),
            approved_at: Some(Utc::now()),
        };
        let result = AllocationResult {
            order,
            codes: vec!["CODE-1".into(), "CODE-2".into()],
            remaining: 1,
            already: false,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["codes"], serde_json::json!(["CODE-1", "CODE-2"]));
        assert_eq!(json["remaining"], 1);
        assert_eq!(json["already"], false);
        assert_eq!(json["order"]["status"], "Approved");
        assert_eq!(json["order"]["total"], 200);
    }
}
