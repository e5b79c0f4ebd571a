use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Sub},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     UsdAmount       ---------------------------------------------------------
/// A fixed-point USD amount, stored as an integer number of cents.
///
/// All prices and order totals in the engine are `UsdAmount`s. Using integer cents keeps arithmetic exact; the
/// 2-decimal rendering only happens at display time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UsdAmount(i64);

impl UsdAmount {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount as a whole number of cents.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for UsdAmount {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Add for UsdAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for UsdAmount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for UsdAmount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for UsdAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for UsdAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The lifecycle state of an order.
///
/// `Pending` is the only initial state. `Approved` and `Rejected` are terminal; once an order reaches either, it
/// never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and is awaiting manual payment verification. No codes are bound yet.
    Pending,
    /// Payment was verified and codes have been allocated to the order.
    Approved,
    /// Payment verification failed or the order was cancelled by an admin. Inventory was never touched.
    Rejected,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Approved | OrderStatusType::Rejected)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Approved => write!(f, "Approved"),
            OrderStatusType::Rejected => write!(f, "Rejected"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        OrderId        -------------------------------------------------------
/// The externally-visible order identifier, e.g. `CS-20260810-7XK2QD`.
///
/// It is globally unique and human-auditable. See [`crate::helpers::new_order_id`] for the generation scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Product        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub category: String,
    pub unit_price: UsdAmount,
    pub image_key: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      NewProduct       -------------------------------------------------------
/// A product record to be added to the catalog. Catalog administration sits outside the engine proper; this type
/// exists for provisioning and test fixtures.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub slug: String,
    pub title: String,
    pub category: String,
    pub unit_price: UsdAmount,
    pub image_key: String,
}

impl NewProduct {
    pub fn new<S: Into<String>>(slug: S, title: S, category: S, unit_price: UsdAmount) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            category: category.into(),
            unit_price,
            image_key: "default".to_string(),
        }
    }

    pub fn with_image_key<S: Into<String>>(mut self, image_key: S) -> Self {
        self.image_key = image_key.into();
        self
    }
}

//--------------------------------------       CodeUnit        -------------------------------------------------------
/// One sellable, single-use code belonging to a product.
///
/// A unit is either unsold, or permanently consumed by exactly one order. The `sold` flag, `sold_at` timestamp and
/// owning `order_id` change together, exactly once, and are never reversed.
#[derive(Debug, Clone, FromRow)]
pub struct CodeUnit {
    pub id: i64,
    pub product_id: i64,
    pub code: String,
    pub sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub order_id: Option<OrderId>,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub qty: i64,
    /// Computed once at creation from the product price at that instant; never recomputed.
    pub total: UsdAmount,
    pub pay_method: String,
    /// The operator-attested payment transaction reference. The engine never verifies it on-chain.
    pub txid: String,
    pub contact: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// A purchase request as it arrives from the (external) request layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub product_slug: String,
    pub qty: i64,
    pub pay_method: String,
    pub txid: String,
    pub contact: Option<String>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(product_slug: S, qty: i64, pay_method: S, txid: S) -> Self {
        Self {
            product_slug: product_slug.into(),
            qty,
            pay_method: pay_method.into(),
            txid: txid.into(),
            contact: None,
        }
    }

    pub fn with_contact<S: Into<String>>(mut self, contact: S) -> Self {
        self.contact = Some(contact.into());
        self
    }
}
