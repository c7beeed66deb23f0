//! Data models for the retail back office.
//!
//! This module contains the records served by the REST API and held in the
//! client-side cache:
//!
//! - Catalog attributes: `Category`, `Brand`, `Variant`, `Color`, `Condition`, `Source`
//! - Shops and per-shop stock: `Shop`, `SubStock`
//! - Inventory: `Product`, `StockBatch`
//! - `Customer` records and `DashboardStats` totals
//! - The authenticated `User` and its `Role`

pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod shop;
pub mod stats;
pub mod user;

pub use catalog::{Brand, Category, Color, Condition, Source, Variant};
pub use customer::Customer;
pub use inventory::{Product, StockBatch};
pub use shop::{Shop, SubStock};
pub use stats::DashboardStats;
pub use user::{Capabilities, Role, ShopRef, User};
