//! Repositories over the shared pool.
//!
//! | repository          | tables                | written by              |
//! |---------------------|-----------------------|-------------------------|
//! | [`ProductRepository`] | `products`          | catalog screens, seed, stock deltas |
//! | [`SaleRepository`]    | `sales`, `sale_items` | checkout, reconciliation |
//!
//! Lookups return `Option`; writes that match no row return
//! [`DbError::NotFound`](crate::DbError::NotFound).
//!
//! [`ProductRepository`]: product::ProductRepository
//! [`SaleRepository`]: sale::SaleRepository

pub mod product;
pub mod sale;
