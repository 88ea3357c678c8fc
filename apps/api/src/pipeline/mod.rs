// Email ingestion pipeline: extract hints, classify, reconcile against stored applications.
// Persistence goes through `store::JobStore` only.

pub mod classifier;
pub mod extractor;
pub mod handlers;
pub mod reconciler;
pub mod store;
