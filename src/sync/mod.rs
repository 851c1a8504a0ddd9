//! Blockchain catch-up subsystem.
//!
//! - [`forward_cache::ForwardCache`]: bounded concurrent prefetcher that
//!   overlaps sequential block and receipt fetches with the consumer
//! - [`tps::TpsRegulator`]: sliding-window rate limiter gating outbound
//!   store calls

pub mod forward_cache;
pub mod tps;
