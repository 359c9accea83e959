// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:     Configuration loaded from JSON + store credentials
// - error:      Error taxonomy shared by all components
// - schema:     Exchange identifiers and row types
// - util:       KST time helpers and lenient JSON extraction
// - exchanges:  Exchange adapters, registry and REST client
// - collector:  Per-exchange collection cycle
// - store:      Persistence gateway (upsert + windowed read)
// - report:     Aggregation, window cache and dashboard server
// - logging:    Console + rotating file logger
// - metrics:    Process-wide counters
//
pub mod collector;
pub mod config;
pub mod error;
pub mod exchanges;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod schema;
pub mod store;
pub mod util;

#[cfg(test)]
mod test_support;
