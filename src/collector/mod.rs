/// Collector module
///
/// This module groups the logic responsible for:
/// - Running one collection cycle per exchange
/// - Pacing market requests
/// - Handing collected rows to the persistence gateway
///
/// The collector layer acts as the orchestration layer between:
/// - Market sources (Upbit, Bithumb REST clients)
/// - The `VolumeStore` (output layer)
///
/// Design notes:
/// - Exchange-specific logic MUST NOT live here
/// - Per-market failures are logged and skipped, never propagated
pub mod runner;
