use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, Result};
use crate::util;

// ------------------------------------------------------------
// Exchange identifier
// ------------------------------------------------------------
//
// The fixed set of exchanges this system collects from.
//
// IMPORTANT:
// - Declaration order is the canonical display order
//   (pivot columns, share chart, ranking tables).
// - Serialized names are lowercase and stored as-is in the
//   `exchange` column.
//
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Upbit,
    Bithumb,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Upbit, Exchange::Bithumb];

    /// Canonical lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Exchange::Upbit => "upbit",
            Exchange::Bithumb => "bithumb",
        }
    }

    /// Default public REST endpoint.
    pub fn base_url(self) -> &'static str {
        match self {
            Exchange::Upbit => "https://api.upbit.com",
            Exchange::Bithumb => "https://api.bithumb.com",
        }
    }

    /// Resolves an identifier case-insensitively.
    ///
    /// Fails with `UnsupportedExchange` listing every supported name.
    pub fn parse(raw: &str) -> Result<Self> {
        let key = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.name() == key)
            .ok_or_else(|| CollectorError::UnsupportedExchange {
                name: raw.to_string(),
                supported: Self::ALL.iter().map(|e| e.name()).collect(),
            })
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ------------------------------------------------------------
// Collected candle
// ------------------------------------------------------------
//
// One market's latest hourly candle, before it is stamped with
// the exchange by the persistence gateway.
//
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedCandle {
    /// Exchange symbol, e.g. "KRW-BTC"
    pub market: String,

    /// Candle time in KST civil time
    pub datetime_kst: NaiveDateTime,

    /// Cumulative traded value for the hour (quote currency)
    pub traded_price: f64,
}

impl CollectedCandle {
    pub fn into_row(self, exchange: Exchange) -> MarketRow {
        MarketRow {
            exchange,
            market: self.market,
            datetime_kst: self.datetime_kst,
            traded_price: self.traded_price,
        }
    }
}

// ------------------------------------------------------------
// Stored row
// ------------------------------------------------------------
//
// Mirrors one record of the `hourly_volume` table.
//
// Natural key: (exchange, market, datetime_kst).
// A later write for the same key overwrites the value.
//
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRow {
    pub exchange: Exchange,

    pub market: String,

    #[serde(with = "util::kst_datetime")]
    pub datetime_kst: NaiveDateTime,

    #[serde(deserialize_with = "util::lenient_number::deserialize")]
    pub traded_price: f64,
}
