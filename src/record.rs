//! Per-model records and the accumulator that merges facts into them.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// A decimal value rounded half away from zero to two places.
///
/// Stored as an exact count of hundredths, so it always renders two
/// fractional digits (`100.50`, `7.00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed2(i64);

impl Fixed2 {
    /// Rounds an exact decimal, or `None` if it does not fit.
    pub fn from_decimal(value: &BigDecimal) -> Option<Self> {
        let (digits, scale) = value
            .with_scale_round(2, RoundingMode::HalfUp)
            .into_bigint_and_exponent();
        debug_assert_eq!(scale, 2);
        digits.to_i64().map(Self)
    }

    pub fn to_decimal(self) -> BigDecimal {
        BigDecimal::new(BigInt::from(self.0), 2)
    }

    /// Value as a float, for consumers that want a plain number.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `self / divisor`, rounded; `None` for a zero divisor.
    pub fn per(self, divisor: u32) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        Self::from_decimal(&(self.to_decimal() / BigDecimal::from(divisor)))
    }
}

impl FromStr for Fixed2 {
    type Err = bigdecimal::ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = BigDecimal::from_str(s)?;
        Self::from_decimal(&value).ok_or_else(|| {
            bigdecimal::ParseBigDecimalError::Other(format!("{s} is out of range"))
        })
    }
}

impl fmt::Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Fixed2 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single measurement attributed to a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fact {
    Volume(Fixed2),
    Weight(u32),
}

/// Everything known about one model.
///
/// Field order matches the report columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub model: String,
    pub weight: Option<u32>,
    pub volume: Option<Fixed2>,
    pub ratio: Option<Fixed2>,
}

impl Record {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            weight: None,
            volume: None,
            ratio: None,
        }
    }

    fn apply(&mut self, fact: Fact) {
        match fact {
            Fact::Volume(v) => self.volume = Some(v),
            Fact::Weight(w) => self.weight = Some(w),
        }

        // A zero weight leaves the ratio unset instead of infinite.
        self.ratio = match (self.volume, self.weight) {
            (Some(v), Some(w)) => v.per(w),
            _ => None,
        };
    }
}

/// Owns every [`Record`] produced during a run, keyed by model name.
#[derive(Debug, Default)]
pub struct Accumulator {
    records: HashMap<String, Record>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `fact` into the record for `model`, creating it on first sight.
    ///
    /// Last write wins; the ratio is recomputed after every write.
    pub fn record_fact(&mut self, model: &str, fact: Fact) {
        let record = self
            .records
            .entry(model.to_string())
            .or_insert_with(|| Record::new(model));
        record.apply(fact);

        trace!(model, ?fact, ratio = ?record.ratio, "Fact recorded");
    }

    pub fn get(&self, model: &str) -> Option<&Record> {
        self.records.get(model)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that have both a volume and a weight.
    pub fn complete_count(&self) -> usize {
        self.records.values().filter(|r| r.ratio.is_some()).count()
    }

    /// Consumes the accumulator, yielding records in no particular order.
    pub fn into_records(self) -> Vec<Record> {
        self.records.into_values().collect()
    }
}
