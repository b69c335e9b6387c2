//! The batch run: parse both sheets, then order the merged records.

use anyhow::Result;
use tracing::info;

use crate::order::ReferenceOrder;
use crate::parser::{ParseKind, parse_source};
use crate::record::{Accumulator, Record};

/// Parses the dimension source, then the weight source, into one accumulator.
///
/// The weight parse only starts once the dimension parse has finished.
#[tracing::instrument]
pub async fn collect(dims: &str, weights: &str) -> Result<Accumulator> {
    let mut acc = Accumulator::new();

    parse_source(dims, ParseKind::Dims, &mut acc).await?;
    parse_source(weights, ParseKind::Weight, &mut acc).await?;

    info!(
        records = acc.len(),
        complete = acc.complete_count(),
        "Sources merged"
    );
    Ok(acc)
}

/// Consumes the accumulator and returns its records in report order.
pub fn ordered_records(acc: Accumulator, order: &ReferenceOrder) -> Vec<Record> {
    let mut records = acc.into_records();
    order.sort(&mut records);
    records
}
