//! DataFrame and parquet export of finalized pattern counts

use crate::error::Result;
use crate::histogram::SparsePatternIndex;
use polars::prelude::*;
use polars_io::prelude::ParquetWriter;
use std::fs::File;
use std::path::Path;

/// Create a DataFrame with one row per observed pattern.
///
/// Columns: `pattern` (u32), `count` (u64), `channels` (u32, coincidence order)
pub fn to_dataframe(index: &SparsePatternIndex) -> std::result::Result<DataFrame, PolarsError> {
    let patterns: Vec<u32> = index.iter().map(|e| e.pattern.bits() as u32).collect();
    let counts: Vec<u64> = index.iter().map(|e| e.count).collect();
    let orders: Vec<u32> = index.iter().map(|e| e.pattern.order()).collect();

    DataFrame::new(vec![
        Series::new("pattern".into(), &patterns).into(),
        Series::new("count".into(), &counts).into(),
        Series::new("channels".into(), &orders).into(),
    ])
}

/// Patterns in which exactly `order` channels fired together
pub fn patterns_of_order(df: &DataFrame, order: u32) -> std::result::Result<LazyFrame, PolarsError> {
    Ok(df.clone().lazy().filter(col("channels").eq(lit(order))))
}

/// Store the sparse index as a parquet file
pub fn write_parquet(index: &SparsePatternIndex, path: impl AsRef<Path>) -> Result<()> {
    let mut df = to_dataframe(index)?;
    let mut file = File::create(path)?;
    ParquetWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
