use std::sync::Arc;

use polars::prelude::{DataFrame, DataType, Field, Schema, SchemaRef};
use strum::IntoEnumIterator;

use crate::{
    error::{DataError, RvResult},
    report::io::{Report, ReportName, ToSchema},
    schema::DailyRvCol,
};

/// The daily realized-variance table: one row per (symbol, trade_date, K).
///
/// Produced by the pipeline; callers own persistence. All configured bucket
/// widths are stacked into this single frame, distinguished by the `K`
/// column.
#[derive(Debug, Clone)]
pub struct DailyRv {
    df: DataFrame,
}

impl Default for DailyRv {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&Self::to_schema());
        Self { df }
    }
}

impl ReportName for DailyRv {
    fn base_name(&self) -> String {
        "daily_rv".to_string()
    }
}

impl Report for DailyRv {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }

    fn as_df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }
}

impl ToSchema for DailyRv {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = DailyRvCol::iter()
            .map(|col| {
                let dtype = match col {
                    DailyRvCol::Symbol => DataType::String,
                    DailyRvCol::TradeDate => DataType::Date,
                    DailyRvCol::K => DataType::Int32,
                    DailyRvCol::NBuckets | DailyRvCol::NRet => DataType::UInt32,
                    DailyRvCol::Rv | DailyRvCol::SigmaDaily | DailyRvCol::SigmaAnnualized => {
                        DataType::Float64
                    }
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl DailyRv {
    /// Wraps a computed frame, verifying it carries exactly the canonical
    /// columns.
    pub(crate) fn new(df: DataFrame) -> RvResult<Self> {
        let schema = df.schema();
        let complete = DailyRvCol::iter().all(|c| schema.get(c.as_str()).is_some());
        if !complete || schema.len() != Self::to_schema().len() {
            return Err(DataError::UnexpectedSchema(format!(
                "daily rv table has columns {:?}",
                df.get_column_names()
            ))
            .into());
        }
        Ok(Self { df })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.is_empty()
    }
}
