// Distance between model predictions and measured data, per experiment

use log::info;

use crate::crw_batch::{BatchContext, BatchCriteria};
use crate::crw_error::{ModelError, ModelResult};
use crate::crw_interface::IntraExpModel;
use crate::crw_stats::BatchRow;

/// L1 distance over the intervals both series cover. Intervals where either
/// side is NaN are skipped.
pub fn l1_distance(model: &[f64], data: &[f64]) -> f64 {
    model
        .iter()
        .zip(data)
        .map(|(m, d)| (m - d).abs())
        .filter(|e| !e.is_nan())
        .sum()
}

/// Runs an intra-experiment model for each experiment in a batch and
/// reduces the gap between one of its series and the matching data column
/// to a single number
pub struct SeriesL1Error<'m> {
    pub model: &'m dyn IntraExpModel,
    /// Index of the model output to compare
    pub series: usize,
    pub data_stem: String,
    pub data_col: String,
}

impl<'m> SeriesL1Error<'m> {
    pub fn new(
        model: &'m dyn IntraExpModel,
        series: usize,
        data_stem: impl Into<String>,
        data_col: impl Into<String>,
    ) -> Self {
        Self {
            model,
            series,
            data_stem: data_stem.into(),
            data_col: data_col.into(),
        }
    }

    /// Error for each experiment the model applies to
    pub fn generate(&self, batch: &BatchContext, criteria: &dyn BatchCriteria) -> ModelResult<BatchRow> {
        let mut row = BatchRow::new();
        for exp_num in 0..criteria.n_exp() {
            if !self.model.run_for_exp(criteria, exp_num) {
                continue;
            }
            let ctx = batch.for_exp(criteria, exp_num)?;

            let outputs = self.model.run(&ctx, criteria)?;
            let predicted = outputs.get(self.series).ok_or_else(|| {
                ModelError::Config(format!(
                    "{} has {} outputs, no series {}",
                    self.model.name(),
                    outputs.len(),
                    self.series
                ))
            })?;
            let table = ctx.read_stats(&self.data_stem)?;
            let measured = table.column(&self.data_col)?;

            let err = l1_distance(predicted, measured);
            info!("{} L1 error for {}: {:.6}", self.model.name(), ctx.exp_name, err);
            row.insert(ctx.exp_name.clone(), err);
        }
        Ok(row)
    }
}
