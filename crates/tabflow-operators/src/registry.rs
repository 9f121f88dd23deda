//! Compile a node's `StageConfig` into its executor.

use tabflow_core::dag::StageConfig;

use crate::aggregate::Aggregate;
use crate::filter::Filter;
use crate::formula::Formula;
use crate::join::HashJoin;
use crate::output::Output;
use crate::pivot::Pivot;
use crate::source::Source;
use crate::traits::{OpError, Stage};
use crate::union::Union;

/// Build the executor for `config`. Every configuration problem the stage can
/// detect without data is reported here as `OpError::Config`.
pub fn build_stage(config: &StageConfig, default_currency: &str) -> Result<Box<dyn Stage>, OpError> {
    let stage: Box<dyn Stage> = match config {
        StageConfig::Source(c) => Box::new(Source::new(c)?),
        StageConfig::Filter(c) => Box::new(Filter::new(c)?),
        StageConfig::Join(c) => Box::new(HashJoin::new(c)?),
        StageConfig::Formula(c) => Box::new(Formula::new(c, default_currency)?),
        StageConfig::Aggregate(c) => Box::new(Aggregate::new(c)?),
        StageConfig::Pivot(c) => Box::new(Pivot::new(c)?),
        StageConfig::Union(_) => Box::new(Union),
        StageConfig::Output(c) => Box::new(Output::new(c)),
    };
    Ok(stage)
}
