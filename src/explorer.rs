//! Owns the loaded dataset and answers one query at a time.
//!
//! The dataset is immutable once loaded; every query builds its own filtered
//! view and statistics, so overlapping queries never interfere.

use log::{debug, info};

use crate::{
    aggregate::{AggregationResult, Statistic, aggregate, statistics_subset},
    config::{QueryConfig, StatsScope},
    dataset::MergedDataset,
    error::Result,
    filter::{FilterCriteria, FilteredView, filter},
};

#[derive(Debug, Clone)]
pub struct Explorer {
    dataset: MergedDataset,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome<'a> {
    pub criteria: FilterCriteria,
    pub view: FilteredView<'a>,
    /// Present only when the query asked for detailed statistics.
    pub detailed: Option<DetailedStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedStats {
    pub results: Vec<AggregationResult>,
}

impl DetailedStats {
    pub fn get(&self, statistic: Statistic) -> Option<&AggregationResult> {
        self.results
            .iter()
            .find(|result| result.statistic == statistic)
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.results
            .iter()
            .flat_map(AggregationResult::render_rows)
            .collect()
    }
}

impl Explorer {
    pub fn new(dataset: MergedDataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &MergedDataset {
        &self.dataset
    }

    /// Filters the dataset and, when `show_detailed_stats` is set, computes
    /// every statistic. An inverted date range is returned as an error and no
    /// view is produced.
    pub fn query(&self, config: &QueryConfig) -> Result<QueryOutcome<'_>> {
        let criteria = config.criteria();
        debug!("Query criteria: {criteria:?}");
        let view = filter(&self.dataset, &criteria)?;
        info!(
            "{} trip(s) between {} and {} for the selected types",
            view.len(),
            criteria.start_date,
            criteria.end_date
        );

        let detailed = config.show_detailed_stats.then(|| DetailedStats {
            results: Statistic::ALL
                .into_iter()
                .map(|statistic| self.evaluate(&view, config.stats_scope, statistic))
                .collect(),
        });

        Ok(QueryOutcome {
            criteria,
            view,
            detailed,
        })
    }

    /// A single statistic for the query. Unlike [`Explorer::query`] this does
    /// not depend on `show_detailed_stats`.
    pub fn statistic(&self, config: &QueryConfig, statistic: Statistic) -> Result<AggregationResult> {
        let view = filter(&self.dataset, &config.criteria())?;
        Ok(self.evaluate(&view, config.stats_scope, statistic))
    }

    /// Passenger and distance figures follow the filtered view. Fare, payment,
    /// tip and duration figures use the statistics subset of whichever
    /// collection `scope` names.
    fn evaluate(
        &self,
        view: &FilteredView<'_>,
        scope: StatsScope,
        statistic: Statistic,
    ) -> AggregationResult {
        if !statistic.uses_statistics_subset() {
            return aggregate(view, statistic);
        }
        let subset = match scope {
            StatsScope::Dataset => statistics_subset(&self.dataset),
            StatsScope::Filter => statistics_subset(view),
        };
        aggregate(&subset, statistic)
    }
}
