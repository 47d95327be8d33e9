//! Grouped and ungrouped statistics over a record collection.
//!
//! Every statistic is recomputed from scratch on each call. A group that has
//! no contributing values reports [`Metric::NoData`] instead of `0`, so an
//! empty selection is never mistaken for a real zero.

use std::{cmp::Reverse, collections::BTreeMap, fmt};

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    filter::FilteredView,
    record::{PaymentType, TripRecord, VehicleType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Statistic {
    PassengerSum,
    DistanceSum,
    DistanceMean,
    FareSum,
    PaymentMix,
    PassengerMean,
    TipRate,
    DurationMean,
}

impl Statistic {
    pub const ALL: [Statistic; 8] = [
        Statistic::PassengerSum,
        Statistic::DistanceSum,
        Statistic::DistanceMean,
        Statistic::FareSum,
        Statistic::PaymentMix,
        Statistic::PassengerMean,
        Statistic::TipRate,
        Statistic::DurationMean,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Statistic::PassengerSum => "passengers",
            Statistic::DistanceSum => "total distance",
            Statistic::DistanceMean => "mean distance",
            Statistic::FareSum => "revenue",
            Statistic::PaymentMix => "payment mix",
            Statistic::PassengerMean => "mean passengers",
            Statistic::TipRate => "tipped trips",
            Statistic::DurationMean => "mean duration (min)",
        }
    }

    /// Fare, payment, tip and duration data only exist for metered taxis, so
    /// these statistics are evaluated on [`statistics_subset`].
    pub fn uses_statistics_subset(self) -> bool {
        matches!(
            self,
            Statistic::FareSum
                | Statistic::PaymentMix
                | Statistic::TipRate
                | Statistic::DurationMean
        )
    }

    pub fn is_percentage(self) -> bool {
        matches!(self, Statistic::PaymentMix | Statistic::TipRate)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Vehicle(VehicleType),
    /// `None` collects rows without a payment type.
    Payment(Option<PaymentType>),
    All,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Vehicle(vehicle_type) => write!(f, "{vehicle_type}"),
            GroupKey::Payment(Some(payment)) => write!(f, "{payment}"),
            GroupKey::Payment(None) => f.write_str("<empty>"),
            GroupKey::All => f.write_str("all"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Serializes as a number, or `null` for [`Metric::NoData`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    NoData,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(value) => Some(value),
            Metric::NoData => None,
        }
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Metric::NoData)
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Metric::NoData, Metric::Value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetric {
    pub group: GroupKey,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub statistic: Statistic,
    pub groups: Vec<GroupMetric>,
}

impl AggregationResult {
    /// The metric for `group`; groups absent from the input report
    /// [`Metric::NoData`].
    pub fn get(&self, group: &GroupKey) -> Metric {
        self.groups
            .iter()
            .find(|entry| &entry.group == group)
            .map_or(Metric::NoData, |entry| entry.metric)
    }

    pub fn vehicle(&self, vehicle_type: VehicleType) -> Metric {
        self.get(&GroupKey::Vehicle(vehicle_type))
    }

    pub fn overall(&self) -> Metric {
        self.get(&GroupKey::All)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, Metric)> {
        self.groups.iter().map(|entry| (&entry.group, entry.metric))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// `[statistic, group, value]` rows for table output. An empty result
    /// renders as a single "no data" row.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        if self.groups.is_empty() {
            return vec![vec![
                self.statistic.label().to_string(),
                GroupKey::All.to_string(),
                format_metric(Metric::NoData, self.statistic),
            ]];
        }
        self.groups
            .iter()
            .map(|entry| {
                vec![
                    self.statistic.label().to_string(),
                    entry.group.to_string(),
                    format_metric(entry.metric, self.statistic),
                ]
            })
            .collect()
    }
}

pub fn format_metric(metric: Metric, statistic: Statistic) -> String {
    match metric {
        Metric::NoData => "no data".to_string(),
        Metric::Value(value) if statistic.is_percentage() => format!("{value:.2}%"),
        Metric::Value(value) => format_number(value),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// The given records with every ride-hail trip removed.
pub fn statistics_subset<'a, I>(records: I) -> FilteredView<'a>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    FilteredView::from_rows(
        records
            .into_iter()
            .filter(|record| record.vehicle_type.is_metered())
            .collect(),
    )
}

pub fn aggregate<'a, I>(records: I, statistic: Statistic) -> AggregationResult
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let groups = match statistic {
        Statistic::PassengerSum => by_vehicle(records, Reduce::Sum, |r| {
            Some(r.passenger_count as f64)
        }),
        Statistic::DistanceSum => by_vehicle(records, Reduce::Sum, |r| r.trip_distance),
        Statistic::DistanceMean => by_vehicle(records, Reduce::Mean, |r| r.trip_distance),
        Statistic::FareSum => by_vehicle(records, Reduce::Sum, |r| r.total_fare),
        Statistic::PassengerMean => by_vehicle(records, Reduce::Mean, |r| {
            Some(r.passenger_count as f64)
        }),
        Statistic::DurationMean => by_vehicle(records, Reduce::Mean, TripRecord::duration_minutes),
        Statistic::PaymentMix => payment_mix(records),
        Statistic::TipRate => tip_rate(records),
    };
    AggregationResult { statistic, groups }
}

#[derive(Debug, Clone, Copy)]
enum Reduce {
    Sum,
    Mean,
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn finish(&self, reduce: Reduce) -> Metric {
        if self.count == 0 {
            return Metric::NoData;
        }
        match reduce {
            Reduce::Sum => Metric::Value(self.sum),
            Reduce::Mean => Metric::Value(self.sum / self.count as f64),
        }
    }
}

/// One group per vehicle type present in `records`, in canonical order.
/// Null values are skipped; a group whose values are all null reports no
/// data.
fn by_vehicle<'a, I, F>(records: I, reduce: Reduce, value: F) -> Vec<GroupMetric>
where
    I: IntoIterator<Item = &'a TripRecord>,
    F: Fn(&TripRecord) -> Option<f64>,
{
    let mut groups: BTreeMap<VehicleType, Accumulator> = BTreeMap::new();
    for record in records {
        let accumulator = groups.entry(record.vehicle_type).or_default();
        if let Some(value) = value(record) {
            accumulator.add(value);
        }
    }
    groups
        .into_iter()
        .map(|(vehicle_type, accumulator)| GroupMetric {
            group: GroupKey::Vehicle(vehicle_type),
            metric: accumulator.finish(reduce),
        })
        .collect()
}

/// Share of rows per payment type, as a percentage of all rows. Rows without
/// a payment type form their own bucket, listed last among equal shares, so
/// the shares add up to 100.
fn payment_mix<'a, I>(records: I) -> Vec<GroupMetric>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let counts = records
        .into_iter()
        .map(|record| record.payment_type.clone())
        .counts();
    let total = counts.values().sum::<usize>();
    if total == 0 {
        return Vec::new();
    }
    counts
        .into_iter()
        .sorted_by_key(|(payment, count)| (Reverse(*count), payment.is_none(), payment.clone()))
        .map(|(payment, count)| GroupMetric {
            group: GroupKey::Payment(payment),
            metric: Metric::Value(count as f64 / total as f64 * 100.0),
        })
        .collect()
}

/// Percentage of rows with a positive tip. Rows without a tip amount count
/// as untipped.
fn tip_rate<'a, I>(records: I) -> Vec<GroupMetric>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let (total, tipped) = records.into_iter().fold((0usize, 0usize), |(total, tipped), r| {
        let positive = r.tip_amount.is_some_and(|tip| tip > 0.0);
        (total + 1, tipped + usize::from(positive))
    });
    let metric = if total == 0 {
        Metric::NoData
    } else {
        Metric::Value(tipped as f64 / total as f64 * 100.0)
    };
    vec![GroupMetric {
        group: GroupKey::All,
        metric,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trip(vehicle_type: VehicleType) -> TripRecord {
        TripRecord::new(
            vehicle_type,
            Utc.with_ymd_and_hms(2015, 1, 7, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn all_null_group_reports_no_data() {
        let records = vec![
            TripRecord {
                trip_distance: Some(2.5),
                ..trip(VehicleType::Yellow)
            },
            trip(VehicleType::Vtc),
        ];
        let result = aggregate(&records, Statistic::DistanceSum);
        assert_eq!(result.vehicle(VehicleType::Yellow), Metric::Value(2.5));
        assert_eq!(result.vehicle(VehicleType::Vtc), Metric::NoData);
        assert_eq!(result.vehicle(VehicleType::Green), Metric::NoData);
    }

    #[test]
    fn duration_mean_uses_minutes() {
        let pickup = Utc.with_ymd_and_hms(2015, 1, 7, 10, 0, 0).unwrap();
        let records = vec![
            TripRecord {
                dropoff_time: Some(pickup + Duration::minutes(10)),
                ..trip(VehicleType::Green)
            },
            TripRecord {
                dropoff_time: Some(pickup + Duration::minutes(20)),
                ..trip(VehicleType::Green)
            },
        ];
        let result = aggregate(&records, Statistic::DurationMean);
        assert_eq!(result.vehicle(VehicleType::Green), Metric::Value(15.0));
    }

    #[test]
    fn payment_mix_counts_missing_payment_as_its_own_bucket() {
        let records = vec![
            TripRecord {
                payment_type: Some(PaymentType::Cash),
                ..trip(VehicleType::Yellow)
            },
            TripRecord {
                payment_type: Some(PaymentType::Cash),
                ..trip(VehicleType::Green)
            },
            TripRecord {
                payment_type: Some(PaymentType::CreditCard),
                ..trip(VehicleType::Yellow)
            },
            trip(VehicleType::Yellow),
        ];
        let result = aggregate(&records, Statistic::PaymentMix);
        let shares = result
            .iter()
            .map(|(group, metric)| (group.to_string(), metric.value().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(
            shares,
            vec![
                ("cash".to_string(), 50.0),
                ("credit card".to_string(), 25.0),
                ("<empty>".to_string(), 25.0),
            ]
        );
    }

    #[test]
    fn empty_input_is_no_data_not_zero() {
        let records: Vec<TripRecord> = Vec::new();
        for statistic in Statistic::ALL {
            let result = aggregate(&records, statistic);
            assert!(result.overall().is_no_data(), "{statistic:?}");
            assert!(result.vehicle(VehicleType::Yellow).is_no_data());
        }
    }

    #[test]
    fn metric_serializes_no_data_as_null() {
        let result = AggregationResult {
            statistic: Statistic::TipRate,
            groups: vec![GroupMetric {
                group: GroupKey::All,
                metric: Metric::NoData,
            }],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"statistic":"tip-rate","groups":[{"group":"all","metric":null}]}"#
        );
    }

    #[test]
    fn render_rows_formats_percentages() {
        let result = AggregationResult {
            statistic: Statistic::TipRate,
            groups: vec![GroupMetric {
                group: GroupKey::All,
                metric: Metric::Value(25.0),
            }],
        };
        assert_eq!(
            result.render_rows(),
            vec![vec![
                "tipped trips".to_string(),
                "all".to_string(),
                "25.00%".to_string()
            ]]
        );
    }
}
