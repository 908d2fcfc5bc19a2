use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::nap_report::NapReport;

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct MonthlyTotals {
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 8)]
    pub month: u32,
    #[schema(example = 22)]
    pub reports: u32,
    #[schema(example = 2640)]
    pub calls: u64,
    #[schema(example = 990)]
    pub contacts: u64,
    #[schema(example = 130)]
    pub sales: u64,
    #[schema(example = 12)]
    pub lapses: u64,
    #[schema(example = 33451.0)]
    pub premium: f64,
}

/// Sum NAP figures per calendar month, oldest month first.
pub fn monthly_totals(reports: &[NapReport]) -> Vec<MonthlyTotals> {
    let mut months: BTreeMap<(i32, u32), MonthlyTotals> = BTreeMap::new();

    for report in reports {
        let key = (report.report_date.year(), report.report_date.month());
        let totals = months.entry(key).or_insert_with(|| MonthlyTotals {
            year: key.0,
            month: key.1,
            ..MonthlyTotals::default()
        });

        totals.reports += 1;
        totals.calls += u64::from(report.calls);
        totals.contacts += u64::from(report.contacts);
        totals.sales += u64::from(report.sales);
        totals.lapses += u64::from(report.lapses);
        totals.premium += report.premium;
    }

    months
        .into_values()
        .map(|mut totals| {
            totals.premium = (totals.premium * 100.0).round() / 100.0;
            totals
        })
        .collect()
}
