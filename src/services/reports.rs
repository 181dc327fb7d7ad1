//! Period and closing reports across units.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{
        models::{CashRegister, Movement, Role, Unit},
        money::Cents,
        period::{business_date, DateRange, ReportPeriod},
        summary::{summarize, MovementSummary},
    },
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{
    access::{ensure_role, scoped_unit},
    errors::ServiceError,
};

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    pub period: String,
    #[serde_as(as = "NoneAsEmptyString")]
    pub date: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub start: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub end: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub unit_id: Option<Uuid>,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            period: "month".to_string(),
            date: None,
            start: None,
            end: None,
            unit_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnitTotals {
    pub unit_id: Uuid,
    pub unit_name: String,
    pub summary: MovementSummary,
}

#[derive(Debug, Serialize)]
pub struct BucketTotals {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: MovementSummary,
}

#[derive(Debug, Serialize)]
pub struct PeriodReport {
    pub range: DateRange,
    pub overall: MovementSummary,
    pub units: Vec<UnitTotals>,
    pub buckets: Vec<BucketTotals>,
}

#[derive(Debug, Serialize)]
pub struct RegisterReport {
    pub range: DateRange,
    pub registers: Vec<CashRegister>,
    pub open_count: u32,
    pub closed_count: u32,
    pub total_expected: Cents,
    pub total_counted: Cents,
    pub total_difference: Cents,
}

pub struct ReportService {
    state: Arc<AppState>,
}

impl ReportService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn summary(
        &self,
        actor: &AuthenticatedUser,
        query: ReportQuery,
    ) -> Result<PeriodReport, ServiceError> {
        ensure_role(actor, &[Role::Manager, Role::Admin])?;
        let unit_id = scoped_unit(actor, query.unit_id)?;
        let period = self.resolve_period(&query)?;
        let week_start = self.state.config.reports.week_start;
        let range = period.range(week_start)?;
        let buckets = period.buckets(week_start)?;

        let movements = sqlx::query_as::<_, Movement>(
            "SELECT * FROM movements
             WHERE business_date BETWEEN $1 AND $2
               AND ($3::uuid IS NULL OR unit_id = $3)
             ORDER BY business_date ASC, occurred_at ASC",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(unit_id)
        .fetch_all(&self.state.pool);
        let units = sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE ($1::uuid IS NULL OR id = $1)",
        )
        .bind(unit_id)
        .fetch_all(&self.state.pool);

        let (movements, units) = futures::try_join!(movements, units)?;

        info!(
            start = %range.start,
            end = %range.end,
            movements = movements.len(),
            requested_by = %actor.employee_id,
            "period report generated"
        );
        Ok(build_period_report(range, &buckets, &units, &movements))
    }

    pub async fn registers(
        &self,
        actor: &AuthenticatedUser,
        query: ReportQuery,
    ) -> Result<RegisterReport, ServiceError> {
        ensure_role(actor, &[Role::Manager, Role::Admin])?;
        let unit_id = scoped_unit(actor, query.unit_id)?;
        let range = self
            .resolve_period(&query)?
            .range(self.state.config.reports.week_start)?;

        let registers = sqlx::query_as::<_, CashRegister>(
            "SELECT * FROM cash_registers
             WHERE business_date BETWEEN $1 AND $2
               AND ($3::uuid IS NULL OR unit_id = $3)
             ORDER BY business_date ASC, opened_at ASC",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(unit_id)
        .fetch_all(&self.state.pool)
        .await?;

        Ok(build_register_report(range, registers))
    }

    fn resolve_period(&self, query: &ReportQuery) -> Result<ReportPeriod, ServiceError> {
        let today = business_date(Utc::now(), self.state.config.reports.utc_offset_minutes);
        Ok(ReportPeriod::parse(
            &query.period,
            query.date,
            query.start,
            query.end,
            today,
        )?)
    }
}

/// Aggregates already-fetched movements into overall, per-unit and
/// per-bucket totals.
pub fn build_period_report(
    range: DateRange,
    buckets: &[DateRange],
    units: &[Unit],
    movements: &[Movement],
) -> PeriodReport {
    let mut in_range: Vec<&Movement> = movements
        .iter()
        .filter(|m| range.contains(m.business_date))
        .collect();
    in_range.sort_by_key(|m| m.business_date);

    let mut by_unit: BTreeMap<Uuid, Vec<&Movement>> = BTreeMap::new();
    for movement in &in_range {
        by_unit.entry(movement.unit_id).or_default().push(movement);
    }

    let mut unit_rows: Vec<UnitTotals> = units
        .iter()
        .filter(|unit| unit.active || by_unit.contains_key(&unit.id))
        .map(|unit| UnitTotals {
            unit_id: unit.id,
            unit_name: unit.name.clone(),
            summary: by_unit
                .get(&unit.id)
                .map(|rows| summarize(rows.iter().copied()))
                .unwrap_or_default(),
        })
        .collect();
    unit_rows.sort_by(|a, b| {
        a.unit_name
            .to_lowercase()
            .cmp(&b.unit_name.to_lowercase())
            .then(a.unit_id.cmp(&b.unit_id))
    });

    let bucket_rows = buckets
        .iter()
        .map(|bucket| {
            let from = in_range.partition_point(|m| m.business_date < bucket.start);
            let to = in_range.partition_point(|m| m.business_date <= bucket.end);
            BucketTotals {
                start: bucket.start,
                end: bucket.end,
                summary: summarize(in_range[from..to.max(from)].iter().copied()),
            }
        })
        .collect();

    PeriodReport {
        range,
        overall: summarize(in_range.iter().copied()),
        units: unit_rows,
        buckets: bucket_rows,
    }
}

/// Totals of a set of registers. Open registers have no closing figures
/// yet and only count towards `open_count`.
pub fn build_register_report(range: DateRange, registers: Vec<CashRegister>) -> RegisterReport {
    let mut report = RegisterReport {
        range,
        registers: Vec::new(),
        open_count: 0,
        closed_count: 0,
        total_expected: Cents::zero(),
        total_counted: Cents::zero(),
        total_difference: Cents::zero(),
    };
    for register in &registers {
        if register.is_open() {
            report.open_count += 1;
            continue;
        }
        report.closed_count += 1;
        report.total_expected += Cents::from_cents(register.expected_cents.unwrap_or_default());
        report.total_counted += Cents::from_cents(register.counted_cents.unwrap_or_default());
        report.total_difference +=
            Cents::from_cents(register.difference_cents.unwrap_or_default());
    }
    report.registers = registers;
    report
}
