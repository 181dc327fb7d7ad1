use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest custom range a report accepts, in days.
pub const MAX_CUSTOM_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    fn offset(self, date: NaiveDate) -> i64 {
        let weekday = date.weekday();
        i64::from(match self {
            WeekStart::Sunday => weekday.num_days_from_sunday(),
            WeekStart::Monday => weekday.num_days_from_monday(),
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("unknown report period: {0}")]
    UnknownPeriod(String),
    #[error("custom period requires both start and end")]
    MissingBounds,
    #[error("period start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("custom period spans {days} days; the maximum is {max}")]
    TooLong { days: i64, max: i64 },
    #[error("date out of supported range")]
    OutOfRange,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Day(NaiveDate),
    Week(NaiveDate),
    Month(NaiveDate),
    Year(NaiveDate),
    Custom { start: NaiveDate, end: NaiveDate },
}

impl ReportPeriod {
    /// Builds a period from query parameters. `kind` is one of `day`, `week`,
    /// `month`, `year` or `custom` (Portuguese aliases accepted); anchored
    /// periods default to `today` when no date is given.
    pub fn parse(
        kind: &str,
        date: Option<NaiveDate>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, PeriodError> {
        let anchor = date.unwrap_or(today);
        let period = match kind.trim().to_ascii_lowercase().as_str() {
            "day" | "dia" => ReportPeriod::Day(anchor),
            "week" | "semana" => ReportPeriod::Week(anchor),
            "month" | "mes" | "mês" => ReportPeriod::Month(anchor),
            "year" | "ano" => ReportPeriod::Year(anchor),
            "custom" | "personalizado" => match (start, end) {
                (Some(start), Some(end)) => ReportPeriod::Custom { start, end },
                _ => return Err(PeriodError::MissingBounds),
            },
            other => return Err(PeriodError::UnknownPeriod(other.to_string())),
        };
        period.range(WeekStart::default())?;
        Ok(period)
    }

    pub fn range(&self, week_start: WeekStart) -> Result<DateRange, PeriodError> {
        match *self {
            ReportPeriod::Day(date) => Ok(DateRange {
                start: date,
                end: date,
            }),
            ReportPeriod::Week(date) => {
                let start = date
                    .checked_sub_signed(Duration::days(week_start.offset(date)))
                    .ok_or(PeriodError::OutOfRange)?;
                let end = start
                    .checked_add_signed(Duration::days(6))
                    .ok_or(PeriodError::OutOfRange)?;
                Ok(DateRange { start, end })
            }
            ReportPeriod::Month(date) => month_range(date),
            ReportPeriod::Year(date) => {
                let start =
                    NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or(PeriodError::OutOfRange)?;
                let end =
                    NaiveDate::from_ymd_opt(date.year(), 12, 31).ok_or(PeriodError::OutOfRange)?;
                Ok(DateRange { start, end })
            }
            ReportPeriod::Custom { start, end } => {
                if start > end {
                    return Err(PeriodError::Inverted { start, end });
                }
                let range = DateRange { start, end };
                if range.days() > MAX_CUSTOM_DAYS {
                    return Err(PeriodError::TooLong {
                        days: range.days(),
                        max: MAX_CUSTOM_DAYS,
                    });
                }
                Ok(range)
            }
        }
    }

    /// Sub-ranges the report is broken into: one bucket for a day, months
    /// for a year, and days for everything else.
    pub fn buckets(&self, week_start: WeekStart) -> Result<Vec<DateRange>, PeriodError> {
        let range = self.range(week_start)?;
        match self {
            ReportPeriod::Day(_) => Ok(vec![range]),
            ReportPeriod::Year(_) => {
                let mut buckets = Vec::with_capacity(12);
                let mut cursor = range.start;
                while cursor <= range.end {
                    let month = month_range(cursor)?;
                    buckets.push(month);
                    cursor = month.end.succ_opt().ok_or(PeriodError::OutOfRange)?;
                }
                Ok(buckets)
            }
            _ => Ok(range
                .start
                .iter_days()
                .take_while(|day| *day <= range.end)
                .map(|day| DateRange {
                    start: day,
                    end: day,
                })
                .collect()),
        }
    }
}

fn month_range(date: NaiveDate) -> Result<DateRange, PeriodError> {
    let start = date.with_day(1).ok_or(PeriodError::OutOfRange)?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or(PeriodError::OutOfRange)?;
    Ok(DateRange { start, end })
}

/// Store-local calendar date of an instant, given the store's UTC offset.
/// Instants too close to the representable limits keep their UTC date.
pub fn business_date(at: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    at.checked_add_signed(Duration::minutes(i64::from(utc_offset_minutes)))
        .unwrap_or(at)
        .date_naive()
}
