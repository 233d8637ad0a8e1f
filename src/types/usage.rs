use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CallId, Pricing, UserId};

/// Billing computation for one completed call. Recorded whether or not the
/// wallet could pay; `transaction_id` links the debit when it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: i64,
    pub user_id: UserId,
    pub call_id: CallId,
    pub minutes: Decimal,
    pub cost_rate: Decimal,
    pub total_cost: Decimal,
    pub base_cost: Decimal,
    pub margin: Decimal,
    pub transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.transaction_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub total_minutes: Decimal,
    pub total_cost: Decimal,
    pub total_margin: Decimal,
    pub call_count: i64,
}

impl UsageTotals {
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut totals, record| {
                totals.total_minutes += record.minutes;
                totals.total_cost += record.total_cost;
                totals.total_margin += record.margin;
                totals.call_count += 1;
                totals
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub day: NaiveDate,
    pub minutes: Decimal,
    pub total_cost: Decimal,
    pub call_count: i64,
}

/// Reporting window for usage history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePeriod {
    Day,
    Week,
    #[default]
    Month,
    All,
}

impl UsagePeriod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    /// Inclusive lower bound of the window ending at `now`; `None` means unbounded.
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Day => Some(start_of_day(now)),
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => now.checked_sub_months(Months::new(1)),
            Self::All => None,
        }
    }
}

impl TryFrom<&str> for UsagePeriod {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, String> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown usage period: {s}")),
        }
    }
}

impl std::str::FromStr for UsagePeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Self::try_from(s)
    }
}

#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN))
}

#[must_use]
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .map_or_else(|| start_of_day(now), |first| {
            Utc.from_utc_datetime(&first.and_time(chrono::NaiveTime::MIN))
        })
}

/// Usage listing plus aggregates over the same window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageHistory {
    pub period: UsagePeriod,
    pub since: Option<DateTime<Utc>>,
    pub usage: Vec<UsageRecord>,
    pub stats: UsageTotals,
    pub daily_usage: Vec<DailyUsage>,
    pub pricing: Pricing,
}

#[cfg(test)]
mod tests {
    use super::{start_of_month, UsagePeriod, UsageRecord, UsageTotals};
    use crate::types::{CallId, UserId};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn record(call: &str, minutes: rust_decimal::Decimal) -> UsageRecord {
        UsageRecord {
            id: 1,
            user_id: UserId::new("u"),
            call_id: CallId::new(call),
            minutes,
            cost_rate: dec!(0.10),
            total_cost: minutes * dec!(0.10),
            base_cost: minutes * dec!(0.04),
            margin: minutes * dec!(0.06),
            transaction_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn periods_resolve_against_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 15, 30, 0).single();
        let Some(now) = now else {
            unreachable!("valid timestamp");
        };

        assert_eq!(
            UsagePeriod::Day.since(now),
            Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).single()
        );
        assert_eq!(
            UsagePeriod::Week.since(now),
            Utc.with_ymd_and_hms(2026, 3, 24, 15, 30, 0).single()
        );
        assert_eq!(
            UsagePeriod::Month.since(now),
            Utc.with_ymd_and_hms(2026, 2, 28, 15, 30, 0).single()
        );
        assert_eq!(UsagePeriod::All.since(now), None);
        assert_eq!(
            Some(start_of_month(now)),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn period_parsing_rejects_unknown_names() {
        assert_eq!(UsagePeriod::try_from("week"), Ok(UsagePeriod::Week));
        assert!(UsagePeriod::try_from("year").is_err());
    }

    #[test]
    fn totals_fold_minutes_cost_margin_and_count() {
        let records = [record("a", dec!(2)), record("b", dec!(1.5))];
        let totals = UsageTotals::from_records(&records);

        assert_eq!(totals.total_minutes, dec!(3.5));
        assert_eq!(totals.total_cost, dec!(0.35));
        assert_eq!(totals.total_margin, dec!(0.21));
        assert_eq!(totals.call_count, 2);
    }
}
