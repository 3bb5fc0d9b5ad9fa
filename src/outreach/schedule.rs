use crate::env::outreach::{MINUTE_SLOTS, RECORDS_PER_MINUTE_SLOT};
use crate::outreach::types::OutreachError;
use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Local send time for scheduled emails.
///
/// With no `date`, the next occurrence of `hour:minute` in the given offset
/// is used.
///
/// `utc_offset_minutes` is a fixed offset and follows no daylight-saving
/// rules. The default of -360 is US Central standard time; summer sends in
/// that zone need -300 to land at the same wall-clock hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSchedule {
    pub date: Option<NaiveDate>,
    pub hour: u32,
    pub minute: u32,
    pub utc_offset_minutes: i32,
}

impl Default for SendSchedule {
    fn default() -> Self {
        Self {
            date: None,
            hour: 17,
            minute: 0,
            utc_offset_minutes: -6 * 60,
        }
    }
}

/// Minute offset for the `count`-th scheduled email (1-based): one more
/// minute every five emails, wrapping after ten minutes.
pub fn stagger_minutes(count: usize) -> u32 {
    ((count / RECORDS_PER_MINUTE_SLOT) % MINUTE_SLOTS) as u32
}

impl SendSchedule {
    pub fn scheduled_time(&self, additional_minutes: u32) -> Result<DateTime<Utc>, OutreachError> {
        self.scheduled_time_from(Utc::now(), additional_minutes)
    }

    /// Send time relative to `now`, in UTC.
    pub fn scheduled_time_from(
        &self,
        now: DateTime<Utc>,
        additional_minutes: u32,
    ) -> Result<DateTime<Utc>, OutreachError> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            OutreachError::Schedule(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            ))
        })?;
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            OutreachError::Schedule(format!("invalid send time {}:{:02}", self.hour, self.minute))
        })?;

        let local_now = now.with_timezone(&offset);
        let date = match self.date {
            Some(date) => date,
            None if local_now.time() < time => local_now.date_naive(),
            None => local_now
                .date_naive()
                .checked_add_days(Days::new(1))
                .ok_or_else(|| OutreachError::Schedule("date overflow".to_string()))?,
        };

        let local = offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(|| OutreachError::Schedule("ambiguous local send time".to_string()))?;

        Ok((local + Duration::minutes(i64::from(additional_minutes))).with_timezone(&Utc))
    }
}
