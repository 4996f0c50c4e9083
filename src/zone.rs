// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone};

/// Time zone the calendar is laid out in.
///
/// Offsets are looked up per date, so days on either side of a daylight
/// saving change each start at their own local midnight.
pub trait CalendarZone: Send + Sync {
    /// Local calendar day of `instant`
    fn day_of(&self, instant: DateTime<FixedOffset>) -> NaiveDate;

    /// First local instant of `date`
    fn start_of_day(&self, date: NaiveDate) -> DateTime<FixedOffset>;
}

/// Zone shared between the session, the aggregator and the projector
pub type SharedZone = Arc<dyn CalendarZone>;

/// The system time zone
pub fn local_zone() -> SharedZone {
    Arc::new(Local)
}

impl<Tz> CalendarZone for Tz
where
    Tz: TimeZone + Send + Sync,
{
    fn day_of(&self, instant: DateTime<FixedOffset>) -> NaiveDate {
        instant.with_timezone(self).date_naive()
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        let midnight = date.and_time(NaiveTime::MIN);

        // A forward transition at midnight starts the day at the first
        // wall-clock time that exists
        (0..=2)
            .find_map(|hours| {
                self.from_local_datetime(&(midnight + TimeDelta::hours(hours)))
                    .earliest()
            })
            .map(|start| start.fixed_offset())
            .unwrap_or_else(|| {
                let offset = self.offset_from_utc_datetime(&midnight).fix();
                DateTime::from_naive_utc_and_offset(midnight - offset, offset)
            })
    }
}
