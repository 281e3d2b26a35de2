//! Trading calendar abstraction and caching
//!
//! The engine never talks to a market-data source directly. Hosts inject a
//! [`TradingCalendar`] implementation; the in-process [`WeekdayCalendar`]
//! approximates the A-share calendar by skipping weekends, and
//! [`CachedCalendar`] adds a read-through TTL cache for implementations
//! backed by a database.

use cached::{Cached, TimedCache};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

/// Read-only view of the exchange trading calendar
pub trait TradingCalendar: Send + Sync {
    /// Most recent trading day not after today
    fn latest_trading_day(&self) -> NaiveDate;

    /// The trading day `n` trading days before `date`
    fn n_trading_days_before(&self, date: NaiveDate, n: u32) -> NaiveDate;

    /// Window covering the most recent `n` trading days, inclusive
    fn trading_days_range(&self, n: u32) -> (NaiveDate, NaiveDate);

    /// `date` itself if it trades, otherwise the nearest earlier trading day
    fn trading_day_on_or_before(&self, date: NaiveDate) -> NaiveDate;
}

/// Weekday approximation of the trading calendar
///
/// Treats every Monday-Friday as a trading day. Exchange holidays are not
/// modeled; hosts that need them supply their own [`TradingCalendar`].
#[derive(Debug, Clone, Copy)]
pub struct WeekdayCalendar {
    today: NaiveDate,
}

impl WeekdayCalendar {
    /// Create a calendar anchored on the given "today"
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    fn is_trading_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn latest_trading_day(&self) -> NaiveDate {
        self.trading_day_on_or_before(self.today)
    }

    fn n_trading_days_before(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut current = self.trading_day_on_or_before(date);
        for _ in 0..n {
            current -= Duration::days(1);
            while !Self::is_trading_day(current) {
                current -= Duration::days(1);
            }
        }
        current
    }

    fn trading_days_range(&self, n: u32) -> (NaiveDate, NaiveDate) {
        let end = self.latest_trading_day();
        let start = self.n_trading_days_before(end, n.saturating_sub(1));
        (start, end)
    }

    fn trading_day_on_or_before(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !Self::is_trading_day(current) {
            current -= Duration::days(1);
        }
        current
    }
}

/// Read-through TTL cache over any trading calendar
///
/// Calendar lookups backed by a database are the only I/O on the hot path
/// of parameter extraction, so they get a cache; the extractor itself
/// stays stateless.
pub struct CachedCalendar<C> {
    inner: C,
    days: Mutex<TimedCache<DayKey, NaiveDate>>,
    ranges: Mutex<TimedCache<u32, (NaiveDate, NaiveDate)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DayKey {
    Latest,
    NBefore(NaiveDate, u32),
    OnOrBefore(NaiveDate),
}

impl<C: TradingCalendar> CachedCalendar<C> {
    /// Wrap a calendar with the given cache lifetime
    pub fn new(inner: C, ttl: StdDuration) -> Self {
        Self {
            inner,
            days: Mutex::new(TimedCache::with_lifespan(ttl)),
            ranges: Mutex::new(TimedCache::with_lifespan(ttl)),
        }
    }

    fn cached_day(&self, key: DayKey, compute: impl FnOnce() -> NaiveDate) -> NaiveDate {
        if let Ok(mut cache) = self.days.lock() {
            if let Some(hit) = cache.cache_get(&key) {
                tracing::debug!(?key, "calendar cache hit");
                return *hit;
            }
        }
        let value = compute();
        if let Ok(mut cache) = self.days.lock() {
            let _ = cache.cache_set(key, value);
        }
        value
    }
}

impl<C: TradingCalendar> TradingCalendar for CachedCalendar<C> {
    fn latest_trading_day(&self) -> NaiveDate {
        self.cached_day(DayKey::Latest, || self.inner.latest_trading_day())
    }

    fn n_trading_days_before(&self, date: NaiveDate, n: u32) -> NaiveDate {
        self.cached_day(DayKey::NBefore(date, n), || {
            self.inner.n_trading_days_before(date, n)
        })
    }

    fn trading_days_range(&self, n: u32) -> (NaiveDate, NaiveDate) {
        if let Ok(mut cache) = self.ranges.lock() {
            if let Some(hit) = cache.cache_get(&n) {
                return *hit;
            }
        }
        let value = self.inner.trading_days_range(n);
        if let Ok(mut cache) = self.ranges.lock() {
            let _ = cache.cache_set(n, value);
        }
        value
    }

    fn trading_day_on_or_before(&self, date: NaiveDate) -> NaiveDate {
        self.cached_day(DayKey::OnOrBefore(date), || {
            self.inner.trading_day_on_or_before(date)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_latest_trading_day_skips_weekend() {
        // 2025-08-23 is a Saturday
        let cal = WeekdayCalendar::new(date(2025, 8, 23));
        assert_eq!(cal.latest_trading_day(), date(2025, 8, 22));

        let cal = WeekdayCalendar::new(date(2025, 8, 22));
        assert_eq!(cal.latest_trading_day(), date(2025, 8, 22));
    }

    #[test]
    fn test_n_trading_days_before() {
        // Monday 2025-08-25; one trading day before is Friday
        let cal = WeekdayCalendar::new(date(2025, 8, 25));
        assert_eq!(
            cal.n_trading_days_before(date(2025, 8, 25), 1),
            date(2025, 8, 22)
        );
        assert_eq!(
            cal.n_trading_days_before(date(2025, 8, 25), 5),
            date(2025, 8, 18)
        );
    }

    #[test]
    fn test_trading_days_range() {
        let cal = WeekdayCalendar::new(date(2025, 8, 25));
        let (start, end) = cal.trading_days_range(5);
        assert_eq!(end, date(2025, 8, 25));
        assert_eq!(start, date(2025, 8, 19));
    }

    struct CountingCalendar {
        inner: WeekdayCalendar,
        calls: AtomicUsize,
    }

    impl TradingCalendar for CountingCalendar {
        fn latest_trading_day(&self) -> NaiveDate {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.latest_trading_day()
        }
        fn n_trading_days_before(&self, date: NaiveDate, n: u32) -> NaiveDate {
            self.inner.n_trading_days_before(date, n)
        }
        fn trading_days_range(&self, n: u32) -> (NaiveDate, NaiveDate) {
            self.inner.trading_days_range(n)
        }
        fn trading_day_on_or_before(&self, date: NaiveDate) -> NaiveDate {
            self.inner.trading_day_on_or_before(date)
        }
    }

    #[test]
    fn test_cached_calendar_hits_once() {
        let counting = CountingCalendar {
            inner: WeekdayCalendar::new(date(2025, 8, 25)),
            calls: AtomicUsize::new(0),
        };
        let cached = CachedCalendar::new(counting, StdDuration::from_secs(60));

        let first = cached.latest_trading_day();
        let second = cached.latest_trading_day();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }
}
