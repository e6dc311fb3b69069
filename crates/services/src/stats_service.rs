use std::sync::Arc;

use drill_core::model::PlayLogEntry;
use storage::repository::PlayLogRepository;

use crate::Clock;
use crate::error::StatsError;

/// Read side of the play log.
#[derive(Clone)]
pub struct StatsService {
    clock: Clock,
    play_log: Arc<dyn PlayLogRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(clock: Clock, play_log: Arc<dyn PlayLogRepository>) -> Self {
        Self { clock, play_log }
    }

    /// Completed cycles recorded for the current day.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` on read failures.
    pub async fn today_count(&self) -> Result<u32, StatsError> {
        Ok(self.play_log.count_for_day(self.clock.today()).await?)
    }

    /// Seven entries ending today, oldest first, with missing days as zero.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` on read failures.
    pub async fn last_7_days(&self) -> Result<Vec<PlayLogEntry>, StatsError> {
        Ok(self.play_log.last_7_days(self.clock.today()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn window_follows_the_clock() {
        let repo = Arc::new(InMemoryRepository::new());
        let jan_1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        repo.record_cycle(jan_1).await.unwrap();
        repo.record_cycle(jan_1).await.unwrap();

        let mut clock = Clock::fixed(Utc.with_ymd_and_hms(2024, 1, 7, 12, 0, 0).unwrap());
        let stats = StatsService::new(clock, repo.clone());
        let window = stats.last_7_days().await.unwrap();
        assert_eq!(window.len(), 7);
        assert_eq!(window[0].date, jan_1);
        assert_eq!(window[0].count, 2);
        assert_eq!(stats.today_count().await.unwrap(), 0);

        clock.advance(Duration::days(1));
        let stats = StatsService::new(clock, repo);
        let window = stats.last_7_days().await.unwrap();
        assert_eq!(window[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(window.iter().all(|e| e.count == 0));
    }
}
