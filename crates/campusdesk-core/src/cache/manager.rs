use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Announcement, Course, Post, TimetableEntry, Weekday};

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

/// Snapshots live in their own directory so `clear()` cannot touch
/// anything else kept in the cache root.
const DATA_DIR: &str = "data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    /// `root` is the application cache directory.
    pub fn new(root: PathBuf) -> Result<Self> {
        let cache_dir = root.join(DATA_DIR);
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        // Timetable keys embed batch names; keep them filename-safe.
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", safe))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let path = self.cache_path(name);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    // ===== Courses =====

    pub fn load_courses(&self) -> Result<Option<CachedData<Vec<Course>>>> {
        self.load("courses")
    }

    pub fn save_courses(&self, courses: &[Course]) -> Result<()> {
        self.save("courses", &courses)
    }

    // ===== Announcements =====

    pub fn load_announcements(&self) -> Result<Option<CachedData<Vec<Announcement>>>> {
        self.load("announcements")
    }

    pub fn save_announcements(&self, announcements: &[Announcement]) -> Result<()> {
        self.save("announcements", &announcements)
    }

    // ===== Forum =====

    pub fn load_posts(&self) -> Result<Option<CachedData<Vec<Post>>>> {
        self.load("posts")
    }

    pub fn save_posts(&self, posts: &[Post]) -> Result<()> {
        self.save("posts", &posts)
    }

    // ===== Timetable =====

    /// `owner` is the batch name for students, `"teacher"` for teachers.
    pub fn load_timetable(
        &self,
        owner: &str,
        day: Weekday,
    ) -> Result<Option<CachedData<Vec<TimetableEntry>>>> {
        self.load(&format!("timetable_{}_{}", owner, day.index()))
    }

    pub fn save_timetable(&self, owner: &str, day: Weekday, entries: &[TimetableEntry]) -> Result<()> {
        self.save(&format!("timetable_{}_{}", owner, day.index()), &entries)
    }

    /// Remove every snapshot.
    pub fn clear(&self) -> Result<()> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        info!(removed, "Cache cleared");
        Ok(())
    }

    // ===== Cache Age Information =====

    fn load_age<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            courses: self.load_age("courses", || self.load_courses()),
            announcements: self.load_age("announcements", || self.load_announcements()),
            posts: self.load_age("posts", || self.load_posts()),
        }
    }

    fn is_cache_stale<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> bool {
        match loader() {
            Ok(Some(cached)) => cached.is_stale(),
            Ok(None) => true,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for staleness check");
                true
            }
        }
    }

    pub fn any_stale(&self) -> bool {
        [
            self.is_cache_stale("courses", || self.load_courses()),
            self.is_cache_stale("announcements", || self.load_announcements()),
            self.is_cache_stale("posts", || self.load_posts()),
        ]
        .iter()
        .any(|&stale| stale)
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub courses: Option<String>,
    pub announcements: Option<String>,
    pub posts: Option<String>,
}

impl CacheAges {
    /// Age of whichever snapshot exists, preferring the dashboard's.
    pub fn last_updated(&self) -> String {
        [&self.courses, &self.announcements, &self.posts]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn course(id: i64) -> Course {
        Course {
            id,
            name: "Data Structures".to_string(),
            code: "CS201".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("authTokens.json"), "{}").unwrap();

        assert!(cache.load_courses().unwrap().is_none());
        assert!(cache.any_stale());

        cache.save_courses(&[course(1), course(2)]).unwrap();
        cache.save_timetable("CSE 2024/A", Weekday::Monday, &[]).unwrap();
        let loaded = cache.load_courses().unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert!(cache.load_timetable("CSE 2024/A", Weekday::Monday).unwrap().is_some());
        assert!(cache.load_timetable("CSE 2024/A", Weekday::Tuesday).unwrap().is_none());
        assert_eq!(cache.get_cache_ages().last_updated(), "just now");

        cache.clear().unwrap();
        assert!(cache.load_courses().unwrap().is_none());
        assert!(cache.load_timetable("CSE 2024/A", Weekday::Monday).unwrap().is_none());
        // Files outside the data directory survive.
        assert!(dir.path().join("authTokens.json").exists());
    }

    #[test]
    fn test_cache_ages_last_updated_empty() {
        assert_eq!(CacheAges::default().last_updated(), "never");
    }
}
