//! Courses and the weekly timetable.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::UserSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Course {
    /// "CS101 Data Structures"
    pub fn label(&self) -> String {
        format!("{} {}", self.code, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub name: String,
}

/// Day of week as the API numbers it (Sunday = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_sunday() as usize]
    }

    pub fn today() -> Self {
        use chrono::Datelike;
        Self::from_chrono(chrono::Local::now().weekday())
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % 7]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() as usize + 6) % 7]
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or_else(|| format!("day {} out of range 0-6", value))
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> u8 {
        day.index()
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    Lecture,
    Lab,
}

impl std::fmt::Display for ClassType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassType::Lecture => write!(f, "Lecture"),
            ClassType::Lab => write!(f, "Lab"),
        }
    }
}

/// Teacher as embedded in a timetable entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRef {
    pub id: i64,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: i64,
    pub course: Course,
    #[serde(default)]
    pub teacher: Option<TeacherRef>,
    #[serde(default)]
    pub batch: Vec<Batch>,
    pub day: Weekday,
    /// "HH:MM:SS"
    pub start_time: String,
    pub end_time: String,
    pub class_type: ClassType,
}

impl TimetableEntry {
    fn parse_time(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }

    pub fn start(&self) -> Option<NaiveTime> {
        Self::parse_time(&self.start_time)
    }

    pub fn end(&self) -> Option<NaiveTime> {
        Self::parse_time(&self.end_time)
    }

    /// "09:00 - 10:30", falling back to the raw strings.
    pub fn time_range(&self) -> String {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => {
                format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
            }
            _ => format!("{} - {}", self.start_time, self.end_time),
        }
    }

    pub fn teacher_name(&self) -> Option<String> {
        self.teacher.as_ref().map(|t| t.user.full_name())
    }

    pub fn batch_names(&self) -> String {
        self.batch
            .iter()
            .map(|b| b.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the class is running at `now` on `today`.
    pub fn is_in_progress(&self, today: Weekday, now: NaiveTime) -> bool {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => self.day == today && start <= now && now < end,
            _ => false,
        }
    }
}

/// Order entries by day, then start time.
pub fn sort_timetable(entries: &mut [TimetableEntry]) {
    entries.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.start().cmp(&b.start()))
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "id": 3,
        "course": {"id": 1, "name": "Data Structures", "code": "CS201"},
        "teacher": {"id": 2, "user": {"id": 9, "enrollment_number": "T0001", "first_name": "Ravi", "last_name": "Kumar"}},
        "batch": [{"id": 1, "name": "CSE-2024"}, {"id": 2, "name": "ECE-2024"}],
        "day": 1,
        "start_time": "09:00:00",
        "end_time": "10:30:00",
        "class_type": "lecture"
    }"#;

    #[test]
    fn test_timetable_entry_parses() {
        let entry: TimetableEntry = serde_json::from_str(ENTRY).unwrap();
        assert_eq!(entry.day, Weekday::Monday);
        assert_eq!(entry.class_type, ClassType::Lecture);
        assert_eq!(entry.time_range(), "09:00 - 10:30");
        assert_eq!(entry.teacher_name().as_deref(), Some("Ravi Kumar"));
        assert_eq!(entry.batch_names(), "CSE-2024, ECE-2024");
        assert_eq!(entry.course.label(), "CS201 Data Structures");
    }

    #[test]
    fn test_teacher_may_be_null() {
        let json = ENTRY.replace(
            r#""teacher": {"id": 2, "user": {"id": 9, "enrollment_number": "T0001", "first_name": "Ravi", "last_name": "Kumar"}},"#,
            r#""teacher": null,"#,
        );
        let entry: TimetableEntry = serde_json::from_str(&json).unwrap();
        assert!(entry.teacher_name().is_none());
    }

    #[test]
    fn test_sort_by_day_then_start() {
        let base: TimetableEntry = serde_json::from_str(ENTRY).unwrap();
        let mut late = base.clone();
        late.id = 10;
        late.start_time = "14:00:00".to_string();
        let mut sunday = base.clone();
        sunday.id = 11;
        sunday.day = Weekday::Sunday;
        sunday.start_time = "16:00:00".to_string();

        let mut entries = vec![late, base, sunday];
        sort_timetable(&mut entries);
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![11, 3, 10]);
    }

    #[test]
    fn test_weekday_navigation() {
        assert_eq!(Weekday::Saturday.next(), Weekday::Sunday);
        assert_eq!(Weekday::Sunday.prev(), Weekday::Saturday);
        assert_eq!(Weekday::from_index(4), Some(Weekday::Thursday));
        assert_eq!(Weekday::from_index(7), None);
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Sun), Weekday::Sunday);
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Mon), Weekday::Monday);
        assert!(serde_json::from_str::<Weekday>("9").is_err());
        assert_eq!(serde_json::to_string(&Weekday::Friday).unwrap(), "5");
    }

    #[test]
    fn test_in_progress() {
        let entry: TimetableEntry = serde_json::from_str(ENTRY).unwrap();
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(entry.is_in_progress(Weekday::Monday, at(9, 30)));
        assert!(!entry.is_in_progress(Weekday::Monday, at(10, 30)));
        assert!(!entry.is_in_progress(Weekday::Tuesday, at(9, 30)));
    }
}
