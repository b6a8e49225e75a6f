use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{ClassCategory, EnrollmentWithUser, Role, User};

/// A scheduled session run by a trainer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub required_role: Option<Role>,
    pub trainer_id: i64,
    pub created_by_id: i64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Upcoming,
    Ongoing,
    Ended,
}

/// Where `now` falls relative to the class window. Both bounds are
/// inclusive for ONGOING.
pub fn derive_status(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ClassStatus {
    if now < start_time {
        ClassStatus::Upcoming
    } else if now <= end_time {
        ClassStatus::Ongoing
    } else {
        ClassStatus::Ended
    }
}

/// Remaining seats, `None` when the class has no capacity limit.
pub fn available_spots(capacity: Option<i64>, enrollment_count: i64) -> Option<i64> {
    capacity.map(|cap| cap - enrollment_count)
}

impl Class {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    pub fn status(&self, now: DateTime<Utc>) -> ClassStatus {
        derive_status(self.start_time, self.end_time, now)
    }
}

/// A class row together with its live enrollment count.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedClass {
    pub class: Class,
    pub enrollment_count: i64,
}

/// Optional listing filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFilter {
    pub category_id: Option<i64>,
    pub trainer_id: Option<i64>,
}

/// A class plus everything computed or joined at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    #[serde(flatten)]
    pub class: Class,
    pub trainer: Option<User>,
    pub category: Option<ClassCategory>,
    pub enrollment_count: i64,
    pub available_spots: Option<i64>,
    pub has_started: bool,
    pub status: ClassStatus,
}

impl ClassView {
    pub fn new(
        class: Class,
        trainer: Option<User>,
        category: Option<ClassCategory>,
        enrollment_count: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            available_spots: available_spots(class.capacity, enrollment_count),
            has_started: class.has_started(now),
            status: class.status(now),
            class,
            trainer,
            category,
            enrollment_count,
        }
    }
}

/// Single-class view with its roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail {
    #[serde(flatten)]
    pub view: ClassView,
    pub enrollments: Vec<EnrollmentWithUser>,
}

/// Fields the store needs to insert a class. Built by the class service
/// after validation.
#[derive(Debug, Clone)]
pub struct NewClass {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i64>,
    pub required_role: Option<Role>,
    pub trainer_id: i64,
    pub created_by_id: i64,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub trainer_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<i64>,
    pub required_role: Option<String>,
}

/// Partial update. For nullable columns an explicit `null` clears the
/// value while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub trainer_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub capacity: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub required_role: Option<Option<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now() + Duration::hours(1);
        (start, start + Duration::hours(2))
    }

    #[test]
    fn status_follows_the_class_window() {
        let (start, end) = window();
        assert_eq!(derive_status(start, end, start - Duration::seconds(1)), ClassStatus::Upcoming);
        assert_eq!(derive_status(start, end, start), ClassStatus::Ongoing);
        assert_eq!(derive_status(start, end, end), ClassStatus::Ongoing);
        assert_eq!(derive_status(start, end, end + Duration::milliseconds(1)), ClassStatus::Ended);
    }

    #[test]
    fn status_never_regresses_as_time_advances() {
        let (start, end) = window();
        let rank = |s: ClassStatus| match s {
            ClassStatus::Upcoming => 0,
            ClassStatus::Ongoing => 1,
            ClassStatus::Ended => 2,
        };

        let mut now = start - Duration::minutes(30);
        let mut last = rank(derive_status(start, end, now));
        while now < end + Duration::minutes(30) {
            now += Duration::minutes(7);
            let current = rank(derive_status(start, end, now));
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn availability_is_unbounded_without_capacity() {
        assert_eq!(available_spots(None, 12), None);
        assert_eq!(available_spots(Some(20), 5), Some(15));
        assert_eq!(available_spots(Some(1), 1), Some(0));
    }

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let absent: UpdateClassRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.capacity, None);

        let cleared: UpdateClassRequest = serde_json::from_str(r#"{"capacity":null}"#).unwrap();
        assert_eq!(cleared.capacity, Some(None));

        let set: UpdateClassRequest = serde_json::from_str(r#"{"capacity":30}"#).unwrap();
        assert_eq!(set.capacity, Some(Some(30)));
    }
}
