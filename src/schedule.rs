use chrono::NaiveDateTime;

use crate::model::{Task, START_TIME_FORMAT};

/// Incomplete tasks whose scheduled date and start minute match `at`.
/// Untimed tasks are never due.
pub fn due_tasks<'a, I>(tasks: I, at: NaiveDateTime) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let minute = at.format(START_TIME_FORMAT).to_string();
    tasks
        .into_iter()
        .filter(|task| !task.is_completed)
        .filter(|task| task.scheduled_date == at.date())
        .filter(|task| task.start_time.as_deref() == Some(minute.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn task(title: &str, day: u32, start: Option<&str>, done: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            is_completed: done,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 3, day).expect("date"),
            start_time: start.map(str::to_string),
            duration: Some(15),
            created_at: Utc::now(),
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .expect("date")
            .and_hms_opt(hour, minute, 42)
            .expect("time")
    }

    #[test]
    fn matches_date_and_minute() {
        let tasks = vec![
            task("stretch", 9, Some("07:05"), false),
            task("read", 9, Some("07:06"), false),
            task("other day", 10, Some("07:05"), false),
            task("untimed", 9, None, false),
        ];
        let due: Vec<&str> = due_tasks(&tasks, at(9, 7, 5))
            .into_iter()
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(due, vec!["stretch"]);
    }

    #[test]
    fn completed_tasks_are_not_due() {
        let tasks = vec![task("done", 9, Some("21:30"), true)];
        assert!(due_tasks(&tasks, at(9, 21, 30)).is_empty());
    }
}
