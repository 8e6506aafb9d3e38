use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::PlanError;
use crate::model::{Task, Todo};

/// Promotes a todo into a new, unlinked task scheduled on `scheduled_date`.
///
/// The todo keeps its own completion flag and records the new task id in
/// `converted_task_id`. A todo converts at most once; later attempts fail
/// without touching it.
pub fn convert_todo_to_task(todo: &mut Todo, scheduled_date: NaiveDate) -> Result<Task, PlanError> {
    if let Some(task_id) = todo.converted_task_id {
        return Err(PlanError::Conversion {
            todo_id: todo.id,
            task_id,
        });
    }

    let task = Task {
        id: Uuid::new_v4(),
        title: todo.text.clone(),
        is_completed: false,
        scheduled_date,
        start_time: None,
        duration: None,
        created_at: Utc::now(),
    };
    todo.converted_task_id = Some(task.id);
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
    }

    #[test]
    fn conversion_carries_text_and_back_reference() {
        let mut todo = Todo::new("Buy running shoes".to_string());
        todo.is_completed = true;

        let task = convert_todo_to_task(&mut todo, date()).expect("convert");

        assert_eq!(task.title, "Buy running shoes");
        assert!(!task.is_completed);
        assert_eq!(task.scheduled_date, date());
        assert!(task.created_at >= todo.created_at);
        assert_eq!(todo.converted_task_id, Some(task.id));
        assert!(todo.is_completed);
    }

    #[test]
    fn second_conversion_fails_and_keeps_original_link() {
        let mut todo = Todo::new("Book a coach".to_string());
        let first = convert_todo_to_task(&mut todo, date()).expect("convert");

        let err = convert_todo_to_task(&mut todo, date()).unwrap_err();

        assert_eq!(
            err,
            PlanError::Conversion {
                todo_id: todo.id,
                task_id: first.id
            }
        );
        assert_eq!(todo.converted_task_id, Some(first.id));
    }
}
