//! Integration tests for task creation, updates, deletion and listings.
//!
//! The clock is fixed at Tuesday 2026-01-27 09:00 UTC (13:00 in Tbilisi).

use chrono::NaiveDate;
use std::sync::Arc;
use timeboard::clock::{Clock, FixedClock, Timezones};
use timeboard::db::Database;
use timeboard::error::{ErrorCode, ErrorKind};
use timeboard::planner::Planner;
use timeboard::types::{NewTask, PRIORITY_DEFAULT, TaskStatus, TaskUpdate};

const OWNER: &str = "alice";
const OTHER: &str = "bob";

fn setup_planner() -> (Planner, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at("2026-01-27T09:00:00Z").expect("valid timestamp"));
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    (Planner::new(db, clock.clone(), Timezones::default()), clock)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod create_tests {
    use super::*;

    #[test]
    fn create_task_applies_defaults() {
        let (planner, clock) = setup_planner();

        let task = planner
            .create_task(OWNER, NewTask::new("Write report").on(date(2026, 1, 27)))
            .unwrap();

        assert_eq!(task.owner_id, OWNER);
        assert_eq!(task.content, "Write report");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, PRIORITY_DEFAULT);
        assert!(!task.completed);
        assert_eq!(task.date, Some(date(2026, 1, 27)));
        assert_eq!(task.display_code, "TASK-1");
        assert_eq!(task.created_at, clock.now().timestamp_millis());
        assert_eq!(planner.get_task(OWNER, &task.id).unwrap(), task);
    }

    #[test]
    fn sort_order_and_codes_increase_per_owner() {
        let (planner, _) = setup_planner();

        let a = planner.create_task(OWNER, NewTask::new("a")).unwrap();
        let b = planner.create_task(OWNER, NewTask::new("b")).unwrap();
        let other = planner.create_task(OTHER, NewTask::new("c")).unwrap();

        assert_eq!(b.sort_order, a.sort_order + 1);
        assert_eq!(a.display_code, "TASK-1");
        assert_eq!(b.display_code, "TASK-2");
        // Each owner has its own sequence.
        assert_eq!(other.display_code, "TASK-1");
        assert_eq!(other.sort_order, 1);
    }

    #[test]
    fn display_codes_are_never_reused() {
        let (planner, _) = setup_planner();

        planner.create_task(OWNER, NewTask::new("a")).unwrap();
        let b = planner.create_task(OWNER, NewTask::new("b")).unwrap();
        planner.delete_task(OWNER, &b.id).unwrap();
        let c = planner.create_task(OWNER, NewTask::new("c")).unwrap();

        assert_eq!(c.display_code, "TASK-3");
    }

    #[test]
    fn create_done_task_is_completed() {
        let (planner, _) = setup_planner();

        let task = planner
            .create_task(OWNER, NewTask::new("already done").with_status("done"))
            .unwrap();

        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed);
    }

    #[test]
    fn create_rejects_unknown_status_without_writing() {
        let (planner, _) = setup_planner();

        let err = planner
            .create_task(OWNER, NewTask::new("x").with_status("blocked"))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStatus);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(planner.backlog(OWNER).unwrap().is_empty());
        // The sequence was not consumed either.
        let next = planner.create_task(OWNER, NewTask::new("y")).unwrap();
        assert_eq!(next.display_code, "TASK-1");
    }

    #[test]
    fn create_rejects_bad_priority_and_empty_content() {
        let (planner, _) = setup_planner();

        let err = planner
            .create_task(OWNER, NewTask::new("x").with_priority(6))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert_eq!(err.field.as_deref(), Some("priority"));

        let err = planner.create_task(OWNER, NewTask::new("   ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
    }
}

mod ownership_tests {
    use super::*;

    #[test]
    fn foreign_task_is_forbidden_not_hidden() {
        let (planner, _) = setup_planner();
        let task = planner.create_task(OWNER, NewTask::new("mine")).unwrap();

        let err = planner.get_task(OTHER, &task.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = planner.delete_task(OTHER, &task.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(planner.get_task(OWNER, &task.id).is_ok());
    }

    #[test]
    fn missing_task_is_not_found() {
        let (planner, _) = setup_planner();

        let err = planner.get_task(OWNER, "no-such-task").unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn update_changes_only_given_fields() {
        let (planner, clock) = setup_planner();
        let task = planner.create_task(OWNER, NewTask::new("draft")).unwrap();
        clock.advance(chrono::Duration::minutes(1));

        let updated = planner
            .update_task(
                OWNER,
                &task.id,
                TaskUpdate {
                    content: Some("final".to_string()),
                    priority: Some(5),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.content, "final");
        assert_eq!(updated.priority, 5);
        assert_eq!(updated.status, TaskStatus::Todo);
        assert_eq!(updated.date, task.date);
        assert!(updated.updated_at > task.updated_at);
    }

    #[test]
    fn written_status_wins_over_completion_flag() {
        let (planner, _) = setup_planner();
        let task = planner.create_task(OWNER, NewTask::new("x")).unwrap();

        let updated = planner
            .update_task(
                OWNER,
                &task.id,
                TaskUpdate {
                    status: Some("backlog".to_string()),
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Backlog);
        assert!(!updated.completed);
    }

    #[test]
    fn update_date_moves_between_days_and_backlog() {
        let (planner, _) = setup_planner();
        let task = planner
            .create_task(OWNER, NewTask::new("x").on(date(2026, 1, 27)))
            .unwrap();

        planner
            .update_task(
                OWNER,
                &task.id,
                TaskUpdate {
                    date: Some(Some(date(2026, 1, 29))),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(planner.tasks_for_date(OWNER, date(2026, 1, 27)).unwrap().is_empty());
        assert_eq!(planner.tasks_for_date(OWNER, date(2026, 1, 29)).unwrap().len(), 1);

        let backlogged = planner
            .update_task(
                OWNER,
                &task.id,
                TaskUpdate {
                    date: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(backlogged.is_backlog());
        assert_eq!(planner.backlog(OWNER).unwrap()[0].id, task.id);
    }

    #[test]
    fn invalid_update_leaves_task_untouched() {
        let (planner, _) = setup_planner();
        let task = planner.create_task(OWNER, NewTask::new("keep")).unwrap();

        let err = planner
            .update_task(
                OWNER,
                &task.id,
                TaskUpdate {
                    content: Some("changed".to_string()),
                    status: Some("paused".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStatus);
        assert_eq!(planner.get_task(OWNER, &task.id).unwrap().content, "keep");
    }
}

mod delete_tests {
    use super::*;

    #[test]
    fn delete_closes_running_timer_first() {
        let (planner, clock) = setup_planner();
        let task = planner
            .create_task(OWNER, NewTask::new("running").on(date(2026, 1, 27)))
            .unwrap();
        planner.start_timer(OWNER, &task.id).unwrap();
        clock.advance(chrono::Duration::minutes(25));

        planner.delete_task(OWNER, &task.id).unwrap();

        assert!(planner.running_entry(OWNER).unwrap().is_none());
        let entries = planner.entries_for_date(OWNER, date(2026, 1, 27)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration_minutes(), Some(25));
        // The entry survives the task, detached from it.
        assert_eq!(entries[0].task_id, None);
        assert_eq!(
            planner.get_task(OWNER, &task.id).unwrap_err().code,
            ErrorCode::TaskNotFound
        );
    }

    #[test]
    fn delete_leaves_other_timers_alone() {
        let (planner, _) = setup_planner();
        let idle = planner.create_task(OWNER, NewTask::new("idle")).unwrap();
        let busy = planner.create_task(OWNER, NewTask::new("busy")).unwrap();
        planner.start_timer(OWNER, &busy.id).unwrap();

        planner.delete_task(OWNER, &idle.id).unwrap();

        let running = planner.running_entry(OWNER).unwrap().unwrap();
        assert_eq!(running.task_id.as_deref(), Some(busy.id.as_str()));
    }
}

mod listing_tests {
    use super::*;

    #[test]
    fn listing_order_is_open_first_then_priority_then_manual_order() {
        let (planner, _) = setup_planner();
        let day = date(2026, 1, 27);

        let low = planner
            .create_task(OWNER, NewTask::new("low").on(day).with_priority(1))
            .unwrap();
        let high_done = planner
            .create_task(OWNER, NewTask::new("high done").on(day).with_priority(5))
            .unwrap();
        let mid_a = planner.create_task(OWNER, NewTask::new("mid a").on(day)).unwrap();
        let mid_b = planner.create_task(OWNER, NewTask::new("mid b").on(day)).unwrap();
        let high = planner
            .create_task(OWNER, NewTask::new("high").on(day).with_priority(5))
            .unwrap();
        planner.set_completion(OWNER, &high_done.id, true).unwrap();

        let ids: Vec<String> = planner
            .tasks_for_date(OWNER, day)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(ids, vec![high.id, mid_a.id, mid_b.id, low.id, high_done.id]);
    }

    #[test]
    fn backlog_excludes_completed_and_dated() {
        let (planner, _) = setup_planner();

        let open = planner.create_task(OWNER, NewTask::new("open")).unwrap();
        let done = planner.create_task(OWNER, NewTask::new("done")).unwrap();
        planner.set_completion(OWNER, &done.id, true).unwrap();
        planner
            .create_task(OWNER, NewTask::new("dated").on(date(2026, 1, 27)))
            .unwrap();
        planner.create_task(OTHER, NewTask::new("not mine")).unwrap();

        let backlog = planner.backlog(OWNER).unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, open.id);
    }

    #[test]
    fn pending_lists_incomplete_tasks_before_date() {
        let (planner, _) = setup_planner();

        let overdue = planner
            .create_task(OWNER, NewTask::new("overdue").on(date(2026, 1, 20)))
            .unwrap();
        let finished = planner
            .create_task(OWNER, NewTask::new("finished").on(date(2026, 1, 21)))
            .unwrap();
        planner.set_completion(OWNER, &finished.id, true).unwrap();
        planner
            .create_task(OWNER, NewTask::new("today").on(date(2026, 1, 27)))
            .unwrap();
        planner.create_task(OWNER, NewTask::new("someday")).unwrap();

        let pending = planner
            .pending_from_previous_dates(OWNER, date(2026, 1, 27))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, overdue.id);
    }
}

mod external_link_tests {
    use super::*;

    #[test]
    fn linked_task_uses_external_label() {
        let (planner, _) = setup_planner();
        let task = planner.create_task(OWNER, NewTask::new("sync me")).unwrap();
        assert_eq!(task.display_label(), "TASK-1");

        let linked = planner
            .link_external(
                OWNER,
                &task.id,
                Some("PROJ-42"),
                Some("https://tracker.example/PROJ-42"),
            )
            .unwrap();
        assert_eq!(linked.display_label(), "PROJ-42");
        // The display code is stable regardless of linkage.
        assert_eq!(linked.display_code, "TASK-1");

        let found = planner.find_by_external_key(OWNER, "PROJ-42").unwrap().unwrap();
        assert_eq!(found.id, task.id);
        assert!(planner.find_by_external_key(OTHER, "PROJ-42").unwrap().is_none());

        let unlinked = planner.link_external(OWNER, &task.id, None, None).unwrap();
        assert_eq!(unlinked.display_label(), "TASK-1");
    }
}
