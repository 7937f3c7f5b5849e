//! Task service integration tests.
//!
//! Tests that creating, editing, completing and deleting tasks keeps their
//! reminders in step.

use chrono::TimeDelta;
use nudge::testing::{EventRecorder, RecordingSink};
use nudge::{
    InMemoryTaskStore, NewTask, Priority, ReminderState, RequestProblem, SchedulerError,
    TaskService, TaskServiceError, TaskUpdate, User,
};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{recorded_scheduler, start, wait_for_deliveries};

fn alice() -> User {
    User::new("alice", "alice@example.com")
}

fn bob() -> User {
    User::new("bob", "bob@example.com")
}

async fn service(
    sink: Arc<RecordingSink>,
) -> (TaskService<InMemoryTaskStore>, Arc<EventRecorder>) {
    let (scheduler, recorder) = recorded_scheduler(sink).await;
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_notify_on_create(false);
    (service, recorder)
}

fn due_in(title: &str, minutes: i64) -> NewTask {
    NewTask::new(title).due_at(start() + TimeDelta::minutes(minutes))
}

#[tokio::test(start_paused = true)]
async fn test_creating_task_with_due_date_arms_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service
        .create(&alice(), due_in("Attend morning team meeting", 10))
        .await
        .unwrap();
    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Armed));
    assert_eq!(service.scheduler().active_count(), 1);

    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(600)).await;
    assert_eq!(deliveries[0].recipient, "alice@example.com");
    assert_eq!(
        deliveries[0].message,
        "Reminder: Your task \"Attend morning team meeting\" is due in 5 minutes."
    );
    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Fired));
}

#[tokio::test(start_paused = true)]
async fn test_creation_notice_is_sent_when_enabled() {
    let sink = Arc::new(RecordingSink::new());
    let (scheduler, _) = recorded_scheduler(sink.clone()).await;
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_timezone(chrono_tz::Europe::Berlin);

    service.create(&alice(), due_in("Standup", 60)).await.unwrap();

    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(1)).await;
    assert_eq!(
        deliveries[0].message,
        "You have created a new task: Standup. Due date: 2026-03-14 11:00 CET"
    );

    // Then the reminder itself
    let deliveries = wait_for_deliveries(&sink, 2, Duration::from_secs(3600)).await;
    assert_eq!(
        deliveries[1].message,
        "Reminder: Your task \"Standup\" is due in 5 minutes."
    );
}

#[tokio::test(start_paused = true)]
async fn test_task_without_due_date_has_no_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service
        .create(&alice(), NewTask::new("Someday"))
        .await
        .unwrap();
    assert_eq!(service.reminder_state(&task.id), None);
    assert_eq!(service.scheduler().active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overdue_task_gets_cancelled_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Late", -60)).await.unwrap();
    assert_eq!(
        service.reminder_state(&task.id),
        Some(ReminderState::Cancelled)
    );

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_title_is_rejected() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let result = service.create(&alice(), due_in("  ", 10)).await;
    assert!(matches!(result, Err(TaskServiceError::InvalidTask(_))));
    assert!(service.list(&alice()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_user_without_email_is_rejected() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let result = service
        .create(&User::new("ghost", ""), due_in("Haunt", 10))
        .await;
    assert!(matches!(result, Err(TaskServiceError::InvalidTask(_))));
}

#[tokio::test(start_paused = true)]
async fn test_changing_due_date_rearms_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;
    let created_at = tokio::time::Instant::now();

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    service
        .update(
            &alice(),
            &task.id,
            TaskUpdate::new().due_at(start() + TimeDelta::minutes(30)),
        )
        .await
        .unwrap();

    assert_eq!(service.scheduler().active_count(), 1);
    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Armed));

    // The original fire time passes without a delivery
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(sink.count(), 0);

    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(1800)).await;
    assert!(deliveries[0].at >= created_at + Duration::from_secs(25 * 60));

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_changing_title_updates_reminder_text() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    service
        .update(&alice(), &task.id, TaskUpdate::new().title("Retro"))
        .await
        .unwrap();

    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(600)).await;
    assert_eq!(
        deliveries[0].message,
        "Reminder: Your task \"Retro\" is due in 5 minutes."
    );

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_change_keeps_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, recorder) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    let updated = service
        .update(
            &alice(),
            &task.id,
            TaskUpdate::new()
                .priority(Priority::High)
                .description("bring notes"),
        )
        .await
        .unwrap();
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.description, "bring notes");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        recorder
            .count_where(|e| matches!(e, nudge::Event::ReminderCancelled { .. }))
            .await,
        0
    );

    wait_for_deliveries(&sink, 1, Duration::from_secs(600)).await;
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completing_task_cancels_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    let completed = service.complete(&alice(), &task.id).await.unwrap();

    assert!(completed.completed);
    assert_eq!(
        service.reminder_state(&task.id),
        Some(ReminderState::Cancelled)
    );
    assert_eq!(service.scheduler().active_count(), 0);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reopening_task_rearms_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    service.complete(&alice(), &task.id).await.unwrap();
    service
        .update(&alice(), &task.id, TaskUpdate::new().completed(false))
        .await
        .unwrap();

    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Armed));
    wait_for_deliveries(&sink, 1, Duration::from_secs(600)).await;
}

#[tokio::test(start_paused = true)]
async fn test_deleting_task_cancels_reminder() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();
    service.delete(&alice(), &task.id).await.unwrap();

    assert_eq!(service.reminder_state(&task.id), None);
    assert_eq!(service.scheduler().active_count(), 0);
    assert!(matches!(
        service.get(&alice(), &task.id).await,
        Err(TaskServiceError::NotFound(_))
    ));

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_other_users_cannot_touch_task() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    let task = service.create(&alice(), due_in("Standup", 10)).await.unwrap();

    assert!(matches!(
        service.get(&bob(), &task.id).await,
        Err(TaskServiceError::NotAuthorized(_))
    ));
    assert!(matches!(
        service
            .update(&bob(), &task.id, TaskUpdate::new().title("Mine now"))
            .await,
        Err(TaskServiceError::NotAuthorized(_))
    ));
    assert!(matches!(
        service.delete(&bob(), &task.id).await,
        Err(TaskServiceError::NotAuthorized(_))
    ));

    // Alice's reminder is untouched
    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Armed));
    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(600)).await;
    assert_eq!(deliveries[0].recipient, "alice@example.com");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_task_is_not_found() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;
    let missing = nudge::TaskId::new("missing");

    assert!(matches!(
        service.complete(&alice(), &missing).await,
        Err(TaskServiceError::NotFound(_))
    ));
    assert!(matches!(
        service.delete(&alice(), &missing).await,
        Err(TaskServiceError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_list_returns_own_tasks_by_due_date() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;

    service.create(&alice(), due_in("Later", 120)).await.unwrap();
    service
        .create(&alice(), NewTask::new("Someday"))
        .await
        .unwrap();
    service.create(&alice(), due_in("Sooner", 30)).await.unwrap();
    service.create(&bob(), due_in("Bob's", 5)).await.unwrap();

    let titles: Vec<_> = service
        .list(&alice())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Sooner", "Later", "Someday"]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_lead_time_is_used_in_timing_and_text() {
    let sink = Arc::new(RecordingSink::new());
    let (scheduler, _) = recorded_scheduler(sink.clone()).await;
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_notify_on_create(false)
        .with_lead_time(TimeDelta::hours(1));
    let created_at = tokio::time::Instant::now();

    service.create(&alice(), due_in("Flight", 180)).await.unwrap();

    let deliveries = wait_for_deliveries(&sink, 1, Duration::from_secs(3 * 3600)).await;
    assert_eq!(
        deliveries[0].message,
        "Reminder: Your task \"Flight\" is due in 1 hour."
    );
    assert!(deliveries[0].at >= created_at + Duration::from_secs(2 * 3600));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_reminder_leaves_no_task_or_notice() {
    let sink = Arc::new(RecordingSink::new());
    let (scheduler, _) = recorded_scheduler(sink.clone()).await;
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_lead_time(TimeDelta::minutes(-5));

    let result = service.create(&alice(), due_in("Report", 60)).await;
    assert!(matches!(
        result,
        Err(TaskServiceError::Scheduler(SchedulerError::InvalidRequest(
            RequestProblem::NegativeLeadTime
        )))
    ));

    assert!(service.store().is_empty());
    assert!(service.list(&alice()).await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(sink.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_rearm_leaves_task_unchanged() {
    let sink = Arc::new(RecordingSink::new());
    let (scheduler, _) = recorded_scheduler(sink.clone()).await;
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_notify_on_create(false)
        .with_lead_time(TimeDelta::minutes(-5));

    // No due date, so nothing to arm yet
    let task = service.create(&alice(), NewTask::new("Report")).await.unwrap();

    let result = service
        .update(
            &alice(),
            &task.id,
            TaskUpdate::new().due_at(start() + TimeDelta::hours(1)),
        )
        .await;
    assert!(matches!(result, Err(TaskServiceError::Scheduler(_))));

    let stored = service.get(&alice(), &task.id).await.unwrap();
    assert_eq!(stored.due_at, None);
    assert_eq!(service.reminder_state(&task.id), None);
    assert_eq!(service.scheduler().active_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_keep_one_reminder_armed() {
    let sink = Arc::new(RecordingSink::new());
    let (service, _) = service(sink.clone()).await;
    let service = Arc::new(service);

    let task = service.create(&alice(), due_in("Standup", 600)).await.unwrap();

    let edits: Vec<_> = (0..50)
        .map(|i| {
            let service = Arc::clone(&service);
            let id = task.id.clone();
            tokio::spawn(async move {
                service
                    .update(
                        &alice(),
                        &id,
                        TaskUpdate::new().due_at(start() + TimeDelta::minutes(601 + i)),
                    )
                    .await
            })
        })
        .collect();
    for edit in edits {
        edit.await.unwrap().unwrap();
    }

    assert_eq!(service.scheduler().active_count(), 1);
    assert_eq!(service.reminder_state(&task.id), Some(ReminderState::Armed));

    // The surviving reminder is the one the service can still cancel
    service.delete(&alice(), &task.id).await.unwrap();
    assert_eq!(service.scheduler().active_count(), 0);
    assert_eq!(sink.count(), 0);
}
