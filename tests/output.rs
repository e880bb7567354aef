use chrono::NaiveDate;
use tasksync::output::{format_human, format_task_line, HumanOutput};
use tasksync::task::{Priority, Task};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("tasksync add: created task");
    human.push_summary("id", "t1");
    human.push_detail("Task created successfully");
    human.push_warning("push channel offline");
    human.push_next_step("tasksync list");

    let rendered = format_human(&human);
    assert!(rendered.contains("tasksync add: created task"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- id: t1"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- Task created successfully"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- push channel offline"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- tasksync list"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("tasksync list: 0 task(s)");
    let rendered = format_human(&human);
    assert_eq!(rendered, "tasksync list: 0 task(s)");
}

#[test]
fn task_line_shows_state_priority_and_due() {
    let task = Task {
        id: Some("t1".to_string()),
        title: "Ship it".to_string(),
        priority: Priority::High,
        due_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        completed: true,
        ..Task::default()
    };
    assert_eq!(format_task_line(&task), "[x] t1  Ship it  (high, due 2024-06-01)");

    let draft = Task {
        title: "Later".to_string(),
        ..Task::draft()
    };
    assert_eq!(format_task_line(&draft), "[ ] -  Later  (low)");
}
