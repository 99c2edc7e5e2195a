use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::models::{Task, TaskStatus};
use crate::recurrence::{RecurrenceManager, Window};

/// Result of reconciling one template against a task collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub tasks: Vec<Task>,
    /// Non-done instances dropped because the template changed
    pub removed: usize,
    /// Instances synthesized for occurrences not yet present
    pub added: usize,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.added > 0
    }

    fn unchanged(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.to_vec(),
            removed: 0,
            added: 0,
        }
    }
}

/// Materializes `template` into `tasks` for `window`, building a new collection.
///
/// With `keep_finished` false every non-done instance of the template is
/// dropped first, so an edited rule replaces its stale projections. Done
/// instances always survive. A template without a rule, without planned
/// bounds, or with a non-positive duration leaves the collection unchanged.
pub fn reconcile(tasks: &[Task], template: &Task, window: Window, keep_finished: bool) -> Reconciliation {
    let Some(manager) = RecurrenceManager::for_template(template) else {
        return Reconciliation::unchanged(tasks);
    };
    let duration = match template.planned_duration() {
        Some(duration) if duration > Duration::zero() => duration,
        _ => return Reconciliation::unchanged(tasks),
    };

    let before = tasks.len();
    let mut next: Vec<Task> = tasks
        .iter()
        .filter(|task| {
            keep_finished || !task.is_instance_of(template.id) || task.status == TaskStatus::Done
        })
        .cloned()
        .collect();
    let removed = before - next.len();

    let mut existing: HashSet<NaiveDateTime> = next
        .iter()
        .filter(|task| task.is_instance_of(template.id))
        .filter_map(|task| task.planned_start_at)
        .collect();

    let mut next_id = next.iter().map(|task| task.id).max().unwrap_or(0) + 1;
    let mut added = 0;
    for start in manager.generate_occurrences_in(window) {
        if !existing.insert(start) {
            continue;
        }
        next.push(instance_of(template, next_id, start, start + duration));
        next_id += 1;
        added += 1;
    }

    debug!(
        template_id = template.id,
        removed,
        added,
        "Reconciled template"
    );

    Reconciliation {
        tasks: next,
        removed,
        added,
    }
}

/// Applies [`reconcile`] to `tasks`, returning whether anything changed.
pub fn reconcile_in_place(tasks: &mut Vec<Task>, template: &Task, window: Window, keep_finished: bool) -> bool {
    let outcome = reconcile(tasks, template, window, keep_finished);
    let changed = outcome.changed();
    if changed {
        *tasks = outcome.tasks;
    }
    changed
}

/// Reconciles every template in `tasks` with finished history kept.
pub fn reconcile_all(tasks: &mut Vec<Task>, window: Window) -> bool {
    let templates: Vec<Task> = tasks
        .iter()
        .filter(|task| task.is_recurring_template)
        .cloned()
        .collect();

    let mut changed = false;
    for template in &templates {
        changed |= reconcile_in_place(tasks, template, window, true);
    }
    changed
}

fn instance_of(template: &Task, id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Task {
    Task {
        id,
        title: template.title.clone(),
        category: template.category.clone(),
        importance: template.importance.clone(),
        kind: template.kind,
        status: TaskStatus::Todo,
        planned_start_at: Some(start),
        planned_end_at: Some(end),
        actual_start_at: None,
        actual_end_at: None,
        completed_at: None,
        note: template.note.clone(),
        is_recurring_template: false,
        recurrence: None,
        template_id: Some(template.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, NewTaskData, RecurrenceRule, TaskKind};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn daily_template(id: i64) -> Task {
        NewTaskData {
            title: "Stretch".to_string(),
            category: Some("health".to_string()),
            importance: Some("high".to_string()),
            kind: Some(TaskKind::Task),
            note: Some("mat by the window".to_string()),
            planned_start_at: Some(at(2026, 2, 1, 8, 0)),
            planned_end_at: Some(at(2026, 2, 1, 8, 30)),
            is_recurring_template: true,
            recurrence: Some(RecurrenceRule::new(Frequency::Daily)),
            ..Default::default()
        }
        .into_task(id, at(2026, 2, 1, 0, 0))
    }

    fn three_days() -> Window {
        Window::from_dates(
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
        )
    }

    #[test]
    fn test_materializes_instances_from_template() {
        let template = daily_template(1);
        let outcome = reconcile(&[template.clone()], &template, three_days(), true);

        assert!(outcome.changed());
        assert_eq!(outcome.added, 3);
        let instances: Vec<&Task> = outcome.tasks.iter().filter(|t| t.is_instance_of(1)).collect();
        assert_eq!(instances.len(), 3);
        for (offset, instance) in instances.iter().enumerate() {
            assert_eq!(instance.id, 2 + offset as i64);
            assert_eq!(instance.title, "Stretch");
            assert_eq!(instance.category, "health");
            assert_eq!(instance.importance, "high");
            assert_eq!(instance.note.as_deref(), Some("mat by the window"));
            assert_eq!(instance.status, TaskStatus::Todo);
            assert!(!instance.is_recurring_template);
            assert_eq!(instance.recurrence, None);
            assert_eq!(instance.planned_duration(), Some(Duration::minutes(30)));
        }
    }

    #[test]
    fn test_huge_interval_template_materializes_only_its_seed() {
        let mut template = daily_template(1);
        template.recurrence = Some(RecurrenceRule::new(Frequency::Yearly).every(i64::MAX));
        let mut tasks = vec![template, daily_template(2)];
        tasks[1].recurrence = Some(RecurrenceRule::new(Frequency::Daily).every(1_000_000_000_000));

        assert!(reconcile_all(&mut tasks, three_days()));
        assert_eq!(tasks.iter().filter(|t| t.is_instance_of(1)).count(), 1);
        assert_eq!(tasks.iter().filter(|t| t.is_instance_of(2)).count(), 1);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let template = daily_template(1);
        let mut tasks = vec![template.clone()];
        assert!(reconcile_in_place(&mut tasks, &template, three_days(), true));
        let snapshot = tasks.clone();

        assert!(!reconcile_in_place(&mut tasks, &template, three_days(), true));
        assert_eq!(tasks, snapshot);
    }

    #[test]
    fn test_ids_continue_after_collection_maximum() {
        let template = daily_template(1);
        let mut unrelated = daily_template(40);
        unrelated.is_recurring_template = false;
        unrelated.recurrence = None;

        let outcome = reconcile(&[template.clone(), unrelated], &template, three_days(), true);
        let ids: Vec<i64> = outcome.tasks.iter().filter(|t| t.is_instance_of(1)).map(|t| t.id).collect();
        assert_eq!(ids, vec![41, 42, 43]);
    }

    #[test]
    fn test_edit_keeps_done_instances_and_drops_the_rest() {
        let template = daily_template(1);
        let mut tasks = vec![template.clone()];
        reconcile_in_place(&mut tasks, &template, three_days(), true);
        let done_id = tasks[1].id;
        tasks[1].status = TaskStatus::Done;
        tasks[1].completed_at = Some(at(2026, 2, 1, 8, 30));
        tasks[2].status = TaskStatus::InProgress;

        let mut edited = template.clone();
        edited.planned_start_at = Some(at(2026, 2, 1, 18, 0));
        edited.planned_end_at = Some(at(2026, 2, 1, 18, 45));
        tasks[0] = edited.clone();

        let outcome = reconcile(&tasks, &edited, three_days(), false);
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.added, 3);

        let instances: Vec<&Task> = outcome.tasks.iter().filter(|t| t.is_instance_of(1)).collect();
        assert_eq!(instances.len(), 4);
        assert!(instances.iter().any(|t| t.id == done_id && t.status == TaskStatus::Done));
        assert_eq!(
            instances.iter().filter(|t| t.planned_start_at.unwrap().time() == at(2026, 2, 1, 18, 0).time()).count(),
            3
        );
    }

    #[test]
    fn test_done_instance_blocks_duplicate_occurrence() {
        let template = daily_template(1);
        let mut tasks = vec![template.clone()];
        reconcile_in_place(&mut tasks, &template, three_days(), true);
        for task in tasks.iter_mut().filter(|t| t.is_instance_of(1)) {
            task.status = TaskStatus::Done;
        }

        let outcome = reconcile(&tasks, &template, three_days(), false);
        assert!(!outcome.changed());
        assert_eq!(outcome.tasks, tasks);
    }

    #[test]
    fn test_other_templates_instances_are_untouched() {
        let first = daily_template(1);
        let second = daily_template(2);
        let mut tasks = vec![first.clone(), second.clone()];
        reconcile_all(&mut tasks, three_days());
        assert_eq!(tasks.len(), 8);

        let outcome = reconcile(&tasks, &first, three_days(), false);
        assert_eq!(outcome.removed, 3);
        assert_eq!(outcome.tasks.iter().filter(|t| t.is_instance_of(2)).count(), 3);
    }

    #[test]
    fn test_preconditions_make_reconcile_a_no_op() {
        let mut plain = daily_template(1);
        plain.is_recurring_template = false;
        assert!(!reconcile(&[plain.clone()], &plain, three_days(), true).changed());

        let mut no_rule = daily_template(1);
        no_rule.recurrence = None;
        assert!(!reconcile(&[no_rule.clone()], &no_rule, three_days(), true).changed());

        let mut no_end = daily_template(1);
        no_end.planned_end_at = None;
        assert!(!reconcile(&[no_end.clone()], &no_end, three_days(), true).changed());

        let mut zero = daily_template(1);
        zero.planned_end_at = zero.planned_start_at;
        assert!(!reconcile(&[zero.clone()], &zero, three_days(), false).changed());
    }

    #[test]
    fn test_reconcile_all_skips_plain_tasks() {
        let mut plain = daily_template(1);
        plain.is_recurring_template = false;
        let mut tasks = vec![plain];
        assert!(!reconcile_all(&mut tasks, three_days()));
        assert_eq!(tasks.len(), 1);
    }
}
