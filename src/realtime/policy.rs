// src/realtime/policy.rs

use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    realtime::{ChangeEvent, ChangeKind, Filter, Table},
    utils::jwt::Actor,
};

/// Checks a subscription request and returns the filter to apply.
///
/// * Admins may follow any table with any filter.
/// * Students cannot follow `profiles` or `answers`.
/// * Student subscriptions to `quiz_attempts` are pinned to their own rows.
/// * Question events reach students only while the quiz is active; see
///   [`gated_quiz`].
pub fn authorize(actor: &Actor, table: Table, filter: Option<Filter>) -> AppResult<Option<Filter>> {
    if actor.is_admin() {
        return Ok(filter);
    }

    match table {
        Table::Profiles | Table::Answers => Err(AppError::Forbidden(format!(
            "Students cannot subscribe to {table}"
        ))),
        Table::QuizAttempts => {
            let own = Filter::eq("user_id", actor.user_id);
            match filter {
                None => Ok(Some(own)),
                Some(requested) if requested == own => Ok(Some(own)),
                Some(_) => Err(AppError::Forbidden(
                    "Students can only follow their own attempts".to_string(),
                )),
            }
        }
        Table::Quizzes | Table::Questions => Ok(filter),
    }
}

/// Shapes one event for a subscriber, or drops it.
///
/// Students never receive `correct_answer`, and quiz visibility follows
/// `is_active`: a quiz turning inactive reaches them as a delete, turning
/// active as an insert.
pub fn view(actor: &Actor, event: &ChangeEvent) -> Option<ChangeEvent> {
    if actor.is_admin() {
        return Some(event.clone());
    }

    match event.table {
        Table::Profiles | Table::Answers => None,
        Table::QuizAttempts => {
            let owner = actor.user_id.to_string();
            let owned = matches!(event.field("user_id"), Some(Value::String(id)) if *id == owner);
            owned.then(|| event.clone())
        }
        Table::Questions => {
            let mut event = event.clone();
            for image in [event.new.as_mut(), event.old.as_mut()].into_iter().flatten() {
                if let Value::Object(row) = image {
                    row.remove("correct_answer");
                }
            }
            Some(event)
        }
        Table::Quizzes => quiz_view(event),
    }
}

/// The quiz whose visibility decides whether `actor` sees this event, if
/// any. Students follow questions of active quizzes only, so the caller
/// looks the quiz up before forwarding. A question event without a readable
/// `quiz_id` gates on the nil id, which never matches a quiz.
pub fn gated_quiz(actor: &Actor, event: &ChangeEvent) -> Option<Uuid> {
    if actor.is_admin() || event.table != Table::Questions {
        return None;
    }
    let quiz_id = event
        .field("quiz_id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse().ok());
    Some(quiz_id.unwrap_or_else(Uuid::nil))
}

fn is_active(image: Option<&Value>) -> Option<bool> {
    image.and_then(|row| row.get("is_active")).and_then(Value::as_bool)
}

fn quiz_view(event: &ChangeEvent) -> Option<ChangeEvent> {
    match event.kind {
        ChangeKind::Insert => is_active(event.new.as_ref())
            .unwrap_or(false)
            .then(|| event.clone()),
        ChangeKind::Delete => Some(event.clone()),
        ChangeKind::Update => {
            let now = is_active(event.new.as_ref()).unwrap_or(false);
            // Missing old image: assume the quiz was visible.
            let before = is_active(event.old.as_ref()).unwrap_or(true);
            match (before, now) {
                (false, true) => Some(ChangeEvent {
                    kind: ChangeKind::Insert,
                    old: None,
                    ..event.clone()
                }),
                (true, true) => Some(event.clone()),
                (true, false) => Some(ChangeEvent {
                    table: event.table,
                    kind: ChangeKind::Delete,
                    new: None,
                    old: event.new.clone(),
                }),
                (false, false) => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use serde_json::json;
    use uuid::Uuid;

    fn student() -> Actor {
        Actor::new(Uuid::new_v4(), Uuid::new_v4(), Role::Student)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin)
    }

    fn quiz_update(before: bool, after: bool) -> ChangeEvent {
        ChangeEvent {
            table: Table::Quizzes,
            kind: ChangeKind::Update,
            new: Some(json!({"id": "q", "is_active": after})),
            old: Some(json!({"id": "q", "is_active": before})),
        }
    }

    #[test]
    fn students_cannot_follow_private_tables() {
        let actor = student();
        assert!(authorize(&actor, Table::Profiles, None).is_err());
        assert!(authorize(&actor, Table::Answers, None).is_err());
        assert!(authorize(&admin(), Table::Answers, None).is_ok());
    }

    #[test]
    fn student_attempt_subscription_is_pinned_to_self() {
        let actor = student();
        let filter = authorize(&actor, Table::QuizAttempts, None).unwrap();
        assert_eq!(filter, Some(Filter::eq("user_id", actor.user_id)));

        let other = Filter::eq("user_id", Uuid::new_v4());
        assert!(authorize(&actor, Table::QuizAttempts, Some(other)).is_err());
    }

    #[test]
    fn question_events_lose_answer_key_for_students() {
        let event = ChangeEvent {
            table: Table::Questions,
            kind: ChangeKind::Update,
            new: Some(json!({"id": "q", "correct_answer": "A"})),
            old: Some(json!({"id": "q", "correct_answer": "B"})),
        };
        let shaped = view(&student(), &event).unwrap();
        assert!(shaped.new.unwrap().get("correct_answer").is_none());
        assert!(shaped.old.unwrap().get("correct_answer").is_none());

        let untouched = view(&admin(), &event).unwrap();
        assert_eq!(untouched, event);
    }

    #[test]
    fn student_question_events_wait_on_their_quiz() {
        let quiz_id = Uuid::new_v4();
        let event = ChangeEvent::insert(Table::Questions, &json!({"id": "q", "quiz_id": quiz_id}));
        assert_eq!(gated_quiz(&student(), &event), Some(quiz_id));
        assert_eq!(gated_quiz(&admin(), &event), None);

        let orphan = ChangeEvent::insert(Table::Questions, &json!({"id": "q"}));
        assert_eq!(gated_quiz(&student(), &orphan), Some(Uuid::nil()));

        let quiz = quiz_update(true, true);
        assert_eq!(gated_quiz(&student(), &quiz), None);
    }

    #[test]
    fn other_students_attempts_are_dropped() {
        let actor = student();
        let own = ChangeEvent::insert(Table::QuizAttempts, &json!({"id": "a", "user_id": actor.user_id}));
        let foreign =
            ChangeEvent::insert(Table::QuizAttempts, &json!({"id": "b", "user_id": Uuid::new_v4()}));
        assert!(view(&actor, &own).is_some());
        assert!(view(&actor, &foreign).is_none());
    }

    #[test]
    fn quiz_deactivation_reads_as_delete_for_students() {
        let actor = student();

        let shaped = view(&actor, &quiz_update(true, false)).unwrap();
        assert_eq!(shaped.kind, ChangeKind::Delete);
        assert_eq!(shaped.old.unwrap()["id"], json!("q"));

        let shaped = view(&actor, &quiz_update(false, true)).unwrap();
        assert_eq!(shaped.kind, ChangeKind::Insert);

        assert_eq!(view(&actor, &quiz_update(true, true)).unwrap().kind, ChangeKind::Update);
        assert!(view(&actor, &quiz_update(false, false)).is_none());
        assert_eq!(view(&admin(), &quiz_update(true, false)).unwrap().kind, ChangeKind::Update);
    }

    #[test]
    fn inactive_quiz_inserts_are_hidden_from_students() {
        let event = ChangeEvent::insert(Table::Quizzes, &json!({"id": "q", "is_active": false}));
        assert!(view(&student(), &event).is_none());
    }
}
