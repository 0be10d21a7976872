// src/realtime/reconcile.rs

//! Folding change events into locally held rows.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{answer::Answer, profile::Profile, question::Question, quiz::Quiz, quiz_attempt::QuizAttempt},
    realtime::{ChangeEvent, ChangeKind},
};

/// Rows keyed by identifier.
pub trait Identified {
    fn id(&self) -> Uuid;
}

macro_rules! identified {
    ($($ty:ty),* $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
        })*
    };
}

identified!(Profile, Quiz, Question, QuizAttempt, Answer);

/// A typed change for rows of type `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Insert(T),
    Update(T),
    Delete(Uuid),
}

impl<T: DeserializeOwned> Change<T> {
    pub fn from_event(event: &ChangeEvent) -> AppResult<Self> {
        match event.kind {
            ChangeKind::Insert => Ok(Change::Insert(decode(event.new.as_ref())?)),
            ChangeKind::Update => Ok(Change::Update(decode(event.new.as_ref())?)),
            ChangeKind::Delete => {
                let id = event
                    .old
                    .as_ref()
                    .and_then(|row| row.get("id"))
                    .and_then(|id| id.as_str())
                    .and_then(|id| Uuid::parse_str(id).ok())
                    .ok_or_else(|| {
                        AppError::BadRequest("Delete event without a row id".to_string())
                    })?;
                Ok(Change::Delete(id))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(image: Option<&serde_json::Value>) -> AppResult<T> {
    let image = image.ok_or_else(|| AppError::BadRequest("Change event without a row".to_string()))?;
    Ok(T::deserialize(image)?)
}

/// Where inserted rows land in a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// Newest-first lists.
    #[default]
    Front,
    Back,
}

/// Applies one change to a list. Returns whether the list changed.
///
/// * Insert of an id already present replaces that row in place.
/// * Update of an unknown id is ignored.
/// * Delete of an unknown id is a no-op.
pub fn apply<T: Identified>(items: &mut Vec<T>, change: Change<T>, position: InsertPosition) -> bool {
    match change {
        Change::Insert(row) => {
            if let Some(slot) = items.iter_mut().find(|item| item.id() == row.id()) {
                *slot = row;
            } else {
                match position {
                    InsertPosition::Front => items.insert(0, row),
                    InsertPosition::Back => items.push(row),
                }
            }
            true
        }
        Change::Update(row) => match items.iter_mut().find(|item| item.id() == row.id()) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        },
        Change::Delete(id) => {
            let before = items.len();
            items.retain(|item| item.id() != id);
            items.len() != before
        }
    }
}

/// A list view kept in sync with change events.
#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    items: Vec<T>,
    position: InsertPosition,
}

impl<T: Identified + DeserializeOwned> LiveCollection<T> {
    pub fn new(items: Vec<T>, position: InsertPosition) -> Self {
        Self { items, position }
    }

    pub fn apply(&mut self, change: Change<T>) -> bool {
        apply(&mut self.items, change, self.position)
    }

    pub fn apply_event(&mut self, event: &ChangeEvent) -> AppResult<bool> {
        Ok(self.apply(Change::from_event(event)?))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

/// A detail view of one row. Changes to other rows are ignored.
#[derive(Debug, Clone)]
pub struct LiveRecord<T> {
    id: Uuid,
    value: Option<T>,
}

impl<T: Identified + DeserializeOwned> LiveRecord<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: value.id(),
            value: Some(value),
        }
    }

    pub fn apply(&mut self, change: Change<T>) -> bool {
        match change {
            Change::Insert(row) | Change::Update(row) if row.id() == self.id => {
                self.value = Some(row);
                true
            }
            Change::Delete(id) if id == self.id => self.value.take().is_some(),
            _ => false,
        }
    }

    pub fn apply_event(&mut self, event: &ChangeEvent) -> AppResult<bool> {
        Ok(self.apply(Change::from_event(event)?))
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// True once a delete for this row has been seen.
    pub fn is_deleted(&self) -> bool {
        self.value.is_none()
    }
}
