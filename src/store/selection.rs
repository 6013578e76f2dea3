//! Selection state machine with linear undo/redo history.
//!
//! Every operation is a pure transition `(Arc<AppState>, Action) ->
//! Arc<AppState>`: inputs are never mutated, and every no-op path returns
//! the *same* `Arc` (pointer-equal), so callers can detect "nothing
//! changed" without diffing. History is linear, not a tree: any
//! selection-changing action taken after an undo discards the entries
//! beyond the current pointer before appending.

use crate::store::models::{AppState, HistorySnapshot, Photo, PhotoGroup};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Action {
    /// Adopt freshly analyzed photos plus a grouping recomputed over the
    /// entire updated photo set. Grouping happens outside the store; this
    /// transition only records the result and re-derives auto-selection.
    Ingest {
        new_photos: Vec<Photo>,
        groups: Vec<PhotoGroup>,
        unique_photos: Vec<Photo>,
    },
    ToggleSelect {
        photo_id: String,
    },
    SelectAllInGroup {
        group_id: String,
    },
    DeselectAllInGroup {
        group_id: String,
    },
    SelectAll,
    DeselectAll,
    Undo,
    Redo,
}

/// Applies one transition, returning the next state. No-ops return the
/// input `Arc` unchanged.
pub fn apply(state: &Arc<AppState>, action: Action) -> Arc<AppState> {
    match action {
        Action::Ingest {
            new_photos,
            groups,
            unique_photos,
        } => ingest(state, new_photos, groups, unique_photos),
        Action::ToggleSelect { photo_id } => toggle_select(state, &photo_id),
        Action::SelectAllInGroup { group_id } => select_all_in_group(state, &group_id),
        Action::DeselectAllInGroup { group_id } => deselect_all_in_group(state, &group_id),
        Action::SelectAll => {
            let selected: BTreeSet<String> = state.photos.iter().map(|p| p.id.clone()).collect();
            with_selection(state, selected)
        }
        Action::DeselectAll => with_selection(state, BTreeSet::new()),
        Action::Undo => undo(state),
        Action::Redo => redo(state),
    }
}

/// Holds the canonical state and funnels all transitions through [`apply`].
pub struct SelectionStore {
    state: Arc<AppState>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AppState::empty()),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Applies `action`; returns whether the state actually changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let next = apply(&self.state, action);
        let changed = !Arc::ptr_eq(&next, &self.state);
        self.state = next;
        changed
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ingest(
    state: &Arc<AppState>,
    new_photos: Vec<Photo>,
    groups: Vec<PhotoGroup>,
    unique_photos: Vec<Photo>,
) -> Arc<AppState> {
    let first_ingestion = state.photos.is_empty();

    let mut photos = state.photos.clone();
    photos.extend(new_photos);

    // Auto-selection: every unique photo plus the keeper of every group.
    let mut selected: BTreeSet<String> = unique_photos.iter().map(|p| p.id.clone()).collect();
    for group in &groups {
        if let Some(best) = group.photos.first() {
            selected.insert(best.id.clone());
        }
    }

    let mut next = AppState {
        photos,
        groups,
        unique_photos,
        selected_photos: selected,
        history: state.history.clone(),
        current_history_index: state.current_history_index,
    };
    sync_selected_flags(&mut next);

    if first_ingestion {
        next.history = vec![HistorySnapshot::capture(&next.selected_photos)];
        next.current_history_index = 0;
    } else {
        push_history(&mut next);
    }

    Arc::new(next)
}

fn toggle_select(state: &Arc<AppState>, photo_id: &str) -> Arc<AppState> {
    // Ids not present in the photo set cannot change the selection, so the
    // no-change short-circuit below would fire anyway; bail out early.
    if !state.photos.iter().any(|p| p.id == photo_id) {
        return Arc::clone(state);
    }
    let mut selected = state.selected_photos.clone();
    if !selected.remove(photo_id) {
        selected.insert(photo_id.to_string());
    }
    with_selection(state, selected)
}

fn select_all_in_group(state: &Arc<AppState>, group_id: &str) -> Arc<AppState> {
    let Some(group) = state.groups.iter().find(|g| g.id == group_id) else {
        return Arc::clone(state);
    };
    let mut selected = state.selected_photos.clone();
    for photo in &group.photos {
        selected.insert(photo.id.clone());
    }
    with_selection(state, selected)
}

fn deselect_all_in_group(state: &Arc<AppState>, group_id: &str) -> Arc<AppState> {
    let Some(group) = state.groups.iter().find(|g| g.id == group_id) else {
        return Arc::clone(state);
    };
    let mut selected = state.selected_photos.clone();
    for photo in &group.photos {
        selected.remove(&photo.id);
    }
    with_selection(state, selected)
}

fn undo(state: &Arc<AppState>) -> Arc<AppState> {
    if state.current_history_index <= 0 {
        return Arc::clone(state);
    }
    restore(state, state.current_history_index - 1)
}

fn redo(state: &Arc<AppState>) -> Arc<AppState> {
    if state.current_history_index + 1 >= state.history.len() as isize {
        return Arc::clone(state);
    }
    restore(state, state.current_history_index + 1)
}

/// Commits a changed selection set: refreshes flags and records history.
/// Unchanged sets short-circuit to the input state.
fn with_selection(state: &Arc<AppState>, selected: BTreeSet<String>) -> Arc<AppState> {
    if selected == state.selected_photos {
        return Arc::clone(state);
    }
    let mut next = AppState::clone(state);
    next.selected_photos = selected;
    sync_selected_flags(&mut next);
    push_history(&mut next);
    Arc::new(next)
}

/// Moves the history pointer and restores that snapshot's selection.
/// History entries themselves are left untouched.
fn restore(state: &Arc<AppState>, index: isize) -> Arc<AppState> {
    let mut next = AppState::clone(state);
    next.current_history_index = index;
    next.selected_photos = next.history[index as usize].selected.clone();
    sync_selected_flags(&mut next);
    Arc::new(next)
}

/// Discards any redo tail beyond the pointer, then appends the current
/// selection as the newest entry.
fn push_history(next: &mut AppState) {
    let keep = (next.current_history_index + 1).max(0) as usize;
    next.history.truncate(keep);
    next.history.push(HistorySnapshot::capture(&next.selected_photos));
    next.current_history_index = next.history.len() as isize - 1;
}

/// Re-derives the cached `selected` flag on every photo copy the state
/// holds: the master list, group members, and uniques.
fn sync_selected_flags(state: &mut AppState) {
    let selected = &state.selected_photos;
    for photo in &mut state.photos {
        photo.selected = selected.contains(&photo.id);
    }
    for group in &mut state.groups {
        for photo in &mut group.photos {
            photo.selected = selected.contains(&photo.id);
        }
    }
    for photo in &mut state.unique_photos {
        photo.selected = selected.contains(&photo.id);
    }
}
