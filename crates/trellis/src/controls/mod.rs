//! The headless control set.
//!
//! These controls implement the [`crate::graph::UiNode`] capability contract
//! without drawing anything: they carry the observable state a real toolkit
//! adapter would expose (text, checked flag, items, selection) and nothing
//! else. The wiring framework, its tests and embedding adapters all program
//! against the same surface.
//!
//! Control kinds and their capabilities:
//!
//! | control        | user value          | value-or-items           |
//! |----------------|---------------------|--------------------------|
//! | `TextInput`    | non-blank text      | same as user value       |
//! | `CheckBox`     | checked             | same as user value       |
//! | `Button`       | -                   | -                        |
//! | `ChoiceBox<T>` | selection           | selection or items       |
//! | `ListView<T>`  | selected items      | selection or items       |
//! | `TableView<T>` | selected rows       | selection or rows        |
//! | `TreeView<T>`  | selected values     | selection or roots       |

mod button;
mod check_box;
mod choice_box;
mod list_view;
mod pane;
mod table_view;
mod text_input;
mod tree_view;

pub use button::Button;
pub use check_box::CheckBox;
pub use choice_box::ChoiceBox;
pub use list_view::ListView;
pub use pane::Pane;
pub use table_view::{CellCommit, TableColumn, TableView};
pub use text_input::TextInput;
pub use tree_view::{TreeItem, TreeView};

use trellis_core::{ObservableList, ObservableValue};

/// A monotonically bumped revision cell used as the "value or content
/// changed" dependency of multi-surface controls.
///
/// Each contributing observable (items, selection) bumps the revision; a
/// predicate chain subscribing to it re-evaluates on any content change.
pub(crate) fn content_revision() -> ObservableValue<u64> {
    ObservableValue::new(0)
}

pub(crate) fn bump_on_value<T: Clone + Send + Sync + 'static>(
    source: &ObservableValue<T>,
    revision: &ObservableValue<u64>,
) {
    let revision = revision.clone();
    source.on_invalidate(move || {
        revision.set(revision.get().wrapping_add(1));
    });
}

pub(crate) fn bump_on_list<T: Clone + Send + Sync + 'static>(
    source: &ObservableList<T>,
    revision: &ObservableValue<u64>,
) {
    let revision = revision.clone();
    source.on_invalidate(move || {
        revision.set(revision.get().wrapping_add(1));
    });
}
