//! A multi-column table control.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::{ObservableList, ObservableRef, ObservableValue, Signal};

use crate::graph::{NodeBase, UiNode};

use super::{bump_on_list, content_revision};

type CellValueFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type CommitFn<T> = Arc<dyn Fn(&mut T, &str) + Send + Sync>;

/// One column of a [`TableView`].
///
/// A freshly declared column has no cell-value strategy; the cell-value
/// configuration extension installs one, together with an optional commit
/// mutator for editable columns.
pub struct TableColumn<T> {
    id: String,
    title: String,
    cell_value: Option<CellValueFn<T>>,
    editable: bool,
    commit: Option<CommitFn<T>>,
}

impl<T> TableColumn<T> {
    /// Declare a column with an id and a header title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            cell_value: None,
            editable: false,
            commit: None,
        }
    }

    /// The column id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The header title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether edits can be committed into this column.
    pub fn is_editable(&self) -> bool {
        self.editable
    }
}

/// A committed cell edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellCommit {
    /// Row index of the edited cell.
    pub row: usize,
    /// Id of the edited column.
    pub column_id: String,
    /// The committed text.
    pub text: String,
}

/// A table with typed rows, named columns and a selection list.
pub struct TableView<T: Clone + PartialEq + Send + Sync + 'static> {
    base: NodeBase,
    items: ObservableList<T>,
    selection: ObservableList<T>,
    multi_select: ObservableValue<bool>,
    columns: RwLock<Vec<TableColumn<T>>>,
    edit_committed: Signal<CellCommit>,
    revision: ObservableValue<u64>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> TableView<T> {
    /// Create a table with the given id, columns and rows.
    pub fn new(id: impl Into<String>, columns: Vec<TableColumn<T>>, rows: Vec<T>) -> Arc<Self> {
        let items = ObservableList::from_vec(rows);
        let selection = ObservableList::new();
        let revision = content_revision();
        bump_on_list(&items, &revision);
        bump_on_list(&selection, &revision);
        Arc::new(Self {
            base: NodeBase::new(id),
            items,
            selection,
            multi_select: ObservableValue::new(false),
            columns: RwLock::new(columns),
            edit_committed: Signal::new(),
            revision,
        })
    }

    /// The backing row list.
    pub fn items(&self) -> &ObservableList<T> {
        &self.items
    }

    /// The live selection list.
    pub fn selection(&self) -> &ObservableList<T> {
        &self.selection
    }

    /// Select a row, honouring the multi-select switch.
    pub fn select(&self, row: T) {
        if self.multi_select.get() {
            if !self.selection.contains(&row) {
                self.selection.push(row);
            }
        } else {
            self.selection.set_all(vec![row]);
        }
    }

    /// Number of declared columns.
    pub fn column_count(&self) -> usize {
        self.columns.read().len()
    }

    /// Position of a column by id.
    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.read().iter().position(|c| c.id == column_id)
    }

    /// Read a column id by position.
    pub fn column_id_at(&self, index: usize) -> Option<String> {
        self.columns.read().get(index).map(|c| c.id.clone())
    }

    /// Install the cell-value strategy for a column.
    pub fn configure_column<F>(&self, index: usize, cell_value: F)
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        if let Some(column) = self.columns.write().get_mut(index) {
            column.cell_value = Some(Arc::new(cell_value));
        }
    }

    /// Mark a column editable and install its commit mutator.
    pub fn configure_editable<F>(&self, index: usize, commit: F)
    where
        F: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        if let Some(column) = self.columns.write().get_mut(index) {
            column.editable = true;
            column.commit = Some(Arc::new(commit));
        }
    }

    /// Whether a column has a cell-value strategy installed.
    pub fn column_configured(&self, index: usize) -> bool {
        self.columns
            .read()
            .get(index)
            .is_some_and(|c| c.cell_value.is_some())
    }

    /// Render the cell at `(row, column)`.
    pub fn cell_text(&self, row: usize, column: usize) -> Option<String> {
        let columns = self.columns.read();
        let cell_value = columns.get(column)?.cell_value.as_ref()?;
        let item = self.items.get(row)?;
        Some(cell_value(&item))
    }

    /// Commit an edited cell value back into the backing row.
    ///
    /// Returns `false` when the column is not editable or out of range; a
    /// successful commit mutates the row in place and fires
    /// [`on_edit_committed`](Self::on_edit_committed) listeners.
    pub fn commit_edit(&self, row: usize, column: usize, text: &str) -> bool {
        let (column_id, commit) = {
            let columns = self.columns.read();
            let Some(col) = columns.get(column) else {
                return false;
            };
            if !col.editable {
                return false;
            }
            let Some(commit) = col.commit.clone() else {
                return false;
            };
            (col.id.clone(), commit)
        };
        if !self.items.update(row, |item| commit(item, text)) {
            return false;
        }
        self.edit_committed.emit(CellCommit {
            row,
            column_id,
            text: text.to_string(),
        });
        true
    }

    /// The edit-commit signal.
    pub fn on_edit_committed(&self) -> &Signal<CellCommit> {
        &self.edit_committed
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> std::fmt::Debug for TableView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableView")
            .field("id", &self.base.id())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> UiNode for TableView<T> {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "table-view"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn user_value_set(&self) -> Option<bool> {
        Some(!self.selection.is_empty())
    }

    fn user_value_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.selection.clone()))
    }

    fn value_or_items_set(&self) -> Option<bool> {
        Some(!self.selection.is_empty() || !self.items.is_empty())
    }

    fn value_or_items_observable(&self) -> Option<ObservableRef> {
        Some(Arc::new(self.revision.clone()))
    }

    fn multi_select_flag(&self) -> Option<ObservableValue<bool>> {
        Some(self.multi_select.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Row {
        name: String,
        age: u32,
    }

    fn sample() -> Arc<TableView<Row>> {
        TableView::new(
            "people",
            vec![TableColumn::new("name", "Name"), TableColumn::new("age", "Age")],
            vec![
                Row { name: "ada".into(), age: 36 },
                Row { name: "grace".into(), age: 45 },
            ],
        )
    }

    #[test]
    fn test_cell_rendering_after_configuration() {
        let table = sample();
        assert_eq!(table.cell_text(0, 0), None);
        table.configure_column(0, |row: &Row| row.name.clone());
        assert_eq!(table.cell_text(0, 0), Some("ada".to_string()));
        assert_eq!(table.cell_text(1, 0), Some("grace".to_string()));
    }

    #[test]
    fn test_commit_edit_mutates_backing_row() {
        let table = sample();
        table.configure_column(1, |row: &Row| row.age.to_string());
        table.configure_editable(1, |row: &mut Row, text| {
            if let Ok(age) = text.parse() {
                row.age = age;
            }
        });

        assert!(table.commit_edit(0, 1, "37"));
        assert_eq!(table.items().get(0).unwrap().age, 37);
    }

    #[test]
    fn test_commit_edit_requires_editable_column() {
        let table = sample();
        table.configure_column(0, |row: &Row| row.name.clone());
        assert!(!table.commit_edit(0, 0, "x"));
    }

    #[test]
    fn test_column_resolution_helpers() {
        let table = sample();
        assert_eq!(table.column_index("age"), Some(1));
        assert_eq!(table.column_index("missing"), None);
        assert_eq!(table.column_id_at(0), Some("name".to_string()));
        assert_eq!(table.column_count(), 2);
    }
}
