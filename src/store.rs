//! In-memory relational tables with auto-increment identity and
//! composite-key deduplication.
//!
//! An [`EntityStore`] is declared once with a fixed, ordered column list. Rows
//! are appended in insertion order and receive sequential 1-based identities.
//! When a unique key is configured, inserting a row whose key was already
//! seen returns the identity of the first such row instead of appending.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;

use crate::entity::{CellValue, Entity, EntityError, RowId};

/// Separator placed between key parts so that `(1, 23)` and `(12, 3)` differ.
const KEY_SEPARATOR: char = '\u{1f}';

/// Header of the synthetic identity column prepended by [`EntityStore::render`].
pub const ID_COLUMN: &str = "Id";

/// A named table of untyped rows.
#[derive(Debug, Clone)]
pub struct EntityStore {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    unique_columns: Vec<usize>,
    unique_index: HashMap<String, RowId>,
}

impl EntityStore {
    /// Declare a table with a fixed ordered list of columns.
    ///
    /// # Example
    /// ```
    /// use dsl_normalize::EntityStore;
    ///
    /// let mut languages = EntityStore::declare("languages", ["name"]);
    /// languages.mark_unique(&["name"]).unwrap();
    ///
    /// let first = languages.insert(vec!["English".into()]).unwrap();
    /// let again = languages.insert(vec!["English".into()]).unwrap();
    /// assert_eq!(first, again);
    /// assert_eq!(languages.len(), 1);
    /// ```
    pub fn declare<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            unique_columns: Vec::new(),
            unique_index: HashMap::new(),
        }
    }

    /// Designate the columns forming the dedup key.
    ///
    /// Replaces any previously configured key. Rows already stored are
    /// re-indexed so that the first row carrying a key keeps owning it.
    ///
    /// # Errors
    /// Returns [`EntityError::UnknownUniqueColumn`] if a name is not declared;
    /// the table is left unchanged in that case.
    pub fn mark_unique(&mut self, columns: &[&str]) -> Result<(), EntityError> {
        let indices = columns
            .iter()
            .map(|column| {
                self.column_index(column)
                    .ok_or_else(|| EntityError::UnknownUniqueColumn {
                        table: self.name.clone(),
                        column: column.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.unique_columns = indices;
        self.unique_index.clear();
        for index in 0..self.rows.len() {
            if let Some(key) = self.unique_key(&self.rows[index]) {
                self.unique_index.entry(key).or_insert(RowId::from_index(index));
            }
        }

        Ok(())
    }

    /// Insert a row and return its identity.
    ///
    /// With a unique key configured, a row whose key was already inserted is
    /// not stored again: the existing identity is returned.
    ///
    /// # Errors
    /// Returns [`EntityError::ColumnCountMismatch`] if the number of values
    /// differs from the number of declared columns.
    pub fn insert(&mut self, values: Vec<CellValue>) -> Result<RowId, EntityError> {
        if values.len() != self.columns.len() {
            return Err(EntityError::ColumnCountMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let key = self.unique_key(&values);
        if let Some(existing) = key.as_ref().and_then(|key| self.unique_index.get(key)) {
            return Ok(*existing);
        }

        let id = RowId::from_index(self.rows.len());
        self.rows.push(values);
        if let Some(key) = key {
            self.unique_index.insert(key, id);
        }

        Ok(id)
    }

    /// Overwrite one cell in place.
    ///
    /// If the cell belongs to the unique key, the row is re-keyed. A new key
    /// that collides with another row stays owned by the earlier row.
    ///
    /// # Errors
    /// [`EntityError::RowOutOfRange`] or [`EntityError::ColumnOutOfRange`].
    pub fn set_cell(
        &mut self,
        row: RowId,
        column: usize,
        value: CellValue,
    ) -> Result<(), EntityError> {
        if row.index() >= self.rows.len() {
            return Err(EntityError::RowOutOfRange {
                table: self.name.clone(),
                row: row.get(),
                len: self.rows.len(),
            });
        }
        if column >= self.columns.len() {
            return Err(EntityError::ColumnOutOfRange {
                table: self.name.clone(),
                column,
                len: self.columns.len(),
            });
        }

        let keyed = self.unique_columns.contains(&column);
        if keyed {
            if let Some(old_key) = self.unique_key(&self.rows[row.index()]) {
                if self.unique_index.get(&old_key) == Some(&row) {
                    self.unique_index.remove(&old_key);
                }
            }
        }

        self.rows[row.index()][column] = value;

        if keyed {
            if let Some(new_key) = self.unique_key(&self.rows[row.index()]) {
                self.unique_index.entry(new_key).or_insert(row);
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Names of the columns forming the dedup key, in key order.
    pub fn unique_columns(&self) -> Vec<&str> {
        self.unique_columns
            .iter()
            .map(|&index| self.columns[index].as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of the row with the given identity.
    pub fn row(&self, id: RowId) -> Option<&[CellValue]> {
        self.rows.get(id.index()).map(Vec::as_slice)
    }

    /// All rows with their identities, in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &[CellValue])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| (RowId::from_index(index), row.as_slice()))
    }

    /// Textual view of the table for renderers.
    pub fn render(&self) -> TableView<'_> {
        TableView { store: self }
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|declared| declared == column)
    }

    fn unique_key(&self, values: &[CellValue]) -> Option<String> {
        if self.unique_columns.is_empty() {
            return None;
        }

        let parts: Vec<String> = self
            .unique_columns
            .iter()
            .map(|&index| values[index].to_string())
            .collect();
        Some(parts.join(&KEY_SEPARATOR.to_string()))
    }
}

/// Restartable textual view over an [`EntityStore`].
///
/// The view borrows the table; every call to [`TableView::rows`] starts a new
/// pass over the rows in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    store: &'a EntityStore,
}

impl<'a> TableView<'a> {
    /// Caption of the rendered table (the table name)
    pub fn caption(&self) -> &'a str {
        &self.store.name
    }

    /// Header row: the synthetic identity column followed by declared columns
    pub fn header(&self) -> Vec<String> {
        std::iter::once(ID_COLUMN.to_string())
            .chain(self.store.columns.iter().cloned())
            .collect()
    }

    /// Data rows with the identity prepended
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + 'a {
        self.store.rows().map(|(id, cells)| {
            std::iter::once(id.to_string())
                .chain(cells.iter().map(ToString::to_string))
                .collect()
        })
    }

    pub fn row_count(&self) -> usize {
        self.store.len()
    }
}

/// A table bound to a typed [`Entity`].
///
/// The declaration (name, columns, unique key) comes from the entity's
/// associated constants, so a typed insert can never disagree with it.
#[derive(Debug, Clone)]
pub struct Table<E: Entity> {
    store: EntityStore,
    _entity: PhantomData<fn(&E)>,
}

impl<E: Entity> Table<E> {
    /// Declare the table described by `E`.
    ///
    /// # Errors
    /// Returns an error if `E::UNIQUE` names a column missing from `E::COLUMNS`.
    pub fn declare() -> Result<Self, EntityError> {
        let mut store = EntityStore::declare(E::NAME, E::COLUMNS.iter().copied());
        if !E::UNIQUE.is_empty() {
            store.mark_unique(E::UNIQUE)?;
        }

        Ok(Self {
            store,
            _entity: PhantomData,
        })
    }

    /// Insert (or dedupe) an entity and return its identity
    pub fn insert(&mut self, entity: &E) -> Result<RowId, EntityError> {
        self.store.insert(entity.to_row())
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable access to the underlying table, for point corrections
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }
}

impl<E: Entity> Deref for Table<E> {
    type Target = EntityStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
