//! Ordered board state and its drag-result reducer.
//!
//! A board is a set of lanes, each an ordered list of item ids, plus the
//! left-to-right lane order. The only mutations are the two drag-result
//! branches: reordering one lane, or relocating one item. A completed
//! apply keeps every item id in exactly one lane; a rejected apply leaves
//! the board untouched.

use std::collections::HashMap;

use tracing::{error, trace};

use crate::domain::TBError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    pub title: String,
    /// Item ids top to bottom. Position is meaningful.
    pub item_ids: Vec<String>,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), item_ids: Vec::new() }
    }
}

/// Source or destination of an item drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragLocation {
    pub column_id: String,
    pub index: usize,
}

/// One completed drag gesture. A `None` destination is a drop outside any
/// valid target and applies as a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum DragResult {
    ColumnReorder {
        column_id: String,
        source: usize,
        destination: Option<usize>,
    },
    ItemMove {
        item_id: String,
        source: DragLocation,
        destination: Option<DragLocation>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub columns: HashMap<String, Column>,
    pub columns_order: Vec<String>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_column(&mut self, column: Column) {
        self.columns_order.push(column.id.clone());
        self.columns.insert(column.id.clone(), column);
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.get(id)
    }

    /// Lanes in display order.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        self.columns_order.iter().filter_map(|id| self.columns.get(id)).collect()
    }

    pub fn item_count(&self) -> usize {
        self.columns.values().map(|c| c.item_ids.len()).sum()
    }

    /// Apply one drag result. Stale references (a vanished column, an
    /// out-of-range index, an id that no longer sits at the source
    /// position) are rejected with [`TBError::StaleDrag`] before anything
    /// is mutated, so the board is never observable half-applied.
    pub fn apply(&mut self, drag: &DragResult) -> Result<(), TBError> {
        match drag {
            DragResult::ColumnReorder { column_id, source, destination } => {
                self.reorder_column(column_id, *source, *destination)
            }
            DragResult::ItemMove { item_id, source, destination } => {
                self.move_item(item_id, source, destination.as_ref())
            }
        }
    }

    fn reorder_column(
        &mut self,
        column_id: &str,
        source: usize,
        destination: Option<usize>,
    ) -> Result<(), TBError> {
        let Some(destination) = destination else {
            trace!("Column drag of {column_id} dropped outside the board");
            return Ok(());
        };
        match self.columns_order.get(source) {
            Some(id) if id == column_id => {}
            _ => return Err(self.stale(format!("column {column_id} is not at position {source}"))),
        }
        if source == destination {
            return Ok(());
        }

        let id = self.columns_order.remove(source);
        let at = std::cmp::min(destination, self.columns_order.len());
        self.columns_order.insert(at, id);
        trace!("Moved column {column_id} from {source} to {at}");
        Ok(())
    }

    fn move_item(
        &mut self,
        item_id: &str,
        source: &DragLocation,
        destination: Option<&DragLocation>,
    ) -> Result<(), TBError> {
        let Some(destination) = destination else {
            trace!("Item drag of {item_id} dropped outside the board");
            return Ok(());
        };

        // Validate everything up front; mutation below cannot fail.
        match self.columns.get(&source.column_id) {
            Some(col) if col.item_ids.get(source.index).map(String::as_str) == Some(item_id) => {}
            Some(_) => {
                return Err(self.stale(format!(
                    "item {item_id} is not at {}:{}",
                    source.column_id, source.index
                )));
            }
            None => return Err(self.stale(format!("unknown source column {}", source.column_id))),
        }
        if !self.columns.contains_key(&destination.column_id) {
            return Err(
                self.stale(format!("unknown destination column {}", destination.column_id))
            );
        }
        if source == destination {
            return Ok(());
        }

        if source.column_id == destination.column_id {
            let col = self.columns.get_mut(&source.column_id).unwrap();
            let id = col.item_ids.remove(source.index);
            let at = std::cmp::min(destination.index, col.item_ids.len());
            col.item_ids.insert(at, id);
            trace!("Moved item {item_id} within {} to {at}", source.column_id);
        } else {
            let id = self
                .columns
                .get_mut(&source.column_id)
                .unwrap()
                .item_ids
                .remove(source.index);
            let dst = self.columns.get_mut(&destination.column_id).unwrap();
            let at = std::cmp::min(destination.index, dst.item_ids.len());
            dst.item_ids.insert(at, id);
            trace!(
                "Moved item {item_id} from {}:{} to {}:{at}",
                source.column_id, source.index, destination.column_id
            );
        }
        Ok(())
    }

    fn stale(&self, reason: String) -> TBError {
        error!("Rejected stale drag: {reason}");
        TBError::StaleDrag(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(id: &str, items: &[&str]) -> Column {
        Column {
            id: id.to_string(),
            title: id.to_uppercase(),
            item_ids: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn board() -> BoardState {
        let mut b = BoardState::new();
        b.push_column(lane("a", &["1", "2", "3"]));
        b.push_column(lane("b", &["4", "5"]));
        b
    }

    fn item_ids(board: &BoardState, column: &str) -> Vec<String> {
        board.column(column).unwrap().item_ids.clone()
    }

    fn item_move(item: &str, src: (&str, usize), dst: Option<(&str, usize)>) -> DragResult {
        DragResult::ItemMove {
            item_id: item.to_string(),
            source: DragLocation { column_id: src.0.to_string(), index: src.1 },
            destination: dst.map(|(c, i)| DragLocation { column_id: c.to_string(), index: i }),
        }
    }

    #[test]
    fn drop_outside_board_is_a_noop() {
        let mut b = board();
        let before = b.clone();
        b.apply(&item_move("2", ("a", 1), None)).unwrap();
        assert_eq!(b, before);

        b.apply(&DragResult::ColumnReorder {
            column_id: "a".into(),
            source: 0,
            destination: None,
        })
        .unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn same_position_drop_is_a_noop() {
        let mut b = board();
        let before = b.clone();
        b.apply(&item_move("2", ("a", 1), Some(("a", 1)))).unwrap();
        assert_eq!(b, before);
    }

    #[test]
    fn reorders_within_a_column() {
        let mut b = board();
        b.apply(&item_move("1", ("a", 0), Some(("a", 2)))).unwrap();
        assert_eq!(item_ids(&b, "a"), vec!["2", "3", "1"]);
        assert_eq!(item_ids(&b, "b"), vec!["4", "5"]);
    }

    #[test]
    fn moves_across_columns() {
        let mut b = board();
        b.apply(&item_move("2", ("a", 1), Some(("b", 0)))).unwrap();
        assert_eq!(item_ids(&b, "a"), vec!["1", "3"]);
        assert_eq!(item_ids(&b, "b"), vec!["2", "4", "5"]);
        assert_eq!(b.item_count(), 5);
    }

    #[test]
    fn conserves_items_over_a_move_sequence() {
        let mut b = board();
        let moves = [
            item_move("2", ("a", 1), Some(("b", 0))),
            item_move("4", ("b", 1), Some(("a", 0))),
            item_move("3", ("a", 2), Some(("a", 0))),
            item_move("5", ("b", 1), Some(("a", 3))),
        ];
        for m in &moves {
            b.apply(m).unwrap();
        }
        let mut all: Vec<String> =
            b.columns.values().flat_map(|c| c.item_ids.clone()).collect();
        all.sort();
        assert_eq!(all, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(b.item_count(), 5);
    }

    #[test]
    fn reorders_columns_without_touching_items() {
        let mut b = board();
        b.apply(&DragResult::ColumnReorder {
            column_id: "a".into(),
            source: 0,
            destination: Some(1),
        })
        .unwrap();
        assert_eq!(b.columns_order, vec!["b", "a"]);
        assert_eq!(item_ids(&b, "a"), vec!["1", "2", "3"]);
        assert_eq!(item_ids(&b, "b"), vec!["4", "5"]);
    }

    #[test]
    fn stale_source_column_is_rejected_unchanged() {
        let mut b = board();
        let before = b.clone();
        let err = b.apply(&item_move("2", ("gone", 1), Some(("b", 0))));
        assert!(matches!(err, Err(TBError::StaleDrag(_))));
        assert_eq!(b, before);
    }

    #[test]
    fn stale_destination_column_is_rejected_unchanged() {
        let mut b = board();
        let before = b.clone();
        let err = b.apply(&item_move("2", ("a", 1), Some(("gone", 0))));
        assert!(matches!(err, Err(TBError::StaleDrag(_))));
        assert_eq!(b, before);
    }

    #[test]
    fn mismatched_item_at_source_is_rejected() {
        let mut b = board();
        let before = b.clone();
        // "5" is not at a:1, and index 9 is out of range.
        assert!(b.apply(&item_move("5", ("a", 1), Some(("b", 0)))).is_err());
        assert!(b.apply(&item_move("1", ("a", 9), Some(("b", 0)))).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn stale_column_reorder_is_rejected() {
        let mut b = board();
        let before = b.clone();
        let err = b.apply(&DragResult::ColumnReorder {
            column_id: "b".into(),
            source: 0, // "a" sits at 0
            destination: Some(1),
        });
        assert!(matches!(err, Err(TBError::StaleDrag(_))));
        assert_eq!(b, before);
    }

    #[test]
    fn destination_index_is_clamped() {
        let mut b = board();
        b.apply(&item_move("4", ("b", 0), Some(("a", 99)))).unwrap();
        assert_eq!(item_ids(&b, "a"), vec!["1", "2", "3", "4"]);
    }
}
