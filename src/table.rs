//! Generic table view-state engine.
//!
//! The caller owns the record collection and passes it in on every
//! derivation; this module only holds the declarative view state (sort
//! order, search text, page, selection) and derives a filtered, sorted,
//! paginated page from whatever collection it is handed. All handlers are
//! total: bad input is ignored, never an error.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "∅"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Three-way comparison used for sorting. Values of the same kind
    /// compare naturally (ints and floats compare numerically across the
    /// two kinds); every other pairing is treated as equal, so a stable
    /// sort leaves such rows in their relative order.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// A caller defined record: a mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: HashMap::new() }
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Stringified value of the identifier field. Records without the
    /// field map to the empty string.
    pub fn identifier(&self, id_field: &str) -> String {
        self.fields.get(id_field).map(|v| v.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// One derived page of the table.
#[derive(Debug, Clone)]
pub struct PageView {
    /// Records on the current page, post filter and sort.
    pub rows: Vec<Record>,
    /// Number of records after filtering (all pages).
    pub total: usize,
    /// Padding rows callers use to keep a fixed height table from
    /// collapsing on a short last page. Always 0 on page 0.
    pub empty_rows: usize,
}

/// Declarative table view state plus its mutation handlers.
///
/// Nothing here survives independently of the caller: the record
/// collection is passed into [`TableState::page`] and
/// [`TableState::visible`] on every call and is never stored.
#[derive(Debug, Clone)]
pub struct TableState {
    pub order: Order,
    pub order_by: String,
    pub search: String,
    pub page: usize,
    pub rows_per_page: usize,
    /// Selected identifiers. Membership is what matters; kept as a Vec so
    /// positional toggling mirrors what range-select callers expect.
    pub selected: Vec<String>,
    search_fields: Vec<String>,
    id_field: String,
}

impl TableState {
    pub fn new(
        order_by: impl Into<String>,
        rows_per_page: usize,
        id_field: impl Into<String>,
        search_fields: Vec<String>,
    ) -> Self {
        Self {
            order: Order::Ascending,
            order_by: order_by.into(),
            search: String::new(),
            page: 0,
            rows_per_page: rows_per_page.max(1),
            selected: Vec::new(),
            search_fields,
            id_field: id_field.into(),
        }
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Request a sort on `field`: a repeated request on the current
    /// ascending field flips to descending, anything else starts
    /// ascending on `field`.
    pub fn request_sort(&mut self, field: &str) {
        let is_asc = self.order_by == field && self.order == Order::Ascending;
        self.order = if is_asc { Order::Descending } else { Order::Ascending };
        self.order_by = field.to_string();
        trace!("Sort request: {} {:?}", self.order_by, self.order);
    }

    /// Update the search text. Always jumps back to page 0 so a shrinking
    /// result set cannot leave the view on an out-of-range page. `None`
    /// (an event without a value) is treated as the empty string.
    pub fn set_search(&mut self, value: Option<&str>) {
        self.search = value.unwrap_or("").to_string();
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Change the page size from a raw input string. Applied only when
    /// the string parses as a positive integer; otherwise the previous
    /// value is retained and the page is left alone.
    pub fn set_rows_per_page(&mut self, raw: &str) {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => {
                self.rows_per_page = n;
                self.page = 0;
            }
            _ => trace!("Ignoring rows-per-page input {raw:?}"),
        }
    }

    /// Toggle selection of one identifier.
    pub fn toggle_row(&mut self, id: &str) {
        match self.selected.iter().position(|s| s == id) {
            Some(pos) => {
                self.selected.remove(pos);
            }
            None => self.selected.push(id.to_string()),
        }
    }

    /// Select-all over the full filtered (not just the current page) set.
    /// Unchecked always clears. Checked clears too when a partial
    /// selection exists; only from an empty selection does it populate.
    pub fn select_all(&mut self, checked: bool, data: &[Record]) {
        if !checked || !self.selected.is_empty() {
            self.selected.clear();
            return;
        }
        self.selected = self
            .visible(data)
            .iter()
            .map(|r| r.identifier(&self.id_field))
            .collect();
        debug!("Selected all {} filtered rows", self.selected.len());
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// The full filtered and sorted sequence, unpaginated.
    pub fn visible(&self, data: &[Record]) -> Vec<Record> {
        let filtered = self.filter(data);
        self.sort(filtered)
    }

    /// Derive the current page.
    pub fn page_view(&self, data: &[Record]) -> PageView {
        let rows = self.visible(data);
        let total = rows.len();

        let begin = self.page * self.rows_per_page;
        let end = std::cmp::min(begin + self.rows_per_page, total);
        let rows = if begin < total { rows[begin..end].to_vec() } else { Vec::new() };

        // No padding on page 0, whatever the row count.
        let empty_rows = if self.page > 0 {
            ((self.page + 1) * self.rows_per_page).saturating_sub(total)
        } else {
            0
        };

        debug!(
            "Page view: page {} rows {} total {} empty {}",
            self.page,
            rows.len(),
            total,
            empty_rows
        );
        PageView { rows, total, empty_rows }
    }

    fn filter<'a>(&self, data: &'a [Record]) -> Vec<&'a Record> {
        // An empty field list disables filtering regardless of the search
        // text; callers opt into search by naming fields.
        if self.search.is_empty() || self.search_fields.is_empty() {
            return data.iter().collect();
        }
        let needle = self.search.to_lowercase();
        data.iter()
            .filter(|record| {
                self.search_fields.iter().any(|field| {
                    record
                        .get(field)
                        .map(|v| v.to_string().to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            })
            .collect()
    }

    fn sort(&self, filtered: Vec<&Record>) -> Vec<Record> {
        // Index tagged decorate-sort-undecorate. sort_by is stable, so
        // ties keep their relative order from the filtered sequence; the
        // index tag makes that explicit for equal keys.
        let mut indexed: Vec<(usize, &Record)> = filtered.into_iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            let av = a.get(&self.order_by).unwrap_or(&Value::Null);
            let bv = b.get(&self.order_by).unwrap_or(&Value::Null);
            let ord = match self.order {
                Order::Ascending => av.compare(bv),
                Order::Descending => bv.compare(av),
            };
            ord.then(ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, r)| r.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.set(*k, v.clone());
        }
        r
    }

    fn people() -> Vec<Record> {
        vec![
            record(&[
                ("name", Value::Str("John Doe".into())),
                ("age", Value::Int(30)),
                ("status", Value::Str("active".into())),
            ]),
            record(&[
                ("name", Value::Str("Jane Smith".into())),
                ("age", Value::Int(25)),
                ("status", Value::Str("inactive".into())),
            ]),
            record(&[
                ("name", Value::Str("Bob Johnson".into())),
                ("age", Value::Int(35)),
                ("status", Value::Str("active".into())),
            ]),
            record(&[
                ("name", Value::Str("Alice Brown".into())),
                ("age", Value::Int(28)),
                ("status", Value::Str("active".into())),
            ]),
        ]
    }

    fn names(rows: &[Record]) -> Vec<String> {
        rows.iter().map(|r| r.identifier("name")).collect()
    }

    #[test]
    fn paginates_sorted_rows() {
        let data = vec![
            record(&[("name", Value::Str("Bob".into()))]),
            record(&[("name", Value::Str("Ann".into()))]),
            record(&[("name", Value::Str("Cid".into()))]),
        ];
        let mut state = TableState::new("name", 2, "name", vec![]);

        let page0 = state.page_view(&data);
        assert_eq!(names(&page0.rows), vec!["Ann", "Bob"]);
        assert_eq!(page0.total, 3);
        assert_eq!(page0.empty_rows, 0);

        state.set_page(1);
        let page1 = state.page_view(&data);
        assert_eq!(names(&page1.rows), vec!["Cid"]);
        assert_eq!(page1.empty_rows, 1);
    }

    #[test]
    fn page_beyond_data_is_empty() {
        let data = people();
        let mut state = TableState::new("name", 2, "name", vec![]);
        state.set_page(10);
        let page = state.page_view(&data);
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 4);
        assert_eq!(page.empty_rows, 22 - 4);
    }

    #[test]
    fn sort_request_toggles_on_same_field() {
        let mut state = TableState::new("name", 5, "name", vec![]);
        assert_eq!(state.order, Order::Ascending);

        state.request_sort("name");
        assert_eq!(state.order, Order::Descending);

        state.request_sort("name");
        assert_eq!(state.order, Order::Ascending);

        // A different field always starts ascending.
        state.request_sort("name");
        state.request_sort("age");
        assert_eq!(state.order_by, "age");
        assert_eq!(state.order, Order::Ascending);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let data = vec![
            record(&[("name", Value::Str("b".into())), ("grp", Value::Int(1))]),
            record(&[("name", Value::Str("a1".into())), ("grp", Value::Int(0))]),
            record(&[("name", Value::Str("a2".into())), ("grp", Value::Int(0))]),
            record(&[("name", Value::Str("a3".into())), ("grp", Value::Int(0))]),
        ];
        let mut state = TableState::new("grp", 10, "name", vec![]);
        let once = names(&state.visible(&data));
        assert_eq!(once, vec!["a1", "a2", "a3", "b"]);

        // Sorting twice with the same order yields the same ordering.
        let twice = names(&state.visible(&data));
        assert_eq!(once, twice);

        state.request_sort("grp");
        let desc = names(&state.visible(&data));
        assert_eq!(desc, vec!["b", "a1", "a2", "a3"]);
    }

    #[test]
    fn descending_numeric_sort() {
        let data = people();
        let mut state = TableState::new("age", 10, "name", vec![]);
        state.request_sort("age"); // ascending -> descending
        let rows = state.visible(&data);
        let ages: Vec<i64> = rows
            .iter()
            .map(|r| match r.get("age") {
                Some(Value::Int(i)) => *i,
                _ => panic!("missing age"),
            })
            .collect();
        assert_eq!(ages, vec![35, 30, 28, 25]);
    }

    #[test]
    fn mixed_kind_values_sort_without_panicking() {
        let data = vec![
            record(&[("name", Value::Str("x".into()))]),
            record(&[("name", Value::Null)]),
            record(&[("name", Value::Int(3))]),
        ];
        let state = TableState::new("name", 10, "name", vec![]);
        assert_eq!(state.visible(&data).len(), 3);
    }

    #[test]
    fn search_filters_case_insensitively_and_resets_page() {
        let data = people();
        let mut state =
            TableState::new("name", 2, "name", vec!["name".into(), "status".into()]);
        state.set_page(1);

        state.set_search(Some("JOHN"));
        assert_eq!(state.page, 0);
        let page = state.page_view(&data);
        // John Doe and Bob Johnson
        assert_eq!(page.total, 2);

        state.set_search(Some("active"));
        assert_eq!(state.page_view(&data).total, 4); // "inactive" contains "active"

        state.set_search(Some(""));
        assert_eq!(state.page_view(&data).total, 4);

        state.set_search(None);
        assert_eq!(state.search, "");
    }

    #[test]
    fn empty_search_fields_disable_filtering() {
        let data = people();
        let mut state = TableState::new("name", 10, "name", vec![]);
        state.set_search(Some("nonexistent"));
        assert_eq!(state.page_view(&data).total, 4);
    }

    #[test]
    fn missing_search_field_never_matches() {
        let data = people();
        let mut state = TableState::new("name", 10, "name", vec!["nickname".into()]);
        state.set_search(Some("john"));
        assert_eq!(state.page_view(&data).total, 0);
    }

    #[test]
    fn toggle_row_from_any_position() {
        let mut state = TableState::new("name", 5, "name", vec![]);
        for id in ["a", "b", "c", "d"] {
            state.toggle_row(id);
        }
        assert_eq!(state.selected, vec!["a", "b", "c", "d"]);

        state.toggle_row("a"); // first
        state.toggle_row("d"); // last
        state.toggle_row("c"); // middle
        assert_eq!(state.selected, vec!["b"]);

        state.toggle_row("b"); // sole
        assert!(state.selected.is_empty());

        state.toggle_row("b");
        assert!(state.is_selected("b"));
    }

    #[test]
    fn select_all_is_a_toggle_clear() {
        let data = people();
        let mut state = TableState::new("name", 2, "name", vec![]);

        // Populates across all pages, not just the visible one.
        state.select_all(true, &data);
        assert_eq!(state.selected.len(), 4);

        // Checked again with a non-empty selection clears.
        state.select_all(true, &data);
        assert!(state.selected.is_empty());

        // A partial selection also clears instead of unioning.
        state.toggle_row("John Doe");
        state.select_all(true, &data);
        assert!(state.selected.is_empty());

        state.toggle_row("John Doe");
        state.select_all(false, &data);
        assert!(state.selected.is_empty());
    }

    #[test]
    fn select_all_respects_the_active_filter() {
        let data = people();
        let mut state = TableState::new("name", 10, "name", vec!["status".into()]);
        state.set_search(Some("inactive"));
        state.select_all(true, &data);
        assert_eq!(state.selected, vec!["Jane Smith"]);
    }

    #[test]
    fn rows_per_page_applies_only_on_valid_input() {
        let mut state = TableState::new("name", 5, "name", vec![]);
        state.set_page(3);

        state.set_rows_per_page("not a number");
        assert_eq!(state.rows_per_page, 5);
        assert_eq!(state.page, 3);

        state.set_rows_per_page("0");
        assert_eq!(state.rows_per_page, 5);

        state.set_rows_per_page("25");
        assert_eq!(state.rows_per_page, 25);
        assert_eq!(state.page, 0);
    }

    #[test]
    fn empty_rows_on_the_last_page() {
        // N=5, R=2: pages 0,1 full, page 2 has 1 row and 1 empty row.
        let data: Vec<Record> = (0..5)
            .map(|i| record(&[("name", Value::Str(format!("r{i}")))]))
            .collect();
        let mut state = TableState::new("name", 2, "name", vec![]);

        state.set_page(2);
        let page = state.page_view(&data);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.empty_rows, 1);

        // N divides evenly: no padding anywhere.
        let data: Vec<Record> = (0..4)
            .map(|i| record(&[("name", Value::Str(format!("r{i}")))]))
            .collect();
        state.set_page(1);
        assert_eq!(state.page_view(&data).empty_rows, 0);
    }
}
