//! Segmentation of cleaned rows into independent analysis groups.
//!
//! Each group is charted on its own. Cut columns that are missing or take a
//! single value carry no information and are dropped first; the surviving
//! columns partition the rows by their combined display values.

use std::collections::{BTreeMap, BTreeSet};

use crate::table::{Row, Table};
use crate::timeaxis::TimeKey;

/// Label used for the single group when no cut column applies.
pub const ALL_DATA: &str = "All Data";

/// A cleaned source row: its unified time key and numeric value.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub row: &'a Row,
    pub key: TimeKey,
    pub value: f64,
}

/// A maximal set of observations sharing the same cut-column values.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    /// `(column, value)` pairs identifying the group; empty when ungrouped.
    pub key: Vec<(String, String)>,
    pub observations: Vec<Observation<'a>>,
}

impl Group<'_> {
    /// Human-readable group name: `All Data` or `col=val, col=val`.
    pub fn name(&self) -> String {
        group_name(&self.key)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if the group has no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Outcome of segmentation.
#[derive(Debug, Clone, Default)]
pub struct Segmentation<'a> {
    /// Cut columns that survived (present and varying).
    pub cut_columns: Vec<String>,
    /// Groups with at least two observations, ordered by key.
    pub groups: Vec<Group<'a>>,
    /// Groups discarded for having fewer than two observations.
    pub undersized: Vec<Group<'a>>,
    /// Observations with an empty value in a surviving cut column.
    pub unassigned: usize,
}

/// Formats a group key for display.
pub fn group_name(key: &[(String, String)]) -> String {
    if key.is_empty() {
        return ALL_DATA.to_string();
    }
    key.iter()
        .map(|(col, val)| format!("{col}={val}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Partitions `observations` by the surviving `cut_columns`.
///
/// # Examples
///
/// ```
/// use u_spc_trace::segment::{segment, Observation};
/// use u_spc_trace::table::Table;
/// use u_spc_trace::timeaxis::TimeKey;
///
/// let table = Table::from_rows(
///     vec!["site".into(), "plant".into()],
///     vec![
///         vec!["A".into(), "P1".into()],
///         vec!["A".into(), "P1".into()],
///         vec!["B".into(), "P1".into()],
///         vec!["B".into(), "P1".into()],
///     ],
/// ).unwrap();
/// let obs: Vec<Observation> = table
///     .rows()
///     .iter()
///     .enumerate()
///     .map(|(i, row)| Observation { row, key: TimeKey::Ordinal(i as f64), value: 1.0 })
///     .collect();
///
/// let seg = segment(&table, obs, &["site".to_string(), "plant".to_string()]);
/// assert_eq!(seg.cut_columns, vec!["site".to_string()]); // plant is constant
/// assert_eq!(seg.groups.len(), 2);
/// assert_eq!(seg.groups[0].name(), "site=A");
/// ```
pub fn segment<'a>(
    table: &Table,
    observations: Vec<Observation<'a>>,
    cut_columns: &[String],
) -> Segmentation<'a> {
    let surviving: Vec<(String, usize)> = cut_columns
        .iter()
        .filter_map(|c| table.column_index(c).map(|idx| (c.clone(), idx)))
        .filter(|(_, idx)| {
            let distinct: BTreeSet<String> = observations
                .iter()
                .map(|o| o.row.get(*idx))
                .filter(|cell| !cell.is_null())
                .map(|cell| cell.display())
                .collect();
            distinct.len() > 1
        })
        .collect();

    let mut seg = Segmentation {
        cut_columns: surviving.iter().map(|(c, _)| c.clone()).collect(),
        ..Segmentation::default()
    };

    if surviving.is_empty() {
        let group = Group {
            key: Vec::new(),
            observations,
        };
        if group.len() >= 2 {
            seg.groups.push(group);
        } else {
            seg.undersized.push(group);
        }
        return seg;
    }

    let mut buckets: BTreeMap<Vec<String>, Vec<Observation<'a>>> = BTreeMap::new();
    for obs in observations {
        let key: Option<Vec<String>> = surviving
            .iter()
            .map(|(_, idx)| {
                let cell = obs.row.get(*idx);
                (!cell.is_null()).then(|| cell.display())
            })
            .collect();
        match key {
            Some(key) => buckets.entry(key).or_default().push(obs),
            None => seg.unassigned += 1,
        }
    }

    for (values, observations) in buckets {
        let key = seg
            .cut_columns
            .iter()
            .cloned()
            .zip(values)
            .collect::<Vec<_>>();
        let group = Group { key, observations };
        if group.len() >= 2 {
            seg.groups.push(group);
        } else {
            seg.undersized.push(group);
        }
    }
    seg
}
