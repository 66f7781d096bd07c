//! Dependency ordering for suites and test cases.
//!
//! Items are named and declare the names they depend on. [`sort`] returns the
//! same items ordered so that every item comes after all of its dependencies.
//! Items without dependencies keep their input order at the front; the rest
//! are placed in input order, each one after its (recursively placed)
//! dependencies.

use std::collections::HashMap;

use tracing::trace;

use crate::errors::{RestSuiteError, Result};

/// Anything the sorter can order.
pub trait Dependent {
    fn name(&self) -> &str;
    fn depends_on(&self) -> &[String];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Placed,
}

/// Orders `items` by their declared dependencies.
///
/// `qualifier` prefixes names in error messages (`Suite::case`) so that case
/// names, which are only unique within one suite, stay unambiguous.
pub fn sort<T: Dependent>(items: Vec<T>, qualifier: Option<&str>) -> Result<Vec<T>> {
    DependencySorter::new(items, qualifier)?.sort()
}

struct DependencySorter<'q, T> {
    qualifier: Option<&'q str>,
    names: Vec<String>,
    pending: Vec<Option<T>>,
    index: HashMap<String, usize>,
    depends: HashMap<String, Vec<String>>,
    marks: HashMap<String, Mark>,
    sorted: Vec<T>,
}

impl<'q, T: Dependent> DependencySorter<'q, T> {
    fn new(items: Vec<T>, qualifier: Option<&'q str>) -> Result<Self> {
        if items.is_empty() {
            return Err(RestSuiteError::config(
                "Failed to sort, cannot sort empty set of items",
            ));
        }

        let mut names = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());
        let mut depends = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            names.push(item.name().to_string());
            index.entry(item.name().to_string()).or_insert(i);
            depends
                .entry(item.name().to_string())
                .or_insert_with(|| item.depends_on().to_vec());
        }

        Ok(Self {
            qualifier,
            names,
            pending: items.into_iter().map(Some).collect(),
            index,
            depends,
            marks: HashMap::new(),
            sorted: Vec::new(),
        })
    }

    fn id_name(&self, id: &str) -> String {
        match self.qualifier {
            Some(q) => format!("{q}::{id}"),
            None => id.to_string(),
        }
    }

    /// Removes the item registered under `id` from the pending pool.
    fn pull(&mut self, id: &str) -> Option<T> {
        let i = *self.index.get(id)?;
        self.pending[i].take()
    }

    fn sort(mut self) -> Result<Vec<T>> {
        // seed with every item that has no dependencies
        for i in 0..self.names.len() {
            let id = self.names[i].clone();
            if !self.depends_on(&id).is_empty() {
                continue;
            }
            let Some(item) = self.pull(&id) else {
                return Err(RestSuiteError::config(format!(
                    "Failed to sort item \"{}\", item already sorted",
                    self.id_name(&id)
                )));
            };
            trace!(item = %id, "placed item without dependencies");
            self.marks.insert(id, Mark::Placed);
            self.sorted.push(item);
        }

        if self.sorted.is_empty() {
            return Err(RestSuiteError::config(
                "Failed to sort, must have at least one item without dependencies",
            ));
        }

        for i in 0..self.names.len() {
            if self.pending[i].is_none() {
                continue;
            }
            let id = self.names[i].clone();
            let mut path = Vec::new();
            self.place(&id, &mut path)?;
            // a duplicate name leaves its second item behind in the pool
            if self.pending[i].is_some() {
                return Err(RestSuiteError::config(format!(
                    "Failed to sort item \"{}\", item already sorted",
                    self.id_name(&id)
                )));
            }
        }

        Ok(self.sorted)
    }

    fn depends_on(&self, id: &str) -> &[String] {
        self.depends.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    fn place(&mut self, id: &str, path: &mut Vec<String>) -> Result<()> {
        match self.marks.get(id) {
            Some(Mark::Placed) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|p| p == id).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&id.to_string()))
                    .map(|p| format!("\"{}\"", self.id_name(p)))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(RestSuiteError::config(format!(
                    "Failed to sort, cyclic dependencies detected: {cycle}"
                )));
            }
            None => {}
        }

        self.marks.insert(id.to_string(), Mark::Visiting);
        path.push(id.to_string());

        let depends = self.depends_on(id).to_vec();
        for depend in &depends {
            let Some(their_depends) = self.depends.get(depend) else {
                return Err(RestSuiteError::config(format!(
                    "Failed to sort, dependencies do not exist for \"{}\"",
                    self.id_name(depend)
                )));
            };

            if their_depends.iter().any(|d| d == id) {
                return Err(RestSuiteError::config(format!(
                    "Failed to sort, \"{}\" and \"{}\" cannot depend on each other (cyclic dependencies)",
                    self.id_name(depend),
                    self.id_name(id)
                )));
            }

            self.place(depend, path)?;
        }

        path.pop();
        self.marks.insert(id.to_string(), Mark::Placed);
        if let Some(item) = self.pull(id) {
            trace!(item = %id, after = ?depends, "placed item");
            self.sorted.push(item);
        }
        Ok(())
    }
}
