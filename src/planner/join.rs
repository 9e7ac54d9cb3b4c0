//! Join resolution against a slice's declared joins.

use std::collections::BTreeSet;

use super::request::SliceRequest;
use super::{PlanError, PlanResult};
use crate::model::{Filter, Join, RecordId, TableRef};

pub struct JoinResolver<'a> {
    main_table: &'a TableRef,
    joins: &'a [Join],
}

impl<'a> JoinResolver<'a> {
    pub fn new(main_table: &'a TableRef, joins: &'a [Join]) -> Self {
        Self { main_table, joins }
    }

    /// Tables read by any requested element or filter, minus the main table.
    pub fn required_tables(&self, request: &SliceRequest, filters: &[&Filter]) -> BTreeSet<TableRef> {
        request
            .metrics
            .iter()
            .flat_map(|m| m.element.tables.iter())
            .chain(request.dimensions.iter().flat_map(|d| d.element.tables.iter()))
            .chain(request.group_by.iter().flat_map(|d| d.element.tables.iter()))
            .chain(filters.iter().flat_map(|f| f.element().tables.iter()))
            .filter(|t| t.id != self.main_table.id)
            .cloned()
            .collect()
    }

    /// Keep the declared joins whose table is required, in declaration order.
    ///
    /// Fails on the first required table with no declared join.
    pub fn resolve(&self, required: &BTreeSet<TableRef>) -> PlanResult<Vec<Join>> {
        let declared: BTreeSet<RecordId> = self.joins.iter().map(|j| j.table.id).collect();
        if let Some(missing) = required.iter().find(|t| !declared.contains(&t.id)) {
            return Err(PlanError::MissingJoin {
                table: missing.name.clone(),
            });
        }

        let required: BTreeSet<RecordId> = required.iter().map(|t| t.id).collect();
        Ok(self
            .joins
            .iter()
            .filter(|j| required.contains(&j.table.id))
            .cloned()
            .collect())
    }
}
