//! Executor interface: turns a compiled plan into tabular results.
//!
//! Slicer never executes plans itself. Callers plug in an implementation
//! for their engine and hand it to [`crate::slice::Slice::data`].

use crate::planner::QueryPlan;

/// Runs a [`QueryPlan`] against some engine.
///
/// The output type is whatever tabular shape the engine produces.
pub trait Executor {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn execute(&self, plan: &QueryPlan) -> Result<Self::Output, Self::Error>;
}

impl<E: Executor + ?Sized> Executor for &E {
    type Output = E::Output;
    type Error = E::Error;

    fn execute(&self, plan: &QueryPlan) -> Result<Self::Output, Self::Error> {
        (**self).execute(plan)
    }
}
