//! Generation plan subdomain.
//!
//! A [`GenerationPlan`](entities::GenerationPlan) is the planner's structured
//! output: a theme, global [`settings`] and an ordered list of
//! [`Unit`](entities::Unit)s. Each unit is generated independently by the
//! pipeline, so nothing in this module encodes ordering between units other
//! than their plan index.

pub mod chart;
pub mod entities;
pub mod settings;
