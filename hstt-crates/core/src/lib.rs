//! # hstt
//! A solver engine for high-school timetabling.
//!
//! An [`Instance`] describes the times, resources, events and constraints of a school. A
//! [`Solution`] of it consists of *meets*, blocks of consecutive times assigned into other
//! meets and ultimately into the cycle meets which make up the week, and *tasks*, the resource
//! requirements of meets, assigned to the cycle tasks of resources. Every constraint point of
//! application is watched by a monitor which keeps its cost up to date as the solution changes.
//!
//! The solvers work by trial and rollback: a repair is tried inside a transaction, its effect
//! on the monitors is read from a trace, and it is kept or undone. [`general_solve`] runs the
//! whole pipeline: it builds the layer tree, assigns times with layered matching, Kempe moves
//! and ejection chains, and then assigns resources.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use hstt_core::instance::*;
//! # use hstt_core::Solution;
//! # use hstt_core::solvers::general_solve;
//! # use hstt_core::solvers::GeneralSolveOptions;
//! let mut builder = InstanceBuilder::new("school");
//! for i in 0..4 {
//!     let _ = builder.add_time(format!("t{i}"));
//! }
//! let teacher = builder.add_resource_type("Teacher");
//! let smith = builder.add_resource("Smith", teacher);
//! let maths = builder.add_event("Maths", 2, None);
//! let _ = builder.add_event_resource(maths, teacher, None, Some(smith));
//! let _ = builder.add_constraint(Constraint::new(
//!     "assign times",
//!     true,
//!     1,
//!     ConstraintKind::AssignTime { events: vec![maths] },
//! ));
//!
//! let mut solution = Solution::new(Arc::new(builder.build().unwrap()));
//! general_solve(&mut solution, &GeneralSolveOptions::default());
//! assert!(solution.cost().is_zero());
//! ```
pub mod basic_types;
pub mod containers;
pub mod ejector;
#[doc(hidden)]
pub mod hstt_asserts;
pub mod instance;
pub mod monitors;
pub mod solution;
pub mod solvers;
pub mod statistics;

#[cfg(test)]
pub(crate) mod test_instances;

pub use crate::basic_types::Cost;
pub use crate::instance::Instance;
pub use crate::solution::Solution;
pub use crate::solvers::general_solve;
pub use crate::solvers::parallel_solve;
