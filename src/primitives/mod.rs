//! Primitives - Dynamic operations on a mounted tree.
//!
//! This module extends [`Root`](crate::pipeline::Root) with the operations
//! that change a tree after it is mounted:
//! - [`control_flow`] - List rows, keyed row reconciliation, route activation
//! - [`bind`] - Binding ops to spark-signals
//!
//! # Reactivity
//!
//! Every operation here only stages ops. The host surface changes when the
//! root flushes:
//!
//! ```ignore
//! root.push_row(list, values)?;   // row spawned, ops staged
//! root.show_route(route)?;        // route op staged
//! root.flush();                   // host mutated, mount callbacks run
//! ```

pub mod bind;
pub mod control_flow;
