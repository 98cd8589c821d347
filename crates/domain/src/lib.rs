//! # taskqueue-domain
//!
//! Pure domain model for the task automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Templates** (parameter schema + action definitions with `${…}` placeholders)
//! - Define **Tasks** (a template resolved against a device and concrete parameters)
//! - Define **Actions** (Set, Evaluate, Delay, Start, Script) and their pure decision logic
//! - Define **Queue items**, the **queue manager**, and the persisted queue/collection formats
//! - Define the value types exchanged with devices (properties, capability masks)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;
pub mod value;

pub mod action;
pub mod capability;
pub mod collection;
pub mod device;
pub mod property;
pub mod queue;
pub mod task;
pub mod template;
