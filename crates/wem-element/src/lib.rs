//! WEM Element Model
//!
//! Domain model for workspace elements and the entities that anchor them:
//!
//! - [`Element`]: the atomic unit of configuration, with typed identity
//!   fields lifted out of the wire payload
//! - [`ElementType`]: closed catalog of element types with per-type
//!   capabilities (wire names, integration binding, export cleanup)
//! - [`Connector`] / [`Integration`]: strongly-identified entities matched
//!   across workspaces before any element is processed
//! - [`cleanup`]: the export strip that keeps destination-assigned fields
//!   from crossing workspace boundaries

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cleanup;
mod connector;
mod element;
mod element_type;
mod error;

pub use connector::{
    Connector, ConnectorVersion, Integration, IntegrationSpec, DEVELOPMENT_VERSION,
};
pub use element::{Element, ParentReference};
pub use element_type::ElementType;
pub use error::ElementError;

/// Elements grouped by type, in catalog order.
pub type ElementSet = indexmap::IndexMap<ElementType, Vec<Element>>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
