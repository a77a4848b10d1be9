//! Inventory synchronization for packages on an Android device.
//!
//! [`InventoryEngine::refresh`] reconciles the cached package set with a
//! fresh `pm list packages` listing, resolving labels for new packages
//! through a bounded worker pool before publishing the new generation.
//! [`InventoryEngine::toggle`] disables or re-enables one package.

pub mod cache;
pub mod commands;
pub mod engine;
pub mod error;
pub mod listing;
pub mod package;
pub mod poller;
pub mod resolver;
pub mod toggle;

pub use cache::{Inventory, InventoryCache};
pub use commands::PackageCommands;
pub use engine::{EngineConfig, InventoryEngine, RefreshReport};
pub use error::InventoryError;
pub use listing::{ListingEntry, ParseError};
pub use package::{Package, PackageState, PackageView, DESCRIPTION_PLACEHOLDER};
pub use poller::{RefreshLoop, RefreshLoopConfig, RefreshStats};
pub use resolver::LabelResolverPool;
pub use toggle::{PackageStatus, ToggleOutcome, ToggleResponse};
