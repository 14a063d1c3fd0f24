//! Domain models for orders.

pub mod change_log;
pub mod comment;
pub mod data;
pub mod line_item;
pub mod order;
pub mod product;

pub use change_log::{ChangeKind, ChangeLog, ChangeLogEntry, Changes, FieldChange};
pub use comment::OrderComment;
pub use data::{DataValue, ExtensionMap};
pub use line_item::{LineItem, LineItemKind};
pub use order::{AddressKind, Order};
#[cfg(feature = "postgres")]
pub(crate) use order::OrderParts;
pub use product::{OrderProduct, ProductData};
