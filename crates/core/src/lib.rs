//! Trellis Core - Core types and schema definitions for the Trellis query engine.
//!
//! This crate provides the foundational types shared by every other layer:
//!
//! - `DataType`: Supported column types (Boolean, Int64, Float64, String, DateTime, Bytes)
//! - `Value`: Runtime values stored in a row payload
//! - `Row`: A row id plus a payload keyed by column name
//! - `schema`: Schema definitions (Schema, Table, Column, IndexDef, ForeignKey)
//! - `Error`: Error types shared by the `no_std` crates
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{DataType, Row, Value};
//! use trellis_core::schema::TableBuilder;
//!
//! let table = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], true)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(table.primary_key().unwrap().name(), "pkUsers");
//!
//! let row = Row::builder(1).set("id", 1i64).set("name", "Alice").build();
//! assert_eq!(row.get("name"), Some(&Value::String("Alice".into())));
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{Payload, Row, RowBuilder, RowId, RowIdGenerator, DUMMY_ROW_ID};
pub use types::DataType;
pub use value::Value;
