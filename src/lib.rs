//! Selection-transform engine for a pixel-art editor: lift a region into a
//! floating buffer, move / scale / rotate / flip it with live feedback, and
//! commit it back into the layer.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

#[macro_use]
pub mod logger;

pub mod cli;
pub mod document;
pub mod geometry;
pub mod history;
pub mod io;
pub mod notify;
pub mod ops;
pub mod render;
pub mod selection;
pub mod settings;
pub mod tool;
pub mod viewport;

pub use selection::Selection;
pub use tool::{SelectionTool, ToolContext};
