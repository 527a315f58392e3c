//! Column declarations and the cell binding engine.

mod column;
mod engine;
pub mod filter;

pub use column::{
    Callback, Column, Control, CustomCell, Descriptor, EditDescriptor, Factory, InputConfig,
    SelectConfig, SelectOption,
};
pub use engine::{
    BoundCell, CellBindingEngine, CellKind, HardUpdate, HardUpdateListener, InputControl,
    SelectControl,
};
pub use filter::{option_matches, OptionFilter};
