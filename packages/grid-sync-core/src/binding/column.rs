//! Column declarations and edit descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::EditBuffer;
use crate::row::Row;

/// Host callback receiving a control's new value.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&Value) + Send + Sync>);

impl Callback {
    pub fn new(f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: &Value) {
        (self.0)(value)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Per-row configuration factory. Returning `None` renders the cell as a
/// plain read-only cell for that row.
pub struct Factory<T>(Arc<dyn Fn(&EditBuffer, &Row, usize) -> Option<T> + Send + Sync>);

impl<T> Clone for Factory<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

/// Static configuration or a per-row factory.
#[derive(Debug, Clone)]
pub enum Descriptor<T> {
    Static(T),
    Factory(Factory<T>),
}

impl<T: Clone> Descriptor<T> {
    /// Wraps a per-row factory.
    pub fn factory(
        f: impl Fn(&EditBuffer, &Row, usize) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self::Factory(Factory(Arc::new(f)))
    }

    /// Configuration for row `index`, or `None` when the row is not editable.
    pub fn resolve(&self, buffer: &EditBuffer, row: &Row, index: usize) -> Option<T> {
        match self {
            Self::Static(config) => Some(config.clone()),
            Self::Factory(factory) => (factory.0)(buffer, row, index),
        }
    }
}

impl<T> From<T> for Descriptor<T> {
    fn from(config: T) -> Self {
        Self::Static(config)
    }
}

/// Host-rendered control. The engine only tracks its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCell {
    /// Host-defined widget name
    pub widget: String,
    /// Host-defined properties
    #[serde(default)]
    pub props: Value,
}

impl CustomCell {
    pub fn new(widget: impl Into<String>) -> Self {
        Self {
            widget: widget.into(),
            props: Value::Null,
        }
    }
}

/// Text input configuration.
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    pub placeholder: Option<String>,
    pub disabled: bool,
    /// Maximum length in characters; longer input is cut before it is stored
    pub max_length: Option<usize>,
    /// Host change callback, invoked before the soft update
    pub on_change: Option<Callback>,
    /// Host blur callback, invoked before the hard update
    pub on_blur: Option<Callback>,
}

impl InputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn on_change(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Callback::new(f));
        self
    }

    pub fn on_blur(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_blur = Some(Callback::new(f));
        self
    }

    /// Applies `max_length` to string values.
    pub fn clamp(&self, value: Value) -> Value {
        match (self.max_length, value) {
            (Some(max), Value::String(s)) if s.chars().count() > max => {
                Value::String(s.chars().take(max).collect())
            }
            (_, value) => value,
        }
    }
}

/// One choice of a selection control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Selection control configuration.
#[derive(Debug, Clone, Default)]
pub struct SelectConfig {
    pub options: Vec<SelectOption>,
    pub placeholder: Option<String>,
    pub allow_clear: bool,
    /// Whether the control filters its options from typed input
    pub searchable: bool,
    pub disabled: bool,
    /// Host change callback, invoked before the soft and hard updates
    pub on_change: Option<Callback>,
}

impl SelectConfig {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            searchable: true,
            ..Default::default()
        }
    }

    pub fn allow_clear(mut self) -> Self {
        self.allow_clear = true;
        self
    }

    pub fn on_change(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Callback::new(f));
        self
    }
}

/// How a column's cells can be edited.
///
/// At most one slot takes effect, in the order render, input, select.
#[derive(Debug, Clone, Default)]
pub struct EditDescriptor {
    pub render: Option<Descriptor<CustomCell>>,
    pub input: Option<Descriptor<InputConfig>>,
    pub select: Option<Descriptor<SelectConfig>>,
}

impl EditDescriptor {
    pub fn render(descriptor: impl Into<Descriptor<CustomCell>>) -> Self {
        Self {
            render: Some(descriptor.into()),
            ..Default::default()
        }
    }

    pub fn input(descriptor: impl Into<Descriptor<InputConfig>>) -> Self {
        Self {
            input: Some(descriptor.into()),
            ..Default::default()
        }
    }

    pub fn select(descriptor: impl Into<Descriptor<SelectConfig>>) -> Self {
        Self {
            select: Some(descriptor.into()),
            ..Default::default()
        }
    }

    /// Resolves the control for row `index`.
    ///
    /// The highest-priority declared slot decides alone: if its factory
    /// returns `None`, the cell is plain even when a lower slot is declared.
    pub fn resolve(&self, buffer: &EditBuffer, row: &Row, index: usize) -> Option<Control> {
        if let Some(render) = &self.render {
            return render.resolve(buffer, row, index).map(Control::Custom);
        }
        if let Some(input) = &self.input {
            return input.resolve(buffer, row, index).map(Control::Input);
        }
        if let Some(select) = &self.select {
            return select.resolve(buffer, row, index).map(Control::Select);
        }
        None
    }
}

/// A resolved editable control.
#[derive(Debug, Clone)]
pub enum Control {
    Custom(CustomCell),
    Input(InputConfig),
    Select(SelectConfig),
}

/// A grid column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Row field the column displays
    pub key: String,
    pub title: String,
    /// `None` renders every cell read-only
    pub edit: Option<EditDescriptor>,
}

impl Column {
    /// Read-only column.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            edit: None,
        }
    }

    pub fn editable(mut self, edit: EditDescriptor) -> Self {
        self.edit = Some(edit);
        self
    }

    pub fn is_editable(&self) -> bool {
        self.edit.is_some()
    }
}
