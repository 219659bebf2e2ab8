//! Per-call binding options.

use std::fmt;
use std::sync::Arc;

use schemata_core::Value;
use schemata_registry::FieldConfig;

type FieldFilter = Arc<dyn Fn(&FieldConfig) -> bool + Send + Sync>;
type ValueFilter = Arc<dyn Fn(&Value, &FieldConfig) -> bool + Send + Sync>;

/// Options for [`Binder::bind`](crate::Binder::bind).
///
/// Filters return `true` to keep a field. They apply to nested binds as
/// well; the view applies to the top-level type only.
#[derive(Clone, Default)]
pub struct BindOptions {
    pub view: Option<String>,
    filter_field: Option<FieldFilter>,
    filter_value: Option<ValueFilter>,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Veto fields before their value is looked up.
    pub fn filter_field(mut self, filter: impl Fn(&FieldConfig) -> bool + Send + Sync + 'static) -> Self {
        self.filter_field = Some(Arc::new(filter));
        self
    }

    /// Veto fields by their inbound value.
    pub fn filter_value(mut self, filter: impl Fn(&Value, &FieldConfig) -> bool + Send + Sync + 'static) -> Self {
        self.filter_value = Some(Arc::new(filter));
        self
    }

    pub(crate) fn keeps_field(&self, field: &FieldConfig) -> bool {
        self.filter_field.as_ref().map_or(true, |filter| filter(field))
    }

    pub(crate) fn keeps_value(&self, value: &Value, field: &FieldConfig) -> bool {
        self.filter_value.as_ref().map_or(true, |filter| filter(value, field))
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("view", &self.view)
            .field("filter_field", &self.filter_field.is_some())
            .field("filter_value", &self.filter_value.is_some())
            .finish()
    }
}
