use std::fmt::Debug;

/// Renders the JDBC parameter marker written into outgoing SQL.
pub trait ParameterMarkerStrategy: Debug + Send + Sync {
    /// `position` is the 1-based JDBC position of the marker.
    fn create_marker(&self, position: usize) -> String;

    /// Whether markers change with their position, so that shifting one
    /// marker requires re-rendering the ones after it.
    fn is_position_sensitive(&self) -> bool {
        false
    }
}

/// Plain `?` markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardMarkerStrategy;

impl ParameterMarkerStrategy for StandardMarkerStrategy {
    fn create_marker(&self, _position: usize) -> String {
        "?".to_string()
    }
}

/// Numbered markers with a prefix, `$1`, `$2`, ... by default.
#[derive(Debug, Clone)]
pub struct OrdinalMarkerStrategy {
    prefix: String,
}

impl OrdinalMarkerStrategy {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string() }
    }
}

impl Default for OrdinalMarkerStrategy {
    fn default() -> Self {
        Self::new("$")
    }
}

impl ParameterMarkerStrategy for OrdinalMarkerStrategy {
    fn create_marker(&self, position: usize) -> String {
        format!("{}{}", self.prefix, position)
    }

    fn is_position_sensitive(&self) -> bool {
        true
    }
}
