use machine_config::ScenarioConfig;
use std::fmt;

/// Nested part of the playground state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedState {
    pub count: i64,
    pub name: String,
}

/// Playground state - a counter, a name and a nested counter
///
/// Fields are only changed through the `with_*` helpers, which consume the
/// state and return an updated copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundState {
    pub count: i64,
    pub name: String,
    pub nested: NestedState,
}

impl PlaygroundState {
    pub fn new(count: i64, name: impl Into<String>, nested: NestedState) -> Self {
        Self {
            count,
            name: name.into(),
            nested,
        }
    }

    pub fn with_count(self, count: i64) -> Self {
        Self { count, ..self }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_nested_count(self, count: i64) -> Self {
        Self {
            nested: NestedState {
                count,
                ..self.nested
            },
            ..self
        }
    }
}

impl From<&ScenarioConfig> for PlaygroundState {
    fn from(config: &ScenarioConfig) -> Self {
        Self::new(
            config.initial_count,
            config.initial_name.clone(),
            NestedState {
                count: config.nested_count,
                name: "nested".to_string(),
            },
        )
    }
}

impl fmt::Display for PlaygroundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{count: {}, name: {:?}, nested: {{count: {}, name: {:?}}}}}",
            self.count, self.name, self.nested.count, self.nested.name
        )
    }
}
