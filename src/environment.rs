//! The one piece of ambient configuration this runtime has: whether
//! diagnostics run development-verbose or production-silent (§7's
//! `IllegalTransition` severity split).

use floem_reactive::{provide_context, use_context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// The environment in effect for the current scope, defaulting to
    /// [`Environment::Development`] in debug builds and
    /// [`Environment::Production`] in release builds when nothing has been
    /// provided explicitly.
    pub fn current() -> Self {
        use_context::<Environment>().unwrap_or(Self::default_for_build())
    }

    fn default_for_build() -> Self {
        if cfg!(debug_assertions) {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Overrides the environment for the current scope and its descendants.
pub fn provide_environment(environment: Environment) {
    provide_context(environment);
}
