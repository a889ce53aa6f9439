use std::any::{Any, TypeId};

use crate::runtime::RUNTIME;

/// Namespace for storing and retrieving context values in the scope hierarchy.
///
/// # Example
/// ```
/// # use floem_reactive::{Context, Scope};
/// let scope = Scope::new();
/// scope.enter(|| {
///     Context::provide(42i32);
///     assert_eq!(Context::get::<i32>(), Some(42));
/// });
/// ```
pub struct Context;

impl Context {
    /// Stores a context value in the current scope.
    ///
    /// Descendant scopes see this value via [`Context::get`] unless they
    /// provide their own value of the same type, which shadows it for their
    /// subtree. Context values are cleaned up automatically when the scope
    /// that provided them is disposed.
    pub fn provide<T>(value: T)
    where
        T: Clone + 'static,
    {
        let ty = TypeId::of::<T>();
        RUNTIME.with(|runtime| {
            let scope = *runtime.current_scope.borrow();
            runtime
                .scope_contexts
                .borrow_mut()
                .entry(scope)
                .or_default()
                .insert(ty, Box::new(value) as Box<dyn Any>);
        });
    }

    /// Looks up a context value starting at the current scope and walking
    /// up through its ancestors, returning the nearest provided value.
    pub fn get<T>() -> Option<T>
    where
        T: Clone + 'static,
    {
        let ty = TypeId::of::<T>();
        RUNTIME.with(|runtime| {
            let mut scope = *runtime.current_scope.borrow();
            let scope_contexts = runtime.scope_contexts.borrow();
            let parents = runtime.parents.borrow();

            loop {
                if let Some(contexts) = scope_contexts.get(&scope) {
                    if let Some(value) = contexts.get(&ty) {
                        return value.downcast_ref::<T>().cloned();
                    }
                }
                match parents.get(&scope) {
                    Some(&parent) => scope = parent,
                    None => return None,
                }
            }
        })
    }
}

/// Looks up a context value provided by [`provide_context`] in the current
/// scope or one of its ancestors.
pub fn use_context<T>() -> Option<T>
where
    T: Clone + 'static,
{
    Context::get::<T>()
}

/// Stores a context value in the current scope, visible to it and its
/// descendants via [`use_context`].
pub fn provide_context<T>(value: T)
where
    T: Clone + 'static,
{
    Context::provide(value)
}
