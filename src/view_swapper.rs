//! Swapping the rendered sub-view as the state machine transitions (§4.F).
//!
//! The actual view tree is owned by the host view-instantiation engine; this
//! module only defines the seam ([`SubView`], [`SubViewFactory`]) and the
//! swap policy: destroy whatever is mounted, instantiate the new one in the
//! same host anchor, mount it.

use std::rc::Rc;

/// A mounted sub-view instance. Dropping it must tear down whatever it
/// rendered; the defer runtime never reaches into its internals.
pub trait SubView {
    /// Detaches and destroys this sub-view's rendered output.
    fn unmount(&self);

    /// This sub-view's query-liveness surface (§4.F properties 6-7), if it
    /// exposes one. A sub-view with nothing queryable (most placeholders)
    /// can leave this at the default.
    fn as_queryable(&self) -> Option<&dyn Queryable> {
        None
    }
}

/// The query re-resolution seam: a query declared on the enclosing
/// component must observe exactly the directives present in whichever
/// sub-view is currently mounted, re-resolving on every transition rather
/// than caching across swaps.
pub trait Queryable {
    fn queryable_directives(&self) -> Vec<String>;
}

/// Instantiates a block's placeholder/loading/main/error sub-template.
/// Bound by the compiler once per descriptor; invoked once per swap.
pub trait SubViewFactory {
    fn instantiate(&self) -> Rc<dyn SubView>;
}

/// Holds at most one mounted sub-view at a time and swaps it atomically:
/// the old view is unmounted before the new one is instantiated, so a
/// panicking `instantiate` never leaves two views mounted at once.
pub struct ViewSwapper {
    current: Option<Rc<dyn SubView>>,
}

impl ViewSwapper {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// The currently mounted view's queryable surface, if any (§4.F
    /// properties 6-7). Returns `None` between swaps and whenever the
    /// mounted view doesn't expose one.
    pub fn current_queryable(&self) -> Option<&dyn Queryable> {
        self.current.as_deref().and_then(SubView::as_queryable)
    }

    /// Unmounts whatever is currently shown, then mounts `factory`'s output
    /// in its place. Passing `None` just clears the slot.
    pub fn swap(&mut self, factory: Option<&dyn SubViewFactory>) {
        if let Some(old) = self.current.take() {
            old.unmount();
        }
        if let Some(factory) = factory {
            self.current = Some(factory.instantiate());
        }
    }
}

impl Default for ViewSwapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewSwapper {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            current.unmount();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;

    pub struct StubView {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl SubView for StubView {
        fn unmount(&self) {
            self.log.borrow_mut().push(format!("unmount:{}", self.name));
        }
    }

    pub struct StubFactory {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl StubFactory {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn with_log(name: &'static str, log: Rc<RefCell<Vec<String>>>) -> Self {
            Self { name, log }
        }

        pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
            self.log.clone()
        }
    }

    impl SubViewFactory for StubFactory {
        fn instantiate(&self) -> Rc<dyn SubView> {
            self.log.borrow_mut().push(format!("mount:{}", self.name));
            Rc::new(StubView {
                name: self.name,
                log: self.log.clone(),
            })
        }
    }

    struct QueryableView {
        directives: Vec<String>,
    }

    impl SubView for QueryableView {
        fn unmount(&self) {}
        fn as_queryable(&self) -> Option<&dyn Queryable> {
            Some(self)
        }
    }

    impl Queryable for QueryableView {
        fn queryable_directives(&self) -> Vec<String> {
            self.directives.clone()
        }
    }

    struct QueryableFactory {
        directives: Vec<String>,
    }

    impl SubViewFactory for QueryableFactory {
        fn instantiate(&self) -> Rc<dyn SubView> {
            Rc::new(QueryableView {
                directives: self.directives.clone(),
            })
        }
    }

    #[test]
    fn query_re_resolves_to_the_directives_of_the_currently_mounted_view() {
        let loading = QueryableFactory {
            directives: vec!["spinner".to_string()],
        };
        let main = QueryableFactory {
            directives: vec!["widget-a".to_string(), "widget-b".to_string()],
        };

        let mut swapper = ViewSwapper::new();
        swapper.swap(Some(&loading));
        assert_eq!(
            swapper.current_queryable().unwrap().queryable_directives(),
            vec!["spinner".to_string()]
        );

        swapper.swap(Some(&main));
        assert_eq!(
            swapper.current_queryable().unwrap().queryable_directives(),
            vec!["widget-a".to_string(), "widget-b".to_string()]
        );
    }

    #[test]
    fn no_queryable_view_mounted_yields_none() {
        let swapper = ViewSwapper::new();
        assert!(swapper.current_queryable().is_none());
    }

    #[test]
    fn swap_unmounts_old_before_mounting_new() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let placeholder = StubFactory::with_log("placeholder", log.clone());
        let main = StubFactory::with_log("main", log.clone());

        let mut swapper = ViewSwapper::new();
        swapper.swap(Some(&placeholder));
        swapper.swap(Some(&main));

        assert_eq!(
            *log.borrow(),
            vec!["mount:placeholder", "unmount:placeholder", "mount:main"]
        );
    }

    #[test]
    fn swap_to_none_just_unmounts() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let placeholder = StubFactory::with_log("placeholder", log.clone());

        let mut swapper = ViewSwapper::new();
        swapper.swap(Some(&placeholder));
        swapper.swap(None);

        assert!(swapper.is_empty());
        assert_eq!(*log.borrow(), vec!["mount:placeholder", "unmount:placeholder"]);
    }

    #[test]
    fn dropping_swapper_unmounts_current_view() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let main = StubFactory::with_log("main", log.clone());

        {
            let mut swapper = ViewSwapper::new();
            swapper.swap(Some(&main));
        }

        assert_eq!(*log.borrow(), vec!["mount:main", "unmount:main"]);
    }
}
