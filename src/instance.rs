//! The per-occurrence controller (§4.G): wires a descriptor's triggers,
//! loader, state machines, view swapper and cleanup registry together into
//! one runtime object representing a single rendered defer block.
//!
//! Construction follows a fixed sequence: mount the placeholder (or leave
//! the anchor empty if none was given), arm every prefetch trigger, arm
//! every main trigger, and register every resulting disposer with the
//! cleanup registry so destruction tears everything down in reverse.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{
    cleanup::{CleanupRegistry, TriggerDisposer},
    descriptor::DeferDescriptor,
    loader,
    resolver::ViewHost,
    scheduler::{Clock, Disposer, EventSource},
    state_machine::{MainChannel, MainState, PrefetchChannel, PrefetchState},
    trigger::{self, TriggerContext},
    view_swapper::ViewSwapper,
};

struct Inner {
    descriptor: Rc<DeferDescriptor>,
    main: MainChannel,
    prefetch: PrefetchChannel,
    view: ViewSwapper,
}

impl Inner {
    fn swap_to(&mut self, state: MainState) {
        let factory = match state {
            MainState::Placeholder => self.descriptor.placeholder.as_deref(),
            MainState::Loading => self
                .descriptor
                .loading
                .as_deref()
                .or(self.descriptor.placeholder.as_deref()),
            MainState::Complete => Some(self.descriptor.main.as_ref()),
            MainState::Failed => self.descriptor.error.as_deref(),
        };
        self.view.swap(factory);
    }
}

/// A single rendered occurrence of a deferred block.
///
/// Shared via `Rc` because every armed trigger's callback and the loader's
/// completion callback each need their own handle back into the instance,
/// and all of them run on the same single-threaded task loop so a `RefCell`
/// is enough to guard the shared state.
pub struct DeferInstance {
    inner: RefCell<Inner>,
    cleanup: CleanupRegistry,
    weak_self: Weak<DeferInstance>,
    /// Handles to each channel's own trigger disposers, kept separately from
    /// `cleanup` so a channel's listeners can be released the moment it
    /// settles rather than only at full instance teardown (§4.B). Filled in
    /// right after construction, once `weak_self` can actually be upgraded
    /// (an `on immediate` trigger fires synchronously while arming, and a
    /// `Weak` captured during `Rc::new_cyclic`'s own closure cannot upgrade
    /// until that closure returns).
    main_triggers: RefCell<Vec<TriggerDisposer>>,
    prefetch_triggers: RefCell<Vec<TriggerDisposer>>,
}

impl DeferInstance {
    /// Mounts the placeholder, arms every trigger on both channels, and
    /// returns the live instance. `host` is only consulted during this call
    /// to resolve DOM-binding trigger anchors; it is not retained.
    pub fn new(
        descriptor: Rc<DeferDescriptor>,
        clock: &dyn Clock,
        events: &dyn EventSource,
        host: &dyn ViewHost,
    ) -> Rc<Self> {
        let mut inner = Inner {
            descriptor: descriptor.clone(),
            main: MainChannel::new(),
            prefetch: PrefetchChannel::new(),
            view: ViewSwapper::new(),
        };
        inner.swap_to(MainState::Placeholder);

        let instance = Rc::new_cyclic(|weak| DeferInstance {
            inner: RefCell::new(inner),
            cleanup: CleanupRegistry::new(),
            weak_self: weak.clone(),
            main_triggers: RefCell::new(Vec::new()),
            prefetch_triggers: RefCell::new(Vec::new()),
        });

        let ctx = TriggerContext { clock, events, host };

        for spec in descriptor.prefetch_triggers() {
            let weak = Rc::downgrade(&instance);
            let disposer = trigger::arm(
                spec,
                &ctx,
                Rc::new(move || {
                    if let Some(instance) = weak.upgrade() {
                        instance.fire_prefetch();
                    }
                }),
            );
            let (handle, registry_disposer) = TriggerDisposer::new(disposer);
            instance.cleanup.register(registry_disposer);
            instance.prefetch_triggers.borrow_mut().push(handle);
        }
        // An already-armed prefetch trigger can itself have started a load
        // (e.g. two `on idle` prefetch triggers, the first of which fired
        // synchronously); release every prefetch trigger armed since, too.
        if instance.inner.borrow().prefetch.state() != PrefetchState::NotStarted {
            for handle in instance.prefetch_triggers.borrow().iter() {
                handle.dispose_now();
            }
        }

        for spec in descriptor.main_triggers() {
            let weak = Rc::downgrade(&instance);
            let disposer = trigger::arm(
                spec,
                &ctx,
                Rc::new(move || {
                    if let Some(instance) = weak.upgrade() {
                        instance.fire_main();
                    }
                }),
            );
            let (handle, registry_disposer) = TriggerDisposer::new(disposer);
            instance.cleanup.register(registry_disposer);
            instance.main_triggers.borrow_mut().push(handle);
        }
        // Same reasoning as the prefetch loop above, for `on immediate`
        // arming ahead of a later main trigger in the same list.
        if instance.inner.borrow().main.state() != MainState::Placeholder {
            for handle in instance.main_triggers.borrow().iter() {
                handle.dispose_now();
            }
        }

        instance
    }

    pub fn main_state(&self) -> MainState {
        self.inner.borrow().main.state()
    }

    pub fn prefetch_state(&self) -> PrefetchState {
        self.inner.borrow().prefetch.state()
    }

    /// Registers an additional disposer (e.g. one the loader's dependency
    /// bundle needs released) to run alongside the trigger disposers.
    pub fn register_cleanup(&self, disposer: Disposer) {
        self.cleanup.register(disposer);
    }

    /// Tears down every trigger and released resource in reverse
    /// registration order (§4.H). Safe to call more than once.
    pub fn destroy(&self) {
        self.cleanup.run();
    }

    /// Drives the main channel (§4.E). If prefetch already settled the
    /// descriptor's dependency bundle, skips `Loading` entirely and
    /// transitions straight to `Complete`/`Failed` so no loading (or
    /// lingering placeholder) sub-view is ever mounted in between — the "no
    /// Loading flash" rule. Otherwise goes through `Loading` and awaits the
    /// same shared load prefetch already kicked off, or starts one.
    fn fire_main(&self) {
        let prefetch_state = {
            let inner = self.inner.borrow();
            if inner.main.state() != MainState::Placeholder {
                return;
            }
            inner.prefetch.state()
        };

        let bundle_settled = matches!(
            prefetch_state,
            PrefetchState::Complete | PrefetchState::Failed
        );
        if !bundle_settled {
            let mut inner = self.inner.borrow_mut();
            inner.main.transition(MainState::Loading);
            inner.swap_to(MainState::Loading);
            tracing::debug!("main channel Placeholder -> Loading");
        }

        // The main channel only ever settles once; release its other armed
        // triggers now rather than waiting for full instance teardown.
        for handle in self.main_triggers.borrow().iter() {
            handle.dispose_now();
        }

        let weak = self.weak_self.clone();
        let descriptor = self.inner.borrow().descriptor.clone();
        tracing::debug!("main channel requesting dependency bundle");
        loader::load(
            &descriptor,
            Box::new(move |result| {
                let Some(instance) = weak.upgrade() else {
                    return;
                };
                let mut inner = instance.inner.borrow_mut();
                match result {
                    Ok(_bundle) => {
                        inner.main.transition(MainState::Complete);
                        inner.swap_to(MainState::Complete);
                        tracing::debug!("main channel -> Complete");
                    }
                    Err(reason) => {
                        crate::diagnostics::report(crate::diagnostics::DeferError::LoaderRejected {
                            reason,
                        });
                        inner.main.transition(MainState::Failed);
                        inner.swap_to(MainState::Failed);
                        tracing::debug!("main channel -> Failed");
                    }
                }
            }),
        );
    }

    fn fire_prefetch(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.prefetch.state() != PrefetchState::NotStarted {
                return;
            }
            inner.prefetch.transition(PrefetchState::InProgress);
        }

        // The prefetch channel only ever starts one load; release its other
        // armed triggers now rather than waiting for full instance teardown.
        for handle in self.prefetch_triggers.borrow().iter() {
            handle.dispose_now();
        }

        let weak = self.weak_self.clone();
        let descriptor = self.inner.borrow().descriptor.clone();
        tracing::debug!("prefetch channel requesting dependency bundle");
        loader::load(
            &descriptor,
            Box::new(move |result| {
                let Some(instance) = weak.upgrade() else {
                    return;
                };
                let mut inner = instance.inner.borrow_mut();
                // Prefetch failures are never rendered: only a main-channel
                // fire surfaces an error view, so we just record the state.
                match result {
                    Ok(_) => {
                        inner.prefetch.transition(PrefetchState::Complete);
                        tracing::debug!("prefetch channel -> Complete");
                    }
                    Err(_) => {
                        inner.prefetch.transition(PrefetchState::Failed);
                        tracing::debug!("prefetch channel -> Failed");
                    }
                }
            }),
        );
    }
}

impl Drop for DeferInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell as StdRefCell;

    use super::*;
    use crate::descriptor::{Channel, DependencyBundle, DirectiveDef, LoaderFn, TriggerKind, TriggerSpec};
    use crate::resolver::AnchorRef;
    use crate::scheduler::fake::{FakeClock, FakeEventSource, NullEventSource};
    use crate::scheduler::{AnchorId, DomEvent};
    use crate::view_swapper::tests::StubFactory;
    use slotmap::SlotMap;
    use std::collections::HashMap;

    struct TestHost {
        named: HashMap<String, AnchorId>,
        placeholder: Option<AnchorId>,
    }
    impl ViewHost for TestHost {
        fn resolve_named(&self, name: &str) -> Option<AnchorId> {
            self.named.get(name).copied()
        }
        fn placeholder_first_node(&self) -> Option<AnchorId> {
            self.placeholder
        }
        fn parent(&self) -> Option<Rc<dyn ViewHost>> {
            None
        }
    }

    fn ok_loader() -> LoaderFn {
        Rc::new(|cb: crate::descriptor::LoadCallback| {
            cb(Ok(Rc::new(DependencyBundle {
                directives: vec![DirectiveDef {
                    name: "widget".to_string(),
                }],
            })));
        })
    }

    fn err_loader() -> LoaderFn {
        Rc::new(|cb: crate::descriptor::LoadCallback| {
            cb(Err("network down".to_string()));
        })
    }

    #[test]
    fn immediate_trigger_drives_main_channel_to_complete() {
        let descriptor = Rc::new(
            DeferDescriptor::new(
                Rc::new(StubFactory::new("main")),
                ok_loader(),
                vec![TriggerSpec::new(TriggerKind::Immediate, Channel::Main)],
            )
            .with_placeholder(Rc::new(StubFactory::new("placeholder"))),
        );
        let clock = FakeClock::new();
        let events = NullEventSource;
        let host = TestHost {
            named: HashMap::new(),
            placeholder: None,
        };

        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        assert_eq!(instance.main_state(), MainState::Complete);
    }

    #[test]
    fn failed_load_transitions_to_failed_and_reports_diagnostic() {
        let recorder = crate::diagnostics::RecordingDiagnostics::new();
        crate::diagnostics::provide_diagnostics(recorder.clone());

        let descriptor = Rc::new(DeferDescriptor::new(
            Rc::new(StubFactory::new("main")),
            err_loader(),
            vec![TriggerSpec::new(TriggerKind::Immediate, Channel::Main)],
        ));
        let clock = FakeClock::new();
        let events = NullEventSource;
        let host = TestHost {
            named: HashMap::new(),
            placeholder: None,
        };

        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        assert_eq!(instance.main_state(), MainState::Failed);
        assert!(!recorder.is_empty());
    }

    #[test]
    fn prefetch_then_main_fire_reuses_cached_bundle_without_second_load() {
        let call_count = Rc::new(StdRefCell::new(0));
        let call_count_handle = call_count.clone();
        let loader: LoaderFn = Rc::new(move |cb: crate::descriptor::LoadCallback| {
            *call_count_handle.borrow_mut() += 1;
            cb(Ok(Rc::new(DependencyBundle::default())));
        });

        let descriptor = Rc::new(DeferDescriptor::new(
            Rc::new(StubFactory::new("main")),
            loader,
            vec![
                TriggerSpec::new(TriggerKind::Idle, Channel::Prefetch),
                TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                    .with_anchor(AnchorRef::Named("button".to_string())),
            ],
        ));

        let clock = FakeClock::new();
        let events = FakeEventSource::new();
        let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
        let anchor = pool.insert(());
        let mut named = HashMap::new();
        named.insert("button".to_string(), anchor);
        let host = TestHost {
            named,
            placeholder: None,
        };

        crate::scheduler::idle::reset_for_test();
        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        assert_eq!(instance.prefetch_state(), PrefetchState::NotStarted);

        clock.run_idle();
        assert_eq!(instance.prefetch_state(), PrefetchState::Complete);
        assert_eq!(instance.main_state(), MainState::Placeholder);

        events.dispatch(anchor, DomEvent::Click);
        assert_eq!(instance.main_state(), MainState::Complete);
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn cached_prefetch_bundle_skips_loading_view_on_main_fire() {
        let log = Rc::new(StdRefCell::new(Vec::new()));
        let loader: LoaderFn = Rc::new(|cb: crate::descriptor::LoadCallback| {
            cb(Ok(Rc::new(DependencyBundle::default())));
        });

        let descriptor = Rc::new(
            DeferDescriptor::new(
                Rc::new(StubFactory::with_log("main", log.clone())),
                loader,
                vec![
                    TriggerSpec::new(TriggerKind::Idle, Channel::Prefetch),
                    TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                        .with_anchor(AnchorRef::Named("button".to_string())),
                ],
            )
            .with_placeholder(Rc::new(StubFactory::with_log("placeholder", log.clone())))
            .with_loading(Rc::new(StubFactory::with_log("loading", log.clone()))),
        );

        let clock = FakeClock::new();
        let events = FakeEventSource::new();
        let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
        let anchor = pool.insert(());
        let mut named = HashMap::new();
        named.insert("button".to_string(), anchor);
        let host = TestHost {
            named,
            placeholder: None,
        };

        crate::scheduler::idle::reset_for_test();
        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        clock.run_idle();
        assert_eq!(instance.prefetch_state(), PrefetchState::Complete);

        log.borrow_mut().clear();
        events.dispatch(anchor, DomEvent::Click);

        assert_eq!(instance.main_state(), MainState::Complete);
        assert_eq!(*log.borrow(), vec!["unmount:placeholder", "mount:main"]);
    }

    #[test]
    fn prefetch_failure_transitions_main_straight_to_failed_without_loading() {
        let log = Rc::new(StdRefCell::new(Vec::new()));

        let descriptor = Rc::new(
            DeferDescriptor::new(
                Rc::new(StubFactory::with_log("main", log.clone())),
                err_loader(),
                vec![
                    TriggerSpec::new(TriggerKind::Idle, Channel::Prefetch),
                    TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                        .with_anchor(AnchorRef::Named("button".to_string())),
                ],
            )
            .with_placeholder(Rc::new(StubFactory::with_log("placeholder", log.clone())))
            .with_loading(Rc::new(StubFactory::with_log("loading", log.clone())))
            .with_error(Rc::new(StubFactory::with_log("error", log.clone()))),
        );

        let clock = FakeClock::new();
        let events = FakeEventSource::new();
        let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
        let anchor = pool.insert(());
        let mut named = HashMap::new();
        named.insert("button".to_string(), anchor);
        let host = TestHost {
            named,
            placeholder: None,
        };

        crate::scheduler::idle::reset_for_test();
        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        clock.run_idle();
        assert_eq!(instance.prefetch_state(), PrefetchState::Failed);

        log.borrow_mut().clear();
        events.dispatch(anchor, DomEvent::Click);

        assert_eq!(instance.main_state(), MainState::Failed);
        assert_eq!(*log.borrow(), vec!["unmount:placeholder", "mount:error"]);
    }

    #[test]
    fn main_trigger_listeners_are_released_the_moment_the_block_loads() {
        let descriptor = Rc::new(
            DeferDescriptor::new(
                Rc::new(StubFactory::new("main")),
                ok_loader(),
                vec![TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                    .with_anchor(AnchorRef::Named("button".to_string()))],
            )
            .with_placeholder(Rc::new(StubFactory::new("placeholder"))),
        );
        let clock = FakeClock::new();
        let events = FakeEventSource::new();
        let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
        let anchor = pool.insert(());
        let mut named = HashMap::new();
        named.insert("button".to_string(), anchor);
        let host = TestHost {
            named,
            placeholder: None,
        };

        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        events.dispatch(anchor, DomEvent::Click);

        assert_eq!(instance.main_state(), MainState::Complete);
        assert_eq!(events.listener_count(anchor, DomEvent::Click), 0);
        assert_eq!(events.listener_count(anchor, DomEvent::KeyDown), 0);
    }

    #[test]
    fn destroy_disarms_triggers_so_late_events_are_ignored() {
        let descriptor = Rc::new(DeferDescriptor::new(
            Rc::new(StubFactory::new("main")),
            ok_loader(),
            vec![TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                .with_anchor(AnchorRef::Named("button".to_string()))],
        ));
        let clock = FakeClock::new();
        let events = FakeEventSource::new();
        let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
        let anchor = pool.insert(());
        let mut named = HashMap::new();
        named.insert("button".to_string(), anchor);
        let host = TestHost {
            named,
            placeholder: None,
        };

        let instance = DeferInstance::new(descriptor, &clock, &events, &host);
        instance.destroy();
        events.dispatch(anchor, DomEvent::Click);

        assert_eq!(instance.main_state(), MainState::Placeholder);
    }
}
