//! End-to-end scenarios driving a [`floem_defer::DeferInstance`] through a
//! full trigger-to-settle cycle against the deterministic fakes.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use slotmap::SlotMap;

use floem_defer::{
    scheduler::{
        fake::{FakeClock, FakeEventSource},
        idle, AnchorId, DomEvent,
    },
    AnchorRef, Channel, DeferDescriptor, DeferInstance, DependencyBundle, DirectiveDef, LoadCallback,
    LoaderFn, MainState, PrefetchState, RecordingDiagnostics, SubView, SubViewFactory, TriggerKind,
    TriggerSpec, ViewHost,
};

struct LoggingView {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl SubView for LoggingView {
    fn unmount(&self) {
        self.log.borrow_mut().push(format!("unmount:{}", self.name));
    }
}

struct LoggingFactory {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl LoggingFactory {
    fn new(name: &'static str, log: Rc<RefCell<Vec<String>>>) -> Rc<Self> {
        Rc::new(Self { name, log })
    }
}

impl SubViewFactory for LoggingFactory {
    fn instantiate(&self) -> Rc<dyn SubView> {
        self.log.borrow_mut().push(format!("mount:{}", self.name));
        Rc::new(LoggingView {
            name: self.name,
            log: self.log.clone(),
        })
    }
}

struct TestHost {
    named: HashMap<String, AnchorId>,
}

impl ViewHost for TestHost {
    fn resolve_named(&self, name: &str) -> Option<AnchorId> {
        self.named.get(name).copied()
    }
    fn placeholder_first_node(&self) -> Option<AnchorId> {
        None
    }
    fn parent(&self) -> Option<Rc<dyn ViewHost>> {
        None
    }
}

fn loader_resolving(name: &'static str) -> LoaderFn {
    Rc::new(move |cb: LoadCallback| {
        cb(Ok(Rc::new(DependencyBundle {
            directives: vec![DirectiveDef {
                name: name.to_string(),
            }],
        })));
    })
}

fn loader_rejecting(reason: &'static str) -> LoaderFn {
    Rc::new(move |cb: LoadCallback| {
        cb(Err(reason.to_string()));
    })
}

/// S1: happy path. `on immediate` drives the main channel straight through
/// to `Complete`, swapping placeholder -> loading -> main view.
#[test]
fn s1_happy_path_swaps_through_every_view() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let descriptor = Rc::new(
        DeferDescriptor::new(
            LoggingFactory::new("main", log.clone()),
            loader_resolving("widget"),
            vec![TriggerSpec::new(TriggerKind::Immediate, Channel::Main)],
        )
        .with_placeholder(LoggingFactory::new("placeholder", log.clone())),
    );

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let host = TestHost {
        named: HashMap::new(),
    };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    assert_eq!(instance.main_state(), MainState::Complete);
    assert_eq!(
        *log.borrow(),
        vec!["mount:placeholder", "unmount:placeholder", "mount:main"]
    );
}

/// S2: the loader rejects. The main channel lands on `Failed` and the error
/// view is mounted instead of main.
#[test]
fn s2_rejected_load_swaps_to_error_view() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let recorder = RecordingDiagnostics::new();
    floem_defer::provide_diagnostics(recorder.clone());

    let descriptor = Rc::new(
        DeferDescriptor::new(
            LoggingFactory::new("main", log.clone()),
            loader_rejecting("boom"),
            vec![TriggerSpec::new(TriggerKind::Immediate, Channel::Main)],
        )
        .with_error(LoggingFactory::new("error", log.clone())),
    );

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let host = TestHost {
        named: HashMap::new(),
    };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    assert_eq!(instance.main_state(), MainState::Failed);
    assert!(log.borrow().contains(&"mount:error".to_string()));
    assert!(recorder
        .events()
        .iter()
        .any(|e| matches!(e, floem_defer::DeferError::LoaderRejected { .. })));
}

/// S3: an `on immediate` trigger with an interceptor wrapping the raw loader
/// in a call counter. The loader fires once during the creation pass and
/// never again after the main channel observes the resolved bundle.
#[test]
fn s3_immediate_trigger_with_interceptor_counts_exactly_one_load() {
    let counter = Rc::new(RefCell::new(0));
    let counter_handle = counter.clone();
    let interceptor: floem_defer::loader::Interceptor = Rc::new(move |raw: LoaderFn| {
        let counter = counter_handle.clone();
        Rc::new(move |cb: LoadCallback| {
            *counter.borrow_mut() += 1;
            raw(cb);
        })
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let descriptor = Rc::new(
        DeferDescriptor::new(
            LoggingFactory::new("main", log.clone()),
            loader_resolving("widget"),
            vec![TriggerSpec::new(TriggerKind::Immediate, Channel::Main)],
        )
        .with_loading(LoggingFactory::new("loading", log.clone()))
        .with_interceptor(&interceptor),
    );

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let host = TestHost {
        named: HashMap::new(),
    };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    assert_eq!(instance.main_state(), MainState::Complete);
    assert_eq!(*counter.borrow(), 1);
}

/// S4: a prefetch trigger resolves the dependency bundle before the main
/// trigger ever fires; when it does fire, the cached bundle is reused and
/// the loader function itself is invoked only once. Because the bundle is
/// already cached, the main fire must swap straight from placeholder to
/// main with no loading view mounted in between (§4.E "no Loading flash").
#[test]
fn s4_prefetch_then_main_fire_shares_one_load() {
    idle::reset_for_test();

    let call_count = Rc::new(RefCell::new(0));
    let call_count_handle = call_count.clone();
    let loader: LoaderFn = Rc::new(move |cb: LoadCallback| {
        *call_count_handle.borrow_mut() += 1;
        cb(Ok(Rc::new(DependencyBundle::default())));
    });

    let log = Rc::new(RefCell::new(Vec::new()));
    let descriptor = Rc::new(
        DeferDescriptor::new(
            LoggingFactory::new("main", log.clone()),
            loader,
            vec![
                TriggerSpec::new(TriggerKind::Idle, Channel::Prefetch),
                TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
                    .with_anchor(AnchorRef::Named("button".to_string())),
            ],
        )
        .with_placeholder(LoggingFactory::new("placeholder", log.clone()))
        .with_loading(LoggingFactory::new("loading", log.clone())),
    );

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
    let anchor = pool.insert(());
    let mut named = HashMap::new();
    named.insert("button".to_string(), anchor);
    let host = TestHost { named };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    assert_eq!(instance.prefetch_state(), PrefetchState::NotStarted);

    clock.run_idle();
    assert_eq!(instance.prefetch_state(), PrefetchState::Complete);
    assert_eq!(instance.main_state(), MainState::Placeholder);

    log.borrow_mut().clear();
    events.dispatch(anchor, DomEvent::Click);
    assert_eq!(instance.main_state(), MainState::Complete);
    assert_eq!(*call_count.borrow(), 1);
    assert_eq!(*log.borrow(), vec!["unmount:placeholder", "mount:main"]);
}

/// S5: many `idle` triggers across different instances share a single
/// outstanding platform idle callback (§5, §8 property 4).
#[test]
fn s5_idle_triggers_across_instances_share_one_outstanding_callback() {
    idle::reset_for_test();

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let host = TestHost {
        named: HashMap::new(),
    };

    let mut instances = Vec::new();
    for i in 0..5 {
        let descriptor = Rc::new(DeferDescriptor::new(
            LoggingFactory::new("main", Rc::new(RefCell::new(Vec::new()))),
            loader_resolving("x"),
            vec![TriggerSpec::new(TriggerKind::Idle, Channel::Main)],
        ));
        let _ = i;
        instances.push(DeferInstance::new(descriptor, &clock, &events, &host));
    }

    assert_eq!(idle::outstanding_count(), 1);
    clock.run_idle();
    for instance in &instances {
        assert_eq!(instance.main_state(), MainState::Complete);
    }
}

/// S6: an `interaction` trigger bound to an explicit named ref outside the
/// block's own placeholder still fires correctly once resolution walks
/// outward to find it. After the transition, both the `click` and
/// `keydown` listeners the trigger registered are removed (§8 S6: "a spy
/// on `removeEventListener` records both `click` and `keydown` removals").
#[test]
fn s6_interaction_trigger_with_external_anchor_fires_through_resolution() {
    let descriptor = Rc::new(DeferDescriptor::new(
        LoggingFactory::new("main", Rc::new(RefCell::new(Vec::new()))),
        loader_resolving("panel"),
        vec![TriggerSpec::new(TriggerKind::Interaction, Channel::Main)
            .with_anchor(AnchorRef::Named("open-button".to_string()))],
    ));

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let mut pool: SlotMap<AnchorId, ()> = SlotMap::with_key();
    let anchor = pool.insert(());
    let mut named = HashMap::new();
    named.insert("open-button".to_string(), anchor);
    let host = TestHost { named };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    assert_eq!(instance.main_state(), MainState::Placeholder);
    assert_eq!(events.listener_count(anchor, DomEvent::Click), 1);
    assert_eq!(events.listener_count(anchor, DomEvent::KeyDown), 1);

    events.dispatch(anchor, DomEvent::Click);
    assert_eq!(instance.main_state(), MainState::Complete);
    assert_eq!(events.listener_count(anchor, DomEvent::Click), 0);
    assert_eq!(events.listener_count(anchor, DomEvent::KeyDown), 0);
}

/// Destroying an instance tears down every trigger; events dispatched
/// afterward are silently ignored rather than reviving the block.
#[test]
fn destroyed_instance_ignores_late_triggers() {
    let descriptor = Rc::new(DeferDescriptor::new(
        LoggingFactory::new("main", Rc::new(RefCell::new(Vec::new()))),
        loader_resolving("panel"),
        vec![TriggerSpec::new(TriggerKind::Timer { delay_ms: 500 }, Channel::Main)],
    ));

    let clock = FakeClock::new();
    let events = FakeEventSource::new();
    let host = TestHost {
        named: HashMap::new(),
    };

    let instance = DeferInstance::new(descriptor, &clock, &events, &host);
    instance.destroy();
    clock.advance(1000);

    assert_eq!(instance.main_state(), MainState::Placeholder);
}
