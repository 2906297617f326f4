//! Calculator Registry
//!
//! A type-and-argument-indexed cache: exactly one instance exists per
//! distinct (calculator type, constructor arguments). Instances are created
//! on first request and live as long as the registry.

use hex::encode as hex_encode;
use lazy_static::lazy_static;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{RwgtError, RwgtResult};
use crate::event::ReweightKnob;
use crate::rwgt::{OnTheFlyCalculator, SigmaPolicy, StoredKnobArgs, StoredTableKnob, SystKnob, WeightGenerator};
use crate::tables::{JsonTableSource, TableSource};

/// Identity of one registry entry: the calculator type plus a hash of its
/// constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalculatorIdentity {
    type_id: TypeId,
    type_name: &'static str,
    args_hash: u64,
}

impl CalculatorIdentity {
    pub fn of<T: Registered>(args: &T::Args) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            args_hash: crate::hash_args!(0, args),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn args_hash(&self) -> u64 {
        self.args_hash
    }
}

impl fmt::Display for CalculatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.type_name.rsplit("::").next().unwrap_or(self.type_name);
        write!(f, "{}#{}", short, hex_encode(self.args_hash.to_be_bytes()))
    }
}

/// Shared handle to a registered calculator of either kind.
#[derive(Clone)]
pub enum CalculatorHandle {
    Generator(Arc<dyn WeightGenerator>),
    Knob(Arc<dyn SystKnob>),
}

impl CalculatorHandle {
    pub fn name(&self) -> &str {
        match self {
            CalculatorHandle::Generator(g) => g.name(),
            CalculatorHandle::Knob(k) => k.name(),
        }
    }

    pub fn as_generator(&self) -> Option<Arc<dyn WeightGenerator>> {
        match self {
            CalculatorHandle::Generator(g) => Some(g.clone()),
            CalculatorHandle::Knob(_) => None,
        }
    }

    pub fn as_knob(&self) -> Option<Arc<dyn SystKnob>> {
        match self {
            CalculatorHandle::Knob(k) => Some(k.clone()),
            CalculatorHandle::Generator(_) => None,
        }
    }
}

impl fmt::Debug for CalculatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculatorHandle::Generator(g) => write!(f, "Generator({})", g.name()),
            CalculatorHandle::Knob(k) => write!(f, "Knob({})", k.name()),
        }
    }
}

/// A calculator type the registry can build.
pub trait Registered: Sized + Send + Sync + 'static {
    type Args: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static;

    /// Build an instance. Dependencies may be obtained from `registry`.
    fn construct(args: &Self::Args, registry: &Registry) -> RwgtResult<Self>;

    fn into_handle(this: Arc<Self>) -> CalculatorHandle;
}

struct Entry {
    args: Box<dyn Any + Send + Sync>,
    instance: Arc<dyn Any + Send + Sync>,
    handle: CalculatorHandle,
}

#[derive(Default)]
struct State {
    entries: HashMap<CalculatorIdentity, Entry>,
    order: Vec<CalculatorIdentity>,
}

pub struct Registry {
    state: RwLock<State>,
    /// Serializes construction; re-entrant so constructors can obtain their
    /// dependencies on the same thread.
    creation: ReentrantMutex<()>,
    /// Identities currently being built by the thread holding `creation`.
    in_construction: Mutex<Vec<CalculatorIdentity>>,
    tables: Arc<dyn TableSource>,
    fallback: Option<Arc<dyn OnTheFlyCalculator>>,
    sigma_policy: SigmaPolicy,
}

/// Marks an identity as under construction until dropped, including when
/// the constructor unwinds.
struct ConstructionMarker<'a> {
    building: &'a Mutex<Vec<CalculatorIdentity>>,
    identity: CalculatorIdentity,
}

impl<'a> ConstructionMarker<'a> {
    fn enter(building: &'a Mutex<Vec<CalculatorIdentity>>, identity: &CalculatorIdentity) -> RwgtResult<Self> {
        let mut list = building.lock();
        if list.contains(identity) {
            return Err(RwgtError::CyclicConstruction {
                identity: identity.to_string(),
            });
        }
        list.push(identity.clone());
        Ok(Self {
            building,
            identity: identity.clone(),
        })
    }
}

impl Drop for ConstructionMarker<'_> {
    fn drop(&mut self) {
        self.building.lock().retain(|i| i != &self.identity);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            creation: ReentrantMutex::new(()),
            in_construction: Mutex::new(Vec::new()),
            tables: Arc::new(JsonTableSource::default()),
            fallback: None,
            sigma_policy: SigmaPolicy::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new()
            .with_table_source(Arc::new(JsonTableSource::new(config.data_path.clone())))
            .with_sigma_policy(config.sigma_policy)
    }

    pub fn with_table_source(mut self, source: Arc<dyn TableSource>) -> Self {
        self.tables = source;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn OnTheFlyCalculator>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_sigma_policy(mut self, policy: SigmaPolicy) -> Self {
        self.sigma_policy = policy;
        self
    }

    pub fn tables(&self) -> Arc<dyn TableSource> {
        self.tables.clone()
    }

    pub fn fallback(&self) -> Option<Arc<dyn OnTheFlyCalculator>> {
        self.fallback.clone()
    }

    pub fn sigma_policy(&self) -> SigmaPolicy {
        self.sigma_policy
    }

    /// The unique `T` built from `args`, constructing it on first request.
    pub fn obtain<T: Registered>(&self, args: impl Into<T::Args>) -> RwgtResult<Arc<T>> {
        let args = args.into();
        let identity = CalculatorIdentity::of::<T>(&args);

        if let Some(found) = self.lookup::<T>(&identity, &args)? {
            debug!(identity = %identity, "Registry hit");
            return Ok(found);
        }

        let _creating = self.creation.lock();
        // Another thread may have finished building it while we waited.
        if let Some(found) = self.lookup::<T>(&identity, &args)? {
            return Ok(found);
        }

        let built = {
            let _marker = ConstructionMarker::enter(&self.in_construction, &identity)?;
            T::construct(&args, self)
        };

        let instance = Arc::new(built?);
        let handle = T::into_handle(instance.clone());
        info!(identity = %identity, name = handle.name(), args = ?args, "Registered calculator");

        let mut state = self.state.write();
        state.order.push(identity.clone());
        state.entries.insert(
            identity,
            Entry {
                args: Box::new(args),
                instance: instance.clone(),
                handle,
            },
        );
        Ok(instance)
    }

    fn lookup<T: Registered>(
        &self,
        identity: &CalculatorIdentity,
        args: &T::Args,
    ) -> RwgtResult<Option<Arc<T>>> {
        let state = self.state.read();
        let Some(entry) = state.entries.get(identity) else {
            return Ok(None);
        };

        let collision = || RwgtError::RegistryCollision {
            identity: identity.to_string(),
        };
        if entry.args.downcast_ref::<T::Args>() != Some(args) {
            return Err(collision());
        }
        entry
            .instance
            .clone()
            .downcast::<T>()
            .map(Some)
            .map_err(|_| collision())
    }

    /// Like [`obtain`](Self::obtain), as a generator trait object.
    pub fn weighter<T>(&self, args: impl Into<T::Args>) -> RwgtResult<Arc<dyn WeightGenerator>>
    where
        T: Registered + WeightGenerator,
    {
        Ok(self.obtain::<T>(args)?)
    }

    /// Like [`obtain`](Self::obtain), as a knob trait object.
    pub fn knob<T>(&self, args: impl Into<T::Args>) -> RwgtResult<Arc<dyn SystKnob>>
    where
        T: Registered + SystKnob,
    {
        Ok(self.obtain::<T>(args)?)
    }

    /// The stored-table knob for `knob` with this registry's sigma policy.
    pub fn stored_knob(&self, knob: ReweightKnob) -> RwgtResult<Arc<dyn SystKnob>> {
        self.knob::<StoredTableKnob>(StoredKnobArgs::from(knob))
    }

    /// First registered calculator, in registration order, with this name.
    /// Names are not unique; prefer the typed accessors where possible.
    pub fn obtain_by_name(&self, name: &str) -> Option<CalculatorHandle> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .find(|e| e.handle.name() == name)
            .map(|e| e.handle.clone())
    }

    pub fn knob_by_name(&self, name: &str) -> RwgtResult<Arc<dyn SystKnob>> {
        self.find_by_name(name, CalculatorHandle::as_knob)
            .ok_or_else(|| RwgtError::KnobNotRegistered(name.to_string()))
    }

    pub fn generator_by_name(&self, name: &str) -> Option<Arc<dyn WeightGenerator>> {
        self.find_by_name(name, CalculatorHandle::as_generator)
    }

    fn find_by_name<R>(&self, name: &str, pick: impl Fn(&CalculatorHandle) -> Option<R>) -> Option<R> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| e.handle.name() == name)
            .find_map(|e| pick(&e.handle))
    }

    /// Display names in registration order.
    pub fn names(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .map(|e| e.handle.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    /// Process-wide registry configured from the environment.
    static ref GLOBAL_REGISTRY: Registry = Registry::from_config(&EngineConfig::from_env());
}

/// The process-wide default registry.
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventRecord;
    use crate::generator::{GeneratorSupport, StoredSupport};
    use crate::rwgt::{GeneratorInfo, KnobInfo};
    use crate::utils::InputVals;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Constructions of `Scale(3)`; only one test uses that argument.
    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Scale {
        info: GeneratorInfo,
        factor: u32,
    }

    impl WeightGenerator for Scale {
        fn info(&self) -> &GeneratorInfo {
            &self.info
        }

        fn calc_weight(&self, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(f64::from(self.factor))
        }
    }

    impl Registered for Scale {
        type Args = u32;

        fn construct(args: &u32, _registry: &Registry) -> RwgtResult<Self> {
            if *args == 3 {
                BUILDS.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Self {
                info: GeneratorInfo::new("scale", GeneratorSupport::single(StoredSupport::GenieAllVersions)),
                factor: *args,
            })
        }

        fn into_handle(this: Arc<Self>) -> CalculatorHandle {
            CalculatorHandle::Generator(this)
        }
    }

    /// Knob that depends on a `Scale` built from the same registry.
    struct Dependent {
        info: KnobInfo,
    }

    impl SystKnob for Dependent {
        fn info(&self) -> &KnobInfo {
            &self.info
        }

        fn calc_weight(&self, _sigma: f64, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(1.0)
        }
    }

    impl Registered for Dependent {
        type Args = ();

        fn construct(_args: &(), registry: &Registry) -> RwgtResult<Self> {
            let cv = registry.weighter::<Scale>(7u32)?;
            Ok(Self {
                info: KnobInfo::new("dependent", GeneratorSupport::single(StoredSupport::GenieAllVersions))
                    .with_cv_weighters(vec![cv]),
            })
        }

        fn into_handle(this: Arc<Self>) -> CalculatorHandle {
            CalculatorHandle::Knob(this)
        }
    }

    /// Knob whose constructor asks for itself.
    struct SelfReferential;

    impl Registered for SelfReferential {
        type Args = ();

        fn construct(_args: &(), registry: &Registry) -> RwgtResult<Self> {
            registry.obtain::<SelfReferential>(())?;
            Ok(SelfReferential)
        }

        fn into_handle(_this: Arc<Self>) -> CalculatorHandle {
            unreachable!("never successfully constructed")
        }
    }

    static PANICKED: AtomicBool = AtomicBool::new(false);

    /// Generator whose first construction panics.
    struct Flaky {
        info: GeneratorInfo,
    }

    impl WeightGenerator for Flaky {
        fn info(&self) -> &GeneratorInfo {
            &self.info
        }

        fn calc_weight(&self, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(1.0)
        }
    }

    impl Registered for Flaky {
        type Args = ();

        fn construct(_args: &(), _registry: &Registry) -> RwgtResult<Self> {
            if !PANICKED.swap(true, Ordering::SeqCst) {
                panic!("first construction fails");
            }
            Ok(Self {
                info: GeneratorInfo::new("flaky", GeneratorSupport::single(StoredSupport::GenieAllVersions)),
            })
        }

        fn into_handle(this: Arc<Self>) -> CalculatorHandle {
            CalculatorHandle::Generator(this)
        }
    }

    #[test]
    fn test_obtain_is_idempotent() {
        let registry = Registry::new();
        let a = registry.obtain::<Scale>(3u32).unwrap();
        let b = registry.obtain::<Scale>(3u32).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);

        let c = registry.obtain::<Scale>(4u32).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_constructor_can_obtain_dependencies() {
        let registry = Registry::new();
        let knob = registry.knob::<Dependent>(()).unwrap();
        assert_eq!(knob.info().cv_weighters.len(), 1);
        assert_eq!(registry.names(), vec!["scale".to_string(), "dependent".to_string()]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let registry = Registry::new();
        let err = registry.obtain::<SelfReferential>(()).err().unwrap();
        assert!(matches!(err, RwgtError::CyclicConstruction { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_constructor_can_be_retried() {
        let registry = Registry::new();
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| registry.obtain::<Flaky>(())));
        assert!(first.is_err());
        assert!(registry.is_empty());

        let second = registry.obtain::<Flaky>(());
        assert!(second.is_ok(), "retry failed: {:?}", second.err());
        assert_eq!(registry.names(), vec!["flaky".to_string()]);
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = Registry::new();
        registry.obtain::<Scale>(1u32).unwrap();
        registry.obtain::<Scale>(2u32).unwrap();

        let first = registry.generator_by_name("scale").unwrap();
        let ev = EventRecord {
            expect_no_weights: false,
            generator: crate::generator::Generator::Genie,
            ..Default::default()
        };
        assert_eq!(first.get_weight(&ev, &InputVals::new()).unwrap(), 1.0);

        assert!(registry.obtain_by_name("nope").is_none());
        assert!(matches!(
            registry.knob_by_name("scale"),
            Err(RwgtError::KnobNotRegistered(_))
        ));
    }

    #[test]
    fn test_stored_knob_shared_per_index() {
        let registry = Registry::new();
        let a = registry.stored_knob(ReweightKnob::MaCCQE).unwrap();
        let b = registry.stored_knob(ReweightKnob::MaCCQE).unwrap();
        let c = registry.stored_knob(ReweightKnob::MaCCRES).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.knob_by_name("MaCCQE").unwrap().name(), "MaCCQE");
    }

    #[test]
    fn test_identity_display() {
        let id = CalculatorIdentity::of::<Scale>(&3);
        let shown = id.to_string();
        assert!(shown.starts_with("Scale#"));
        assert_eq!(shown.len(), "Scale#".len() + 16);
    }

    #[test]
    fn test_concurrent_obtain_builds_once() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = registry.clone();
                std::thread::spawn(move || r.obtain::<Scale>(99u32).unwrap())
            })
            .collect();
        let built: Vec<Arc<Scale>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(built.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
