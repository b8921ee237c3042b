//! The problem-domain capability contract.
//!
//! A [`ProblemDomain`] is an externally supplied solver that owns its own
//! solution memory. The control plane never looks inside it: it only forwards
//! calls and hands results back unchanged.
//!
//! A [`DomainFactory`] builds fresh, independently seeded instances of one
//! [`DomainKind`]. Factories are collected in a [`crate::DomainCatalog`].

use crate::{CapabilityError, DomainKind, HeuristicId, HeuristicType, InstanceIndex, Seed, SlotIndex};

/// Operations every problem domain exposes.
///
/// Implementations are driven from one thread at a time (the registry guards
/// each handle with a mutex) but may move between threads, hence `Send`.
///
/// Getters that answer "which heuristics" return `None` when the domain has
/// no answer; the dispatcher normalises that to an empty list.
pub trait ProblemDomain: Send {
    /// Resizes the solution memory to `size` slots.
    fn set_memory_size(&mut self, size: usize) -> Result<(), CapabilityError>;

    /// Number of bundled instances this domain can load.
    fn number_of_instances(&self) -> usize;

    /// Loads instance `index`, replacing any previously loaded instance.
    fn load_instance(&mut self, index: InstanceIndex) -> Result<(), CapabilityError>;

    fn depth_of_search(&self) -> f64;

    fn set_depth_of_search(&mut self, value: f64) -> Result<(), CapabilityError>;

    fn intensity_of_mutation(&self) -> f64;

    fn set_intensity_of_mutation(&mut self, value: f64) -> Result<(), CapabilityError>;

    /// Invocation count per heuristic, indexed by heuristic id.
    fn heuristic_call_record(&self) -> Vec<u64>;

    /// Cumulative running time per heuristic in milliseconds.
    fn heuristic_call_time_record(&self) -> Vec<u64>;

    fn heuristics_of_type(&self, heuristic_type: HeuristicType) -> Option<Vec<HeuristicId>>;

    fn heuristics_using_intensity_of_mutation(&self) -> Option<Vec<HeuristicId>>;

    fn heuristics_using_depth_of_search(&self) -> Option<Vec<HeuristicId>>;

    fn number_of_heuristics(&self) -> usize;

    /// Applies a single-parent heuristic to `source`, writing the result to
    /// `destination`. Returns the objective value of the new solution.
    fn apply_heuristic(
        &mut self,
        heuristic: HeuristicId,
        source: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, CapabilityError>;

    /// Applies a two-parent heuristic (e.g. crossover).
    fn apply_heuristic_pair(
        &mut self,
        heuristic: HeuristicId,
        first: SlotIndex,
        second: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, CapabilityError>;

    /// Seeds `slot` with a freshly constructed candidate.
    fn initialise_solution(&mut self, slot: SlotIndex) -> Result<(), CapabilityError>;

    fn best_solution_to_string(&self) -> String;

    fn best_solution_value(&self) -> f64;

    fn copy_solution(&mut self, source: SlotIndex, destination: SlotIndex) -> Result<(), CapabilityError>;

    fn solution_to_string(&self, slot: SlotIndex) -> Result<String, CapabilityError>;

    fn function_value(&self, slot: SlotIndex) -> Result<f64, CapabilityError>;

    /// Domain-defined equivalence of two slots.
    fn compare_solutions(&self, first: SlotIndex, second: SlotIndex) -> Result<bool, CapabilityError>;

    /// Human-readable name of the domain and loaded instance.
    fn describe(&self) -> String;
}

/// Constructs fresh [`ProblemDomain`] instances of one kind.
pub trait DomainFactory: Send + Sync {
    /// The kind this factory produces.
    fn kind(&self) -> DomainKind;

    /// Builds a new instance seeded with `seed`.
    fn create(&self, seed: Seed) -> Box<dyn ProblemDomain>;
}

/// Adapts a plain constructor function into a [`DomainFactory`].
///
/// ```rust,ignore
/// catalog.register(FnFactory::new(DomainKind::Sat, |seed| Box::new(MySat::new(seed))));
/// ```
pub struct FnFactory<F> {
    kind: DomainKind,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(Seed) -> Box<dyn ProblemDomain> + Send + Sync,
{
    pub fn new(kind: DomainKind, build: F) -> Self {
        Self { kind, build }
    }
}

impl<F> DomainFactory for FnFactory<F>
where
    F: Fn(Seed) -> Box<dyn ProblemDomain> + Send + Sync,
{
    fn kind(&self) -> DomainKind {
        self.kind
    }

    fn create(&self, seed: Seed) -> Box<dyn ProblemDomain> {
        (self.build)(seed)
    }
}
