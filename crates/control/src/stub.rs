//! Deterministic stand-in problem domain.
//!
//! [`StubDomain`] honours the [`ProblemDomain`] contract for any
//! [`DomainKind`] without solving anything: solutions are short integer
//! vectors, the objective is their sum (lower is better), and the four
//! heuristics are one-liners. It exists so the control plane, its transports,
//! and client code can be exercised end to end without a solver library.
//!
//! Everything is driven by a [`StdRng`] seeded from the session seed, so equal
//! seeds replay identical call sequences identically.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    CapabilityError, DomainFactory, DomainKind, HeuristicId, HeuristicType, InstanceIndex,
    ProblemDomain, Seed, SlotIndex,
};

const INSTANCE_COUNT: usize = 5;
const GENE_MAX: u32 = 9;
const DEFAULT_PARAMETER: f64 = 0.2;

/// Heuristic table: the id is the index.
const HEURISTICS: [HeuristicType; 4] = [
    HeuristicType::Mutation,
    HeuristicType::LocalSearch,
    HeuristicType::RuinRecreate,
    HeuristicType::Crossover,
];

const MUTATION: usize = 0;
const LOCAL_SEARCH: usize = 1;
const RUIN_RECREATE: usize = 2;
const CROSSOVER: usize = 3;

/// [`DomainFactory`] producing [`StubDomain`] instances of one kind.
#[derive(Debug, Clone, Copy)]
pub struct StubFactory {
    kind: DomainKind,
}

impl StubFactory {
    pub fn new(kind: DomainKind) -> Self {
        Self { kind }
    }
}

impl DomainFactory for StubFactory {
    fn kind(&self) -> DomainKind {
        self.kind
    }

    fn create(&self, seed: Seed) -> Box<dyn ProblemDomain> {
        Box::new(StubDomain::new(self.kind, seed))
    }
}

type Genes = Vec<u32>;

/// See the module documentation.
#[derive(Debug)]
pub struct StubDomain {
    kind: DomainKind,
    seed: Seed,
    rng: StdRng,
    instance: usize,
    memory: Vec<Option<Genes>>,
    depth_of_search: f64,
    intensity_of_mutation: f64,
    best: Option<(f64, Genes)>,
    calls: [u64; HEURISTICS.len()],
    millis: [u64; HEURISTICS.len()],
}

impl StubDomain {
    pub fn new(kind: DomainKind, seed: Seed) -> Self {
        Self {
            kind,
            seed,
            // Reinterpreting the bits keeps negative seeds distinct.
            rng: StdRng::seed_from_u64(seed.as_i64() as u64),
            instance: 0,
            memory: Vec::new(),
            depth_of_search: DEFAULT_PARAMETER,
            intensity_of_mutation: DEFAULT_PARAMETER,
            best: None,
            calls: [0; HEURISTICS.len()],
            millis: [0; HEURISTICS.len()],
        }
    }

    fn genome_len(&self) -> usize {
        8 + 2 * self.instance
    }

    fn objective(genes: &[u32]) -> f64 {
        genes.iter().map(|&g| f64::from(g)).sum()
    }

    fn check_slot(&self, slot: SlotIndex) -> Result<usize, CapabilityError> {
        let index = slot.as_usize();
        if index < self.memory.len() {
            Ok(index)
        } else {
            Err(CapabilityError::InvalidSlot {
                slot: index,
                memory_size: self.memory.len(),
            })
        }
    }

    fn solution(&self, slot: SlotIndex) -> Result<&Genes, CapabilityError> {
        let index = self.check_slot(slot)?;
        self.memory[index]
            .as_ref()
            .ok_or(CapabilityError::InvalidSlot {
                slot: index,
                memory_size: self.memory.len(),
            })
    }

    fn check_heuristic(&self, heuristic: HeuristicId) -> Result<usize, CapabilityError> {
        let index = heuristic.as_usize();
        if index < HEURISTICS.len() {
            Ok(index)
        } else {
            Err(CapabilityError::InvalidHeuristic {
                heuristic: index,
                available: HEURISTICS.len(),
            })
        }
    }

    fn check_parameter(value: f64) -> Result<f64, CapabilityError> {
        if value.is_finite() {
            Ok(value.clamp(0.0, 1.0))
        } else {
            Err(CapabilityError::Failed {
                message: format!("parameter must be finite, got {value}"),
            })
        }
    }

    fn store(&mut self, destination: usize, genes: Genes) -> f64 {
        let value = Self::objective(&genes);
        if self.best.as_ref().map_or(true, |(best, _)| value < *best) {
            self.best = Some((value, genes.clone()));
        }
        self.memory[destination] = Some(genes);
        value
    }

    fn random_gene(&mut self) -> u32 {
        self.rng.random_range(0..=GENE_MAX)
    }

    fn mutate(&mut self, mut genes: Genes) -> Genes {
        let count = 1 + (self.intensity_of_mutation * genes.len() as f64) as usize;
        for _ in 0..count {
            let at = self.rng.random_range(0..genes.len());
            genes[at] = self.random_gene();
        }
        genes
    }

    fn improve(&self, mut genes: Genes) -> Genes {
        let steps = 1 + (self.depth_of_search * genes.len() as f64) as usize;
        for _ in 0..steps {
            if let Some(max) = genes.iter_mut().max() {
                *max = max.saturating_sub(1);
            }
        }
        genes
    }

    fn ruin_and_recreate(&mut self, mut genes: Genes) -> Genes {
        let width = (1 + (self.intensity_of_mutation * genes.len() as f64) as usize / 2).min(genes.len());
        let start = self.rng.random_range(0..=genes.len() - width);
        for at in start..start + width {
            genes[at] = self.random_gene();
        }
        genes
    }

    fn crossover(&mut self, first: &[u32], second: &[u32]) -> Genes {
        let cut = self.rng.random_range(0..=first.len());
        first[..cut].iter().chain(&second[cut..]).copied().collect()
    }

    fn run_heuristic(
        &mut self,
        heuristic: usize,
        first: Genes,
        second: Option<Genes>,
    ) -> Genes {
        match heuristic {
            MUTATION => self.mutate(first),
            LOCAL_SEARCH => self.improve(first),
            RUIN_RECREATE => self.ruin_and_recreate(first),
            // With a single parent, crossover degenerates to a copy.
            CROSSOVER => match second {
                Some(second) => self.crossover(&first, &second),
                None => first,
            },
            _ => first,
        }
    }

    fn timed_apply(
        &mut self,
        heuristic: usize,
        first: Genes,
        second: Option<Genes>,
        destination: usize,
    ) -> f64 {
        let started = Instant::now();
        let genes = self.run_heuristic(heuristic, first, second);
        let value = self.store(destination, genes);
        self.calls[heuristic] += 1;
        self.millis[heuristic] += u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        value
    }

    fn render(genes: &[u32]) -> String {
        let body: Vec<String> = genes.iter().map(u32::to_string).collect();
        format!("[{}]", body.join(" "))
    }

    fn ids_where(predicate: impl Fn(HeuristicType) -> bool) -> Vec<HeuristicId> {
        HEURISTICS
            .iter()
            .enumerate()
            .filter(|(_, t)| predicate(**t))
            .map(|(id, _)| HeuristicId::new(id))
            .collect()
    }
}

impl ProblemDomain for StubDomain {
    fn set_memory_size(&mut self, size: usize) -> Result<(), CapabilityError> {
        self.memory.resize(size, None);
        Ok(())
    }

    fn number_of_instances(&self) -> usize {
        INSTANCE_COUNT
    }

    fn load_instance(&mut self, index: InstanceIndex) -> Result<(), CapabilityError> {
        let instance = index.as_usize();
        if instance >= INSTANCE_COUNT {
            return Err(CapabilityError::InvalidInstance {
                instance,
                available: INSTANCE_COUNT,
            });
        }
        self.instance = instance;
        self.memory.iter_mut().for_each(|slot| *slot = None);
        self.best = None;
        Ok(())
    }

    fn depth_of_search(&self) -> f64 {
        self.depth_of_search
    }

    fn set_depth_of_search(&mut self, value: f64) -> Result<(), CapabilityError> {
        self.depth_of_search = Self::check_parameter(value)?;
        Ok(())
    }

    fn intensity_of_mutation(&self) -> f64 {
        self.intensity_of_mutation
    }

    fn set_intensity_of_mutation(&mut self, value: f64) -> Result<(), CapabilityError> {
        self.intensity_of_mutation = Self::check_parameter(value)?;
        Ok(())
    }

    fn heuristic_call_record(&self) -> Vec<u64> {
        self.calls.to_vec()
    }

    fn heuristic_call_time_record(&self) -> Vec<u64> {
        self.millis.to_vec()
    }

    fn heuristics_of_type(&self, heuristic_type: HeuristicType) -> Option<Vec<HeuristicId>> {
        let ids = Self::ids_where(|t| t == heuristic_type);
        if ids.is_empty() {
            None
        } else {
            Some(ids)
        }
    }

    fn heuristics_using_intensity_of_mutation(&self) -> Option<Vec<HeuristicId>> {
        Some(Self::ids_where(|t| {
            matches!(t, HeuristicType::Mutation | HeuristicType::RuinRecreate)
        }))
    }

    fn heuristics_using_depth_of_search(&self) -> Option<Vec<HeuristicId>> {
        Some(Self::ids_where(|t| t == HeuristicType::LocalSearch))
    }

    fn number_of_heuristics(&self) -> usize {
        HEURISTICS.len()
    }

    fn apply_heuristic(
        &mut self,
        heuristic: HeuristicId,
        source: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, CapabilityError> {
        let heuristic = self.check_heuristic(heuristic)?;
        let parent = self.solution(source)?.clone();
        let destination = self.check_slot(destination)?;
        Ok(self.timed_apply(heuristic, parent, None, destination))
    }

    fn apply_heuristic_pair(
        &mut self,
        heuristic: HeuristicId,
        first: SlotIndex,
        second: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, CapabilityError> {
        let heuristic = self.check_heuristic(heuristic)?;
        let first = self.solution(first)?.clone();
        let second = self.solution(second)?.clone();
        let destination = self.check_slot(destination)?;
        Ok(self.timed_apply(heuristic, first, Some(second), destination))
    }

    fn initialise_solution(&mut self, slot: SlotIndex) -> Result<(), CapabilityError> {
        let index = self.check_slot(slot)?;
        let genes: Genes = (0..self.genome_len()).map(|_| self.random_gene()).collect();
        self.store(index, genes);
        Ok(())
    }

    fn best_solution_to_string(&self) -> String {
        match &self.best {
            Some((_, genes)) => Self::render(genes),
            None => "no solution evaluated yet".to_string(),
        }
    }

    fn best_solution_value(&self) -> f64 {
        self.best.as_ref().map_or(f64::MAX, |(value, _)| *value)
    }

    fn copy_solution(&mut self, source: SlotIndex, destination: SlotIndex) -> Result<(), CapabilityError> {
        let genes = self.solution(source)?.clone();
        let destination = self.check_slot(destination)?;
        self.memory[destination] = Some(genes);
        Ok(())
    }

    fn solution_to_string(&self, slot: SlotIndex) -> Result<String, CapabilityError> {
        self.solution(slot).map(|genes| Self::render(genes))
    }

    fn function_value(&self, slot: SlotIndex) -> Result<f64, CapabilityError> {
        self.solution(slot).map(|genes| Self::objective(genes))
    }

    fn compare_solutions(&self, first: SlotIndex, second: SlotIndex) -> Result<bool, CapabilityError> {
        Ok(self.solution(first)? == self.solution(second)?)
    }

    fn describe(&self) -> String {
        format!(
            "{} stand-in (seed {}, instance {})",
            self.kind, self.seed, self.instance
        )
    }
}
