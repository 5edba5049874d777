//! Synthetic ratio-metric experiments.
//!
//! Follows the cluster data-generating process of Deng et al. (2018),
//! *Applying the Delta Method in Metric Analytics* (§3.3). Each unit (e.g. a
//! driver) belongs to one of several behaviour types. Its denominator is a
//! Poisson count (e.g. offers) and its numerator a binomial number of
//! successes with a per-unit success probability drawn once from a normal
//! distribution and clipped to [0, 1].

use rand::distr::{Bernoulli, Uniform};
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution, Normal, Poisson};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimulationError;
use crate::table::UnitTable;

use super::impact::ExperimentImpact;

/// Pre-period numerator column.
pub const COL_Y: &str = "Y";
/// Pre-period denominator column.
pub const COL_N: &str = "N";
/// Experiment-period numerator column.
pub const COL_Y_EXP: &str = "Y_exp";
/// Experiment-period denominator column.
pub const COL_N_EXP: &str = "N_exp";
/// Treatment indicator column (1.0 treated, 0.0 control).
pub const COL_TREATMENT: &str = "treatment";
/// Behaviour type column.
pub const COL_TYPE: &str = "type";

/// Configuration of the data generator.
///
/// The per-type vectors (`type_weights`, `poisson_lams`, `mean_prob_success`,
/// `std_prob_success`) must have equal lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of units (default: 1,000).
    pub units: usize,

    /// Relative frequency of each behaviour type, normalized before use
    /// (default: [1/3, 1/2, 1/5]).
    pub type_weights: Vec<f64>,

    /// Poisson rate of the denominator per type (default: [2, 5, 30]).
    pub poisson_lams: Vec<f64>,

    /// Rate multiplier in the pre-period (default: 1.0).
    pub poisson_multi_pre: f64,

    /// Rate multiplier in the experiment period (default: 1.0).
    pub poisson_multi_exp: f64,

    /// Mean success probability per type (default: [0.3, 0.5, 0.8]).
    pub mean_prob_success: Vec<f64>,

    /// Standard deviation of the success probability per type
    /// (default: [0.05, 0.1, 0.05]).
    pub std_prob_success: Vec<f64>,

    /// RNG seed (default: 42).
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            units: 1_000,
            type_weights: vec![1.0 / 3.0, 1.0 / 2.0, 1.0 / 5.0],
            poisson_lams: vec![2.0, 5.0, 30.0],
            poisson_multi_pre: 1.0,
            poisson_multi_exp: 1.0,
            mean_prob_success: vec![0.3, 0.5, 0.8],
            std_prob_success: vec![0.05, 0.1, 0.05],
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Smaller experiments for fast tests.
    pub fn quick() -> Self {
        Self {
            units: 200,
            ..Self::default()
        }
    }

    /// Copy of this configuration with another seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    /// Number of behaviour types.
    pub fn types(&self) -> usize {
        self.type_weights.len()
    }

    /// Check parameter shapes and ranges.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let k = self.type_weights.len();
        if k == 0 {
            return Err(SimulationError::InvalidParameter(
                "at least one behaviour type is required".to_string(),
            ));
        }
        for (name, len) in [
            ("poisson_lams", self.poisson_lams.len()),
            ("mean_prob_success", self.mean_prob_success.len()),
            ("std_prob_success", self.std_prob_success.len()),
        ] {
            if len != k {
                return Err(SimulationError::LengthMismatch(format!(
                    "{} has {} entries, type_weights has {}",
                    name, len, k
                )));
            }
        }

        if self.units == 0 {
            return Err(SimulationError::InvalidParameter(
                "units must be positive".to_string(),
            ));
        }
        if self.type_weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || self.type_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(SimulationError::InvalidParameter(
                "type weights must be non-negative with a positive sum".to_string(),
            ));
        }
        for (name, value) in [
            ("poisson_multi_pre", self.poisson_multi_pre),
            ("poisson_multi_exp", self.poisson_multi_exp),
        ]
        .into_iter()
        .chain(self.poisson_lams.iter().map(|&l| ("poisson_lams", l)))
        {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.mean_prob_success.iter().any(|m| !(0.0..=1.0).contains(m))
            || self.std_prob_success.iter().any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(SimulationError::InvalidParameter(
                "success probability means must lie in [0, 1] and stds be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Experiment-period observations of a simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPeriod {
    /// Successes during the experiment.
    pub y_exp: u64,
    /// Trials during the experiment.
    pub n_exp: u64,
    /// Whether the unit was treated.
    pub treatment: bool,
}

/// One simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedUnit {
    /// Behaviour type index.
    pub unit_type: usize,
    /// Pre-period successes.
    pub y: u64,
    /// Pre-period trials.
    pub n: u64,
    /// Experiment-period observations, when an impact was simulated.
    pub experiment: Option<ExperimentPeriod>,
}

/// Units produced by one call to [`RatioDataGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedData {
    /// Units ordered by behaviour type.
    pub units: Vec<SimulatedUnit>,
}

impl SimulatedData {
    /// All units as one table with columns `Y`, `N`, `type` and, when an
    /// experiment was simulated, `Y_exp`, `N_exp`, `treatment`.
    pub fn to_table(&self) -> Result<UnitTable, SimulationError> {
        let units: Vec<&SimulatedUnit> = self.units.iter().collect();
        build_table(&units)
    }

    /// Split units into `(control, treatment)` tables.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the data has no experiment period.
    pub fn split_by_arm(&self) -> Result<(UnitTable, UnitTable), SimulationError> {
        let mut control = Vec::new();
        let mut treatment = Vec::new();
        for unit in &self.units {
            let period = unit.experiment.ok_or_else(|| {
                SimulationError::InvalidParameter(
                    "data was generated without an experiment impact".to_string(),
                )
            })?;
            if period.treatment {
                treatment.push(unit);
            } else {
                control.push(unit);
            }
        }
        Ok((build_table(&control)?, build_table(&treatment)?))
    }

    /// Number of treated units.
    pub fn treated(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.experiment.is_some_and(|e| e.treatment))
            .count()
    }
}

fn build_table(units: &[&SimulatedUnit]) -> Result<UnitTable, SimulationError> {
    let mut columns: Vec<(&str, Vec<f64>)> = vec![
        (COL_Y, units.iter().map(|u| u.y as f64).collect()),
        (COL_N, units.iter().map(|u| u.n as f64).collect()),
        (COL_TYPE, units.iter().map(|u| u.unit_type as f64).collect()),
    ];

    let periods: Option<Vec<ExperimentPeriod>> = units.iter().map(|u| u.experiment).collect();
    if let Some(periods) = periods {
        columns.push((COL_Y_EXP, periods.iter().map(|p| p.y_exp as f64).collect()));
        columns.push((COL_N_EXP, periods.iter().map(|p| p.n_exp as f64).collect()));
        columns.push((
            COL_TREATMENT,
            periods
                .iter()
                .map(|p| if p.treatment { 1.0 } else { 0.0 })
                .collect(),
        ));
    }

    Ok(UnitTable::from_columns(columns)?)
}

/// Seeded generator of unit-level ratio data.
///
/// Unit types and success probabilities are drawn once at construction;
/// every call to [`generate`](Self::generate) draws fresh counts for the same
/// units.
#[derive(Debug, Clone)]
pub struct RatioDataGenerator {
    config: GeneratorConfig,
    rng: Xoshiro256PlusPlus,
    unit_types: Vec<usize>,
    prob_success: Vec<f64>,
}

impl RatioDataGenerator {
    /// Create a generator and draw unit characteristics.
    ///
    /// # Errors
    ///
    /// Any validation error of `config`.
    pub fn new(config: GeneratorConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);

        let counts = multinomial(&mut rng, config.units, &config.type_weights)?;
        let unit_types: Vec<usize> = counts
            .iter()
            .enumerate()
            .flat_map(|(t, &count)| std::iter::repeat(t).take(count))
            .collect();

        let mut prob_success = Vec::with_capacity(config.units);
        for (t, &count) in counts.iter().enumerate() {
            let dist = Normal::new(config.mean_prob_success[t], config.std_prob_success[t])
                .map_err(invalid)?;
            prob_success.extend((0..count).map(|_| dist.sample(&mut rng).clamp(0.0, 1.0)));
        }

        debug!(units = config.units, ?counts, "drew unit characteristics");

        Ok(Self {
            config,
            rng,
            unit_types,
            prob_success,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Per-unit success probabilities before any treatment.
    pub fn prob_success(&self) -> &[f64] {
        &self.prob_success
    }

    /// Per-unit behaviour types.
    pub fn unit_types(&self) -> &[usize] {
        &self.unit_types
    }

    /// Draw one dataset.
    ///
    /// Pre-period counts are always drawn. With an `impact`, each unit is
    /// assigned to treatment with the impact's proportion and experiment-period
    /// counts are drawn with treated units' success probabilities changed.
    pub fn generate(
        &mut self,
        impact: Option<&ExperimentImpact>,
    ) -> Result<SimulatedData, SimulationError> {
        let pre = draw_counts(
            &mut self.rng,
            &self.config.poisson_lams,
            self.config.poisson_multi_pre,
            &self.unit_types,
            &self.prob_success,
        )?;

        let experiment = match impact {
            Some(impact) => {
                let (prob_new, assignment) = self.experiment_changes(impact)?;
                let counts = draw_counts(
                    &mut self.rng,
                    &self.config.poisson_lams,
                    self.config.poisson_multi_exp,
                    &self.unit_types,
                    &prob_new,
                )?;
                Some(
                    counts
                        .into_iter()
                        .zip(assignment)
                        .map(|((y_exp, n_exp), treatment)| ExperimentPeriod {
                            y_exp,
                            n_exp,
                            treatment,
                        })
                        .collect::<Vec<_>>(),
                )
            }
            None => None,
        };

        let units = pre
            .into_iter()
            .enumerate()
            .map(|(i, (y, n))| SimulatedUnit {
                unit_type: self.unit_types[i],
                y,
                n,
                experiment: experiment.as_ref().map(|e| e[i]),
            })
            .collect();

        Ok(SimulatedData { units })
    }

    /// Treated success probabilities and assignments for every unit.
    fn experiment_changes(
        &mut self,
        impact: &ExperimentImpact,
    ) -> Result<(Vec<f64>, Vec<bool>), SimulationError> {
        let (low, high) = impact.change_bounds();
        let change = Uniform::new_inclusive(low, high).map_err(invalid)?;
        let assign = Bernoulli::new(impact.treatment_proportion()).map_err(invalid)?;

        let mut prob_new = Vec::with_capacity(self.prob_success.len());
        let mut assignment = Vec::with_capacity(self.prob_success.len());
        for &p in &self.prob_success {
            let pct = change.sample(&mut self.rng);
            let treated = assign.sample(&mut self.rng);
            let applied = if treated { pct } else { 0.0 };
            prob_new.push((p * (applied + 100.0) / 100.0).clamp(0.0, 1.0));
            assignment.push(treated);
        }
        Ok((prob_new, assignment))
    }
}

/// Draw `(successes, trials)` for every unit: trials are Poisson with the
/// unit type's rate, successes binomial in those trials.
fn draw_counts(
    rng: &mut Xoshiro256PlusPlus,
    poisson_lams: &[f64],
    multiplier: f64,
    unit_types: &[usize],
    prob_success: &[f64],
) -> Result<Vec<(u64, u64)>, SimulationError> {
    let rates = poisson_lams
        .iter()
        .map(|lam| Poisson::new(lam * multiplier).map_err(invalid))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(prob_success.len());
    for (&t, &p) in unit_types.iter().zip(prob_success) {
        let trials = rates[t].sample(rng) as u64;
        let successes = Binomial::new(trials, p).map_err(invalid)?.sample(rng);
        out.push((successes, trials));
    }
    Ok(out)
}

/// Split `total` units across types with probabilities proportional to
/// `weights`, via sequential conditional binomials.
fn multinomial(
    rng: &mut Xoshiro256PlusPlus,
    total: usize,
    weights: &[f64],
) -> Result<Vec<usize>, SimulationError> {
    let weight_sum: f64 = weights.iter().sum();
    let mut remaining = total as u64;
    let mut remaining_prob = 1.0;
    let mut counts = Vec::with_capacity(weights.len());

    for (i, w) in weights.iter().enumerate() {
        let p = w / weight_sum;
        let count = if i + 1 == weights.len() || remaining == 0 {
            remaining
        } else {
            let conditional = if remaining_prob > 0.0 {
                (p / remaining_prob).clamp(0.0, 1.0)
            } else {
                1.0
            };
            Binomial::new(remaining, conditional)
                .map_err(invalid)?
                .sample(rng)
        };
        counts.push(count as usize);
        remaining -= count;
        remaining_prob -= p;
    }
    Ok(counts)
}

fn invalid(err: impl std::fmt::Display) -> SimulationError {
    SimulationError::InvalidParameter(err.to_string())
}
