use bandgap_models::{HyperparameterSpace, ParamSet};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Draws candidate parameter sets from a grid-shaped space.
///
/// When the grid holds no more than `n_iter` combinations every combination
/// is returned in grid order; otherwise `n_iter` distinct combinations are
/// drawn without replacement from a generator seeded with `random_state`.
#[derive(Debug, Clone)]
pub struct ParameterSampler<'a> {
    pub space: &'a HyperparameterSpace,
    pub n_iter: usize,
    pub random_state: u64,
}

impl<'a> ParameterSampler<'a> {
    pub fn new(space: &'a HyperparameterSpace, n_iter: usize, random_state: u64) -> Self {
        ParameterSampler {
            space,
            n_iter,
            random_state,
        }
    }

    pub fn candidates(&self) -> Vec<ParamSet> {
        let total = self.space.grid_len();
        let indices: Vec<usize> = if total <= self.n_iter {
            (0..total).collect()
        } else {
            let mut rng = StdRng::seed_from_u64(self.random_state);
            rand::seq::index::sample(&mut rng, total, self.n_iter).into_vec()
        };
        indices
            .into_iter()
            .filter_map(|i| self.space.combination(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgap_models::{default_search_space, ModelFamily, ParamValue, Task};

    #[test]
    fn test_small_grid_is_exhaustive() {
        let space = HyperparameterSpace::new()
            .with("a", vec![ParamValue::Int(1), ParamValue::Int(2)])
            .with("b", vec![ParamValue::Int(3)]);
        let c = ParameterSampler::new(&space, 20, 42).candidates();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0], space.combination(0).unwrap());
    }

    #[test]
    fn test_large_grid_draws_distinct_seeded_candidates() {
        let space = default_search_space(ModelFamily::RandomForest, Task::Classification);
        let a = ParameterSampler::new(&space, 20, 42).candidates();
        let b = ParameterSampler::new(&space, 20, 42).candidates();
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
        for i in 0..a.len() {
            for j in i + 1..a.len() {
                assert_ne!(a[i], a[j]);
            }
        }
    }

    #[test]
    fn test_empty_space_has_no_candidates() {
        let space = HyperparameterSpace::new();
        assert!(ParameterSampler::new(&space, 10, 0).candidates().is_empty());
    }
}
