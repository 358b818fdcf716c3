//! Fills in whatever generation constraints the caller left unset.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::{
    Domain, ALLERGIES, CUISINES, DIET_REQUIREMENTS, DISH_TYPES, MAX_COOKING_MINUTES, SERVINGS,
};
use crate::models::{CompletedConstraints, RecipeConstraints};

/// Complete `constraints` using the calling thread's generator.
pub fn fill_constraints(constraints: RecipeConstraints, use_weights: bool) -> CompletedConstraints {
    fill_constraints_with(constraints, use_weights, &mut rand::thread_rng())
}

/// Complete `constraints` with an explicit generator. Fields already set are kept untouched.
pub fn fill_constraints_with<R: Rng + ?Sized>(
    constraints: RecipeConstraints,
    use_weights: bool,
    rng: &mut R,
) -> CompletedConstraints {
    let completed = CompletedConstraints {
        servings: constraints
            .servings
            .unwrap_or_else(|| *pick_one(&SERVINGS, use_weights, rng)),
        dish_type: constraints
            .dish_type
            .unwrap_or_else(|| pick_one(&DISH_TYPES, use_weights, rng).to_string()),
        max_cooking_minutes: constraints
            .max_cooking_minutes
            .unwrap_or_else(|| *pick_one(&MAX_COOKING_MINUTES, use_weights, rng)),
        allergies: constraints
            .allergies
            .unwrap_or_else(|| pick_subset(&ALLERGIES, use_weights, rng)),
        diet_requirements: constraints
            .diet_requirements
            .unwrap_or_else(|| pick_subset(&DIET_REQUIREMENTS, use_weights, rng)),
        cuisines: constraints
            .cuisines
            .unwrap_or_else(|| pick_subset(&CUISINES, use_weights, rng)),
    };
    debug!(?completed, use_weights, "constraints completed");
    completed
}

fn pick_one<'d, T: 'static, R: Rng + ?Sized>(
    domain: &'d Domain<T>,
    use_weights: bool,
    rng: &mut R,
) -> &'d T {
    let index = if use_weights {
        match WeightedIndex::new(domain.entries.iter().map(|(_, weight)| *weight)) {
            Ok(distribution) => distribution.sample(rng),
            Err(_) => rng.gen_range(0..domain.len()),
        }
    } else {
        rng.gen_range(0..domain.len())
    };
    &domain.entries[index].0
}

/// Subset of uniformly drawn size in `0..=len`, without replacement.
fn pick_subset<R: Rng + ?Sized>(
    domain: &Domain<&'static str>,
    use_weights: bool,
    rng: &mut R,
) -> Vec<String> {
    let size = rng.gen_range(0..=domain.len());
    if use_weights {
        let weights = domain.normalized_weights();
        let indices: Vec<usize> = (0..domain.len()).collect();
        if let Ok(chosen) = indices.choose_multiple_weighted(rng, size, |&i| weights[i]) {
            return chosen.map(|&i| domain.entries[i].0.to_string()).collect();
        }
    }
    domain
        .entries
        .choose_multiple(rng, size)
        .map(|(value, _)| value.to_string())
        .collect()
}
