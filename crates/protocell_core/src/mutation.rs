//! Mutation engine.
//!
//! Stateless helpers over flagged genomes. Randomness always comes from the
//! caller's generator so outcomes are reproducible from a seed.

use crate::config::{MutationConfig, MutationScope};
use crate::inst_set::InstSet;
use protocell_data::{Genome, SiteFlags};
use rand::Rng;

/// Draws from Binomial(n, p) by summing geometric gaps between successes.
pub fn binomial<R: Rng>(n: usize, p: f64, rng: &mut R) -> usize {
    if n == 0 || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    let log_q = (1.0 - p).ln();
    let mut count = 0;
    let mut pos = 0usize;
    loop {
        // u in (0, 1]
        let u: f64 = 1.0 - rng.gen::<f64>();
        let gap = (u.ln() / log_q).floor();
        if !gap.is_finite() || gap >= (n - pos) as f64 {
            break;
        }
        pos += gap as usize + 1;
        count += 1;
        if pos >= n {
            break;
        }
    }
    count
}

fn chance<R: Rng>(p: f64, rng: &mut R) -> bool {
    p > 0.0 && rng.gen::<f64>() < p
}

/// Sites hit by one firing of a scoped trigger over `len` lines. `local` is
/// the triggering head's position.
pub fn scoped_sites<R: Rng>(
    scope: MutationScope,
    rate: f64,
    len: usize,
    local: usize,
    rng: &mut R,
) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    match scope {
        MutationScope::Genome => {
            if chance(rate, rng) {
                vec![rng.gen_range(0..len)]
            } else {
                Vec::new()
            }
        }
        MutationScope::Local => {
            if chance(rate, rng) {
                vec![local.min(len - 1)]
            } else {
                Vec::new()
            }
        }
        MutationScope::Global => (0..binomial(len, rate, rng))
            .map(|_| rng.gen_range(0..len))
            .collect(),
    }
}

/// Replaces the instruction at `site` with a random one and flags it.
pub fn point_mutate<R: Rng>(genome: &mut Genome, site: usize, inst_set: &InstSet, rng: &mut R) -> bool {
    if site >= genome.len() {
        return false;
    }
    match inst_set.random_instruction(rng) {
        Some(inst) => {
            genome.set(site, inst);
            genome.set_flag(site, SiteFlags::MUTATED | SiteFlags::POINT_MUT);
            true
        }
        None => false,
    }
}

fn insert_random<R: Rng>(genome: &mut Genome, site: usize, inst_set: &InstSet, rng: &mut R) -> bool {
    match inst_set.random_instruction(rng) {
        Some(inst) => {
            genome.insert(site, inst);
            genome.set_flag(site, SiteFlags::MUTATED);
            true
        }
        None => false,
    }
}

/// Per-site substitution, insertion and deletion with size clamping.
fn per_site<R: Rng>(
    genome: &mut Genome,
    rates: (f64, f64, f64),
    bounds: (usize, usize),
    inst_set: &InstSet,
    rng: &mut R,
) -> u32 {
    let (mut_prob, ins_prob, del_prob) = rates;
    let (min_size, max_size) = bounds;
    let mut total = 0;

    if mut_prob > 0.0 {
        let count = binomial(genome.len(), mut_prob, rng);
        for _ in 0..count {
            let site = rng.gen_range(0..genome.len());
            total += u32::from(point_mutate(genome, site, inst_set, rng));
        }
    }

    if ins_prob > 0.0 {
        let count = binomial(genome.len(), ins_prob, rng).min(max_size.saturating_sub(genome.len()));
        let mut sites: Vec<usize> = (0..count).map(|_| rng.gen_range(0..=genome.len())).collect();
        sites.sort_unstable();
        for &site in sites.iter().rev() {
            total += u32::from(insert_random(genome, site, inst_set, rng));
        }
    }

    if del_prob > 0.0 {
        let count = binomial(genome.len(), del_prob, rng).min(genome.len().saturating_sub(min_size));
        for _ in 0..count {
            let site = rng.gen_range(0..genome.len());
            genome.remove(site);
            total += 1;
        }
    }
    total
}

/// Divide-time mutations on a freshly extracted offspring. Returns the
/// number of mutations applied.
pub fn mutate_offspring<R: Rng>(
    child: &mut Genome,
    rates: &MutationConfig,
    bounds: (usize, usize),
    inst_set: &InstSet,
    rng: &mut R,
) -> u32 {
    let (min_size, max_size) = bounds;
    let mut total = 0;
    if child.is_empty() {
        return 0;
    }

    if chance(rates.divide_mut_prob, rng) {
        let site = rng.gen_range(0..child.len());
        total += u32::from(point_mutate(child, site, inst_set, rng));
    }
    if chance(rates.divide_ins_prob, rng) && child.len() < max_size {
        let site = rng.gen_range(0..=child.len());
        total += u32::from(insert_random(child, site, inst_set, rng));
    }
    if chance(rates.divide_del_prob, rng) && child.len() > min_size {
        let site = rng.gen_range(0..child.len());
        child.remove(site);
        total += 1;
    }

    total
        + per_site(
            child,
            (rates.div_mut_prob, rates.div_ins_prob, rates.div_del_prob),
            bounds,
            inst_set,
            rng,
        )
}

/// Independent per-site substitution sweep over the parent after divide.
pub fn mutate_parent<R: Rng>(parent: &mut Genome, rate: f64, inst_set: &InstSet, rng: &mut R) -> u32 {
    if rate <= 0.0 {
        return 0;
    }
    let mut total = 0;
    for site in 0..parent.len() {
        if chance(rate, rng) {
            total += u32::from(point_mutate(parent, site, inst_set, rng));
        }
    }
    total
}

/// Per-site mutations applied to parasite code before it leaves its host.
pub fn mutate_injected<R: Rng>(
    code: &mut Genome,
    rates: &MutationConfig,
    bounds: (usize, usize),
    inst_set: &InstSet,
    rng: &mut R,
) -> u32 {
    per_site(
        code,
        (rates.inject_mut_prob, rates.inject_ins_prob, rates.inject_del_prob),
        bounds,
        inst_set,
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Feedback;
    use protocell_data::Instruction;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn inst_set() -> InstSet {
        let mut fb = Feedback::new();
        InstSet::from_description("INST nop-A\nINST nop-B\nINST inc\nINST dec\n", &mut fb).unwrap()
    }

    #[test]
    fn test_binomial_edges() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(binomial(0, 0.5, &mut rng), 0);
        assert_eq!(binomial(10, 0.0, &mut rng), 0);
        assert_eq!(binomial(10, 1.0, &mut rng), 10);
        for _ in 0..100 {
            assert!(binomial(5, 0.9, &mut rng) <= 5);
        }
    }

    #[test]
    fn test_binomial_mean_and_variance() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (n, p, trials) = (200usize, 0.05f64, 20_000);
        let samples: Vec<f64> = (0..trials).map(|_| binomial(n, p, &mut rng) as f64).collect();
        let mean = samples.iter().sum::<f64>() / trials as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / trials as f64;
        assert!((mean - 10.0).abs() < 0.15, "mean {mean}");
        assert!((var - 9.5).abs() < 0.6, "variance {var}");
    }

    #[test]
    fn test_global_scope_hits_in_range_sites() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sites = scoped_sites(MutationScope::Global, 0.5, 20, 0, &mut rng);
        assert!(sites.iter().all(|&s| s < 20));
    }

    #[test]
    fn test_local_scope_uses_head_position() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(scoped_sites(MutationScope::Local, 1.0, 20, 7, &mut rng), vec![7]);
        assert!(scoped_sites(MutationScope::Genome, 0.0, 20, 7, &mut rng).is_empty());
    }

    #[test]
    fn test_point_mutation_flags_site() {
        let set = inst_set();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut g = Genome::filled(4, Instruction(2));
        assert!(point_mutate(&mut g, 1, &set, &mut rng));
        assert!(g.flags(1).contains(SiteFlags::MUTATED));
        assert!(g.flags(1).contains(SiteFlags::POINT_MUT));
        assert!(g.flags(0).is_empty());
    }

    #[test]
    fn test_offspring_size_clamped() {
        let set = inst_set();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let rates = MutationConfig {
            div_ins_prob: 1.0,
            ..MutationConfig::disabled()
        };
        let mut child = Genome::filled(10, Instruction(2));
        mutate_offspring(&mut child, &rates, (5, 14), &set, &mut rng);
        assert_eq!(child.len(), 14);

        let rates = MutationConfig {
            div_del_prob: 1.0,
            ..MutationConfig::disabled()
        };
        mutate_offspring(&mut child, &rates, (5, 14), &set, &mut rng);
        assert_eq!(child.len(), 5);
    }

    #[test]
    fn test_disabled_rates_leave_offspring_unchanged() {
        let set = inst_set();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut child = Genome::filled(10, Instruction(3));
        let before = child.clone();
        assert_eq!(
            mutate_offspring(&mut child, &MutationConfig::disabled(), (1, 100), &set, &mut rng),
            0
        );
        assert_eq!(child, before);
    }
}
