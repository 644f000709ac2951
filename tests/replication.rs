mod common;

use common::{HardwareBuilder, HostEvent, HEADS_ANCESTOR, SMT_ANCESTOR};
use protocell_core::config::DivideMethod;
use protocell_core::{HardwareConfig, TestCpu};
use protocell_data::FaultKind;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

#[test]
fn test_heads_ancestor_replicates_exactly() {
    let mut org = HardwareBuilder::new().with_genome(HEADS_ANCESTOR).build();
    assert_eq!(org.hardware.genome().len(), 100);

    let steps = org.run_until_divide(1000).expect("ancestor never divided");
    assert!(steps > 300, "copy loop too short: {steps}");
    assert_no_faults!(org.host);

    let child = &org.host.offspring[0];
    assert_eq!(child.genome, org.host.genome);
    assert!(child.copy_true);
    assert!(child.fertile);
    assert_eq!(child.mutations, 0);
    assert_eq!(child.copied_size, 100);
    assert_eq!(org.hardware.genome().len(), 100);
    assert!(!org.hardware.is_allocated());
}

#[test]
fn test_forced_insertion_breaks_copy_truth() {
    let mut org = HardwareBuilder::new()
        .with_genome(HEADS_ANCESTOR)
        .with_config(|c| c.mutation.divide_ins_prob = 1.0)
        .build();
    org.run_until_divide(1000).expect("ancestor never divided");
    let child = &org.host.offspring[0];
    assert_eq!(child.genome.len(), 101);
    assert_eq!(child.mutations, 1);
    assert!(!child.copy_true);
}

#[test]
fn test_fitness_test_can_revert_offspring() {
    let mut org = HardwareBuilder::new()
        .with_genome(HEADS_ANCESTOR)
        .with_config(|c| {
            c.mutation.divide_ins_prob = 1.0;
            c.fitness_test.enabled = true;
            c.fitness_test.revert_fatal = 1.0;
            c.fitness_test.revert_negative = 1.0;
            c.fitness_test.revert_neutral = 1.0;
            c.fitness_test.revert_positive = 1.0;
        })
        .build();
    org.run_until_divide(1000).expect("ancestor never divided");
    let child = &org.host.offspring[0];
    assert!(child.reverted);
    assert_eq!(child.genome, org.host.genome);
}

#[test]
fn test_parent_death_on_divide() {
    let mut org = HardwareBuilder::new().with_genome(HEADS_ANCESTOR).build();
    org.host.parent_survives = false;
    let mut last = None;
    for _ in 0..1000 {
        let report = org.step();
        if report.divided {
            last = Some(report);
            break;
        }
    }
    let report = last.expect("ancestor never divided");
    assert!(report.died);
    let tail: Vec<_> = org.host.events.iter().rev().take(2).collect();
    assert_eq!(tail[0], &HostEvent::Died);
    assert!(matches!(tail[1], HostEvent::Divide(100)));
}

#[test]
fn test_test_cpu_measures_ancestor() {
    let org = HardwareBuilder::new().with_genome(HEADS_ANCESTOR).build();
    let mut cpu = TestCpu::new(Arc::clone(&org.inst_set), &HardwareConfig::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let result = cpu.test_genome(&org.host.genome, &mut rng);
    assert!(result.divided);
    assert_eq!(result.offspring, org.host.genome);
    assert!(result.fitness > 0.0);
    assert!(result.fitness < 1.0);

    // Same genome, same measurement.
    let again = cpu.test_genome(&org.host.genome, &mut rng);
    assert_eq!(again.gestation, result.gestation);
}

#[test]
fn test_smt_ancestor_replicates_into_aux_space() {
    let mut org = HardwareBuilder::smt().with_genome(SMT_ANCESTOR).build();
    assert_eq!(org.hardware.config().divide.method, DivideMethod::Split);

    org.run_until_divide(500).expect("ancestor never divided");
    assert_no_faults!(org.host);
    let child = &org.host.offspring[0];
    assert_eq!(child.genome.len(), 13);
    assert!(child.copy_true);

    // Split resets the parent and frees the space it copied into.
    assert_eq!(org.hardware.memory(1).map(|m| m.len()), Some(1));
    assert!(org.hardware.space_label(1).is_none());
    assert_eq!(org.hardware.thread_count(), 1);

    org.run_until_divide(500).expect("second divide never happened");
    assert_eq!(org.host.offspring.len(), 2);
    assert_eq!(org.host.offspring[1].genome, org.host.genome);
}

#[test]
fn test_divide_from_genome_space_faults() {
    let mut org = HardwareBuilder::smt()
        .with_names(&["h-divide", "nop-A", "nop-A", "nop-A", "nop-A", "nop-A", "nop-A", "nop-A"])
        .build();
    org.step();
    assert_fault!(org.host, FaultKind::DivideSpace);
    assert!(org.host.offspring.is_empty());
}

#[test]
fn test_allocate_twice_faults() {
    let mut names = vec!["h-alloc", "h-alloc"];
    names.resize(20, "nop-A");
    let mut org = HardwareBuilder::new().with_names(&names).build();
    org.step();
    assert_eq!(org.hardware.genome().len(), 60);
    org.step();
    assert_fault!(org.host, FaultKind::AllocateAlreadyDone);
    assert_eq!(org.hardware.genome().len(), 60);
}
