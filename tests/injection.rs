mod common;

use common::{HardwareBuilder, Organism};
use protocell_core::{CodeLabel, Hardware, InjectHost};
use protocell_data::{FaultKind, SiteFlags};

/// Copies itself into a space bound to label A and injects the copy under
/// label B instead of dividing.
const PARASITE: &[&str] = &[
    "mem-set", "nop-A", "mov-head", "nop-C", "h-search", "h-copy", "if-label", "nop-C", "nop-A",
    "inject", "nop-B", "mov-head", "nop-A", "nop-B",
];

fn parasite() -> Organism {
    HardwareBuilder::smt().with_names(PARASITE).build()
}

fn victim(org: &Organism) -> Hardware {
    let genome = org.inst_set.parse_sequence(&"inc\n".repeat(10)).unwrap();
    org.sibling(&genome)
}

fn run_until_injection(org: &mut Organism, limit: u64) -> bool {
    for _ in 0..limit {
        org.step();
        if org.hardware.metrics().injections() > 0 {
            return true;
        }
    }
    false
}

#[test]
fn test_parasite_moves_into_neighbor() {
    let mut org = parasite();
    org.host.neighbor = Some(victim(&org));

    assert!(run_until_injection(&mut org, 500), "parasite never injected");
    assert_no_faults!(org.host);

    let target = org.host.neighbor.as_ref().unwrap();
    assert_eq!(target.thread_count(), 2);
    assert_eq!(target.space_label(1), Some(&CodeLabel::from_nops(&[1])));
    let space = target.memory(1).unwrap();
    assert_eq!(space.instructions(), org.host.genome.as_slice());
    assert_eq!(space.count_flag(0..space.len(), SiteFlags::INJECTED), space.len());

    // The source space is released.
    assert_eq!(org.hardware.memory(1).map(|m| m.len()), Some(1));
    assert!(org.hardware.space_label(1).is_none());
}

#[test]
fn test_injection_without_neighbor_keeps_code() {
    let mut org = parasite();
    let mut failed = false;
    for _ in 0..500 {
        org.step();
        if !org.host.faults().is_empty() {
            failed = true;
            break;
        }
    }
    assert!(failed, "inject never attempted");
    assert_fault!(org.host, FaultKind::InjectFailed);
    let copied = org.hardware.memory(1).unwrap();
    assert!(copied.len() > PARASITE.len());
    assert_eq!(&copied.instructions()[..PARASITE.len()], org.host.genome.as_slice());
}

#[test]
fn test_full_neighbor_refuses_parasite() {
    let mut org = parasite();
    let mut target = victim(&org);
    for space in 1..target.memory_spaces() {
        let label = CodeLabel::from_nops(&[2, space as u8 % 3]);
        target.inject(&label, &[protocell_data::Instruction(15)]).unwrap();
    }
    let before = target.save_state();
    org.host.neighbor = Some(target);

    for _ in 0..500 {
        org.step();
        if !org.host.faults().is_empty() {
            break;
        }
    }
    assert_fault!(org.host, FaultKind::NoFreeSpace);
    let target = org.host.neighbor.as_ref().unwrap();
    assert_eq!(target.save_state(), before);
    assert_eq!(org.hardware.metrics().injections(), 0);
}
