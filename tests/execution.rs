mod common;

use common::{HardwareBuilder, HostEvent};
use protocell_core::HeadId;
use protocell_data::{FaultKind, FaultLocation, Head};

const SMALL_SET: &str = "\
INST nop-A
INST nop-B
INST nop-C
INST inc
INST IO
INST jump-f
INST h-divide:cost=3
";

#[test]
fn test_breakpoint_reported_before_execution() {
    let mut org = HardwareBuilder::new()
        .with_inst_set(SMALL_SET)
        .with_names(&["inc", "IO", "inc", "inc"])
        .build();
    org.hardware.set_breakpoint(0, 1);
    org.step();
    org.step();
    assert_eq!(
        org.host.events,
        vec![HostEvent::Breakpoint(0, 1), HostEvent::Output(1)]
    );
    // IO leaves the input in BX.
    assert_eq!(org.hardware.operand_value(1), 7);
}

#[test]
fn test_jump_to_missing_label_faults_and_moves_on() {
    let mut org = HardwareBuilder::new()
        .with_inst_set(SMALL_SET)
        .with_names(&["jump-f", "nop-A", "inc", "inc"])
        .build();
    let report = org.step();
    assert_eq!(report.faults, 1);
    let fault = org.host.faults()[0].clone();
    assert_eq!(fault.location, FaultLocation::Jump);
    assert_eq!(fault.kind, FaultKind::LabelNotFound);
    // The label was consumed and the IP continues after it.
    assert_eq!(org.hardware.head(HeadId::Ip, 0), Some(Head::new(0, 2)));
}

#[test]
fn test_costly_instruction_holds_the_ip() {
    let mut org = HardwareBuilder::new()
        .with_inst_set(SMALL_SET)
        .with_config(|c| c.execution.require_allocate = false)
        .with_names(&["h-divide", "inc", "inc", "inc", "inc", "inc", "inc", "inc"])
        .build();
    org.step();
    org.step();
    assert_eq!(org.hardware.head(HeadId::Ip, 0), Some(Head::new(0, 0)));
    assert!(org.host.faults().is_empty());
    org.step();
    // Executed on the third tick; with both heads at 0 the whole genome
    // would go to the offspring and nothing would be left for the parent.
    assert_fault!(org.host, FaultKind::InvalidParentSize);
    assert_eq!(org.hardware.head(HeadId::Ip, 0), Some(Head::new(0, 1)));
}
