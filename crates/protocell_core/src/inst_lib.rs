//! The instruction library: every opcode the hardware knows how to execute,
//! with its static metadata. Instruction sets select and price a subset.

/// How an instruction interprets the no-ops that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierRole {
    /// Not modifiable.
    None,
    /// A following no-op selects the operand (register or stack).
    Operand,
    /// A following no-op selects the head.
    Head,
    /// The following run of no-ops is read as a label.
    Label,
    /// The instruction is itself a no-op and acts as a modifier.
    Nop,
}

/// Closed set of opcodes; dispatch is a `match` on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    NopA,
    NopB,
    NopC,
    NopD,
    NopX,
    IfNEqu,
    IfEqu,
    IfLess,
    IfGrt,
    IfLabel,
    MovHead,
    JmpHead,
    GetHead,
    SetFlow,
    AdvHead,
    JumpF,
    JumpB,
    JumpSelf,
    ShiftR,
    ShiftL,
    Inc,
    Dec,
    Zero,
    Not,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Nand,
    Push,
    Pop,
    SwapStk,
    Swap,
    HAlloc,
    HDivide,
    HCopy,
    HRead,
    HWrite,
    HSearch,
    MemSet,
    Inject,
    ReadCode,
    Io,
    ForkThread,
    KillThread,
    ThreadId,
}

struct OpcodeInfo {
    opcode: Opcode,
    name: &'static str,
    role: ModifierRole,
    description: &'static str,
}

const fn info(
    opcode: Opcode,
    name: &'static str,
    role: ModifierRole,
    description: &'static str,
) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        name,
        role,
        description,
    }
}

use ModifierRole as R;

static LIBRARY: &[OpcodeInfo] = &[
    info(Opcode::NopA, "nop-A", R::Nop, "No-op; modifier value 0"),
    info(Opcode::NopB, "nop-B", R::Nop, "No-op; modifier value 1"),
    info(Opcode::NopC, "nop-C", R::Nop, "No-op; modifier value 2"),
    info(Opcode::NopD, "nop-D", R::Nop, "No-op; modifier value 3"),
    info(Opcode::NopX, "nop-X", R::None, "True no-op; never part of a label"),
    info(Opcode::IfNEqu, "if-n-equ", R::Operand, "Execute next if ?BX? != its successor"),
    info(Opcode::IfEqu, "if-equ", R::Operand, "Execute next if ?BX? == its successor"),
    info(Opcode::IfLess, "if-less", R::Operand, "Execute next if ?BX? < its successor"),
    info(Opcode::IfGrt, "if-grt", R::Operand, "Execute next if ?BX? > its successor"),
    info(Opcode::IfLabel, "if-label", R::Label, "Execute next if the complement label was just copied"),
    info(Opcode::MovHead, "mov-head", R::Head, "Move ?IP? to the flow head"),
    info(Opcode::JmpHead, "jmp-head", R::Head, "Move ?IP? by CX"),
    info(Opcode::GetHead, "get-head", R::Head, "CX = position of ?IP?"),
    info(Opcode::SetFlow, "set-flow", R::Operand, "Flow head = ?CX?"),
    info(Opcode::AdvHead, "adv-head", R::Head, "Advance ?write? by one"),
    info(Opcode::JumpF, "jump-f", R::Label, "Jump forward to the complement label"),
    info(Opcode::JumpB, "jump-b", R::Label, "Jump backward to the complement label"),
    info(Opcode::JumpSelf, "jump-slf", R::Label, "Jump to the exact complement label anywhere"),
    info(Opcode::ShiftR, "shift-r", R::Operand, "?BX? >>= 1"),
    info(Opcode::ShiftL, "shift-l", R::Operand, "?BX? <<= 1"),
    info(Opcode::Inc, "inc", R::Operand, "?BX? += 1"),
    info(Opcode::Dec, "dec", R::Operand, "?BX? -= 1"),
    info(Opcode::Zero, "zero", R::Operand, "?BX? = 0"),
    info(Opcode::Not, "not", R::Operand, "?BX? = !?BX?"),
    info(Opcode::Add, "add", R::Operand, "?BX? = BX + CX"),
    info(Opcode::Sub, "sub", R::Operand, "?BX? = BX - CX"),
    info(Opcode::Mult, "mult", R::Operand, "?BX? = BX * CX"),
    info(Opcode::Div, "div", R::Operand, "?BX? = BX / CX"),
    info(Opcode::Mod, "mod", R::Operand, "?BX? = BX % CX"),
    info(Opcode::Nand, "nand", R::Operand, "?BX? = BX nand CX"),
    info(Opcode::Push, "push", R::Operand, "Push ?BX? onto the current stack"),
    info(Opcode::Pop, "pop", R::Operand, "Pop the current stack into ?BX?"),
    info(Opcode::SwapStk, "swap-stk", R::None, "Toggle the current stack"),
    info(Opcode::Swap, "swap", R::Operand, "Swap ?AX? with its successor"),
    info(Opcode::HAlloc, "h-alloc", R::None, "Allocate offspring memory; AX = old size"),
    info(Opcode::HDivide, "h-divide", R::None, "Divide off the offspring"),
    info(Opcode::HCopy, "h-copy", R::None, "Copy from the read head to the write head"),
    info(Opcode::HRead, "h-read", R::Head, "BX = instruction under ?read?, then advance it"),
    info(Opcode::HWrite, "h-write", R::Head, "Write BX at ?write?, then advance it"),
    info(Opcode::HSearch, "h-search", R::Label, "Find the complement label; flow head after it"),
    info(Opcode::MemSet, "mem-set", R::Label, "Bind a memory space to the label; flow head to it"),
    info(Opcode::Inject, "inject", R::None, "Transplant code up to the write head into a neighbor"),
    info(Opcode::ReadCode, "read-code", R::Operand, "?BX? = code of the instruction under the read head"),
    info(Opcode::Io, "IO", R::Operand, "Output ?BX?, then read input into it"),
    info(Opcode::ForkThread, "fork-th", R::None, "Start a copy of this thread after the next line"),
    info(Opcode::KillThread, "kill-th", R::None, "Stop the current thread"),
    info(Opcode::ThreadId, "id-th", R::Operand, "?BX? = thread id"),
];

impl Opcode {
    fn info(self) -> &'static OpcodeInfo {
        // LIBRARY is declared in enum order.
        &LIBRARY[self as usize]
    }

    /// All opcodes, in library order.
    pub fn all() -> impl Iterator<Item = Opcode> {
        LIBRARY.iter().map(|i| i.opcode)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.info().name
    }

    #[must_use]
    pub fn role(self) -> ModifierRole {
        self.info().role
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        self.info().description
    }

    /// Label-forming no-op.
    #[must_use]
    pub fn is_nop(self) -> bool {
        self.role() == ModifierRole::Nop
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Opcode> {
        LIBRARY.iter().find(|i| i.name == name).map(|i| i.opcode)
    }

    /// Library name closest to `name` by edit distance.
    #[must_use]
    pub fn nearest_name(name: &str) -> Option<&'static str> {
        LIBRARY
            .iter()
            .map(|i| (edit_distance(name, i.name), i.name))
            .min_by_key(|(d, _)| *d)
            .map(|(_, n)| n)
    }
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let subst = prev[j] + usize::from(ca != *cb);
            cur[j + 1] = subst.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_is_in_enum_order() {
        for (idx, op) in Opcode::all().enumerate() {
            assert_eq!(op as usize, idx, "{} out of order", op.name());
        }
    }

    #[test]
    fn test_name_lookup_roundtrip() {
        for op in Opcode::all() {
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
        assert_eq!(Opcode::from_name("h-cpy"), None);
    }

    #[test]
    fn test_only_labelled_nops_are_nops() {
        assert!(Opcode::NopA.is_nop());
        assert!(Opcode::NopD.is_nop());
        assert!(!Opcode::NopX.is_nop());
        assert!(!Opcode::HCopy.is_nop());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("inc", "inc"), 0);
    }

    #[test]
    fn test_nearest_name() {
        assert_eq!(Opcode::nearest_name("h-cpy"), Some("h-copy"));
        assert_eq!(Opcode::nearest_name("if-labl"), Some("if-label"));
    }
}
