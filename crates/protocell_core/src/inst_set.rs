//! Instruction sets: a priced, weighted view over the instruction library.
//!
//! Description format, one directive per line:
//!
//! ```text
//! # comment
//! INST nop-A
//! INST h-copy:cost=2,prob_fail=0.01
//! INST h-divide:redundancy=0.5,inst_code=10110
//! ```
//!
//! A malformed attribute rejects only its own line. An unknown opcode name
//! or a no-op listed after a non-no-op rejects the whole set.

use crate::error::{CoreError, Feedback, Result};
use crate::inst_lib::Opcode;
use protocell_data::{Instruction, Sequence};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashMap;

/// Per-opcode attributes within one instruction set.
#[derive(Debug, Clone, PartialEq)]
pub struct InstEntry {
    pub opcode: Opcode,
    /// Steady-state cost in steps; 0 and 1 both mean a single step.
    pub cost: u32,
    /// Paid once per hardware lifetime (reset on divide) before `cost` applies.
    pub initial_cost: u32,
    pub energy_cost: f64,
    pub addl_time_cost: u32,
    pub prob_fail: f64,
    /// Mutation weight; never negative once loaded.
    pub redundancy: f64,
    pub inst_code: Option<String>,
}

impl InstEntry {
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            cost: 1,
            initial_cost: 0,
            energy_cost: 0.0,
            addl_time_cost: 0,
            prob_fail: 0.0,
            redundancy: 1.0,
            inst_code: None,
        }
    }

    /// Integer value of the bit code, most significant bit first.
    #[must_use]
    pub fn code_value(&self) -> Option<i32> {
        self.inst_code.as_ref().map(|code| {
            code.bytes()
                .fold(0i32, |acc, b| acc.wrapping_shl(1) | i32::from(b == b'1'))
        })
    }
}

#[derive(Debug, Clone)]
pub struct InstSet {
    entries: Vec<InstEntry>,
    by_name: HashMap<&'static str, usize>,
    num_nops: usize,
    code_len: Option<usize>,
    weights: Option<WeightedIndex<f64>>,
}

impl PartialEq for InstSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

enum LineError {
    Recoverable(String),
    Fatal(CoreError),
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, LineError> {
    value
        .parse::<T>()
        .map_err(|_| LineError::Recoverable(format!("invalid value '{value}' for '{key}'")))
}

impl InstSet {
    /// Builds a set from its textual description.
    pub fn from_description(text: &str, feedback: &mut Feedback) -> Result<Self> {
        let mut set = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            num_nops: 0,
            code_len: None,
            weights: None,
        };

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (directive, rest) = match line.split_once(char::is_whitespace) {
                Some((d, r)) => (d, r.trim()),
                None => (line, ""),
            };
            if directive != "INST" {
                feedback.warning(line_no, format!("ignoring unknown directive '{directive}'"));
                continue;
            }
            match set.parse_entry(rest) {
                Ok((entry, warnings)) => {
                    for w in warnings {
                        feedback.warning(line_no, w);
                    }
                    if let Err(err) = set.push(entry, line_no) {
                        feedback.error(line_no, err.to_string());
                        return Err(err);
                    }
                }
                Err(LineError::Recoverable(message)) => feedback.error(line_no, message),
                Err(LineError::Fatal(err)) => {
                    feedback.error(line_no, err.to_string());
                    return Err(err);
                }
            }
        }

        if set.entries.is_empty() {
            feedback.error(0, "instruction set is empty");
            return Err(CoreError::EmptyInstructionSet);
        }
        set.rebuild_weights();
        if set.weights.is_none() {
            feedback.warning(0, "no instruction has positive redundancy; mutations are disabled");
        }
        tracing::debug!(
            size = set.entries.len(),
            nops = set.num_nops,
            "instruction set loaded"
        );
        Ok(set)
    }

    /// Builds a set directly from entries, applying the same structural checks.
    pub fn from_entries(entries: Vec<InstEntry>) -> Result<Self> {
        let mut set = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            num_nops: 0,
            code_len: None,
            weights: None,
        };
        for (idx, mut entry) in entries.into_iter().enumerate() {
            entry.redundancy = entry.redundancy.max(0.0);
            set.push(entry, idx + 1)?;
        }
        if set.entries.is_empty() {
            return Err(CoreError::EmptyInstructionSet);
        }
        set.rebuild_weights();
        Ok(set)
    }

    fn parse_entry(&self, rest: &str) -> std::result::Result<(InstEntry, Vec<String>), LineError> {
        let mut parts = rest
            .split([':', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let name = parts
            .next()
            .ok_or_else(|| LineError::Recoverable("missing instruction name".to_string()))?;
        let opcode = Opcode::from_name(name).ok_or_else(|| {
            LineError::Fatal(CoreError::UnknownInstruction {
                name: name.to_string(),
                suggestion: Opcode::nearest_name(name).map(str::to_string),
            })
        })?;
        if self.by_name.contains_key(opcode.name()) {
            return Err(LineError::Recoverable(format!(
                "duplicate instruction '{name}'"
            )));
        }

        let mut entry = InstEntry::new(opcode);
        let mut warnings = Vec::new();
        for arg in parts {
            let (key, value) = arg
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| LineError::Recoverable(format!("malformed argument '{arg}'")))?;
            match key {
                "cost" => entry.cost = parse_number(key, value)?,
                "initial_cost" => entry.initial_cost = parse_number(key, value)?,
                "energy_cost" => entry.energy_cost = parse_number(key, value)?,
                "addl_time_cost" => entry.addl_time_cost = parse_number(key, value)?,
                "prob_fail" => {
                    let p: f64 = parse_number(key, value)?;
                    if !(0.0..=1.0).contains(&p) {
                        return Err(LineError::Recoverable(format!(
                            "prob_fail {p} outside [0, 1]"
                        )));
                    }
                    entry.prob_fail = p;
                }
                "redundancy" => {
                    let r: f64 = parse_number(key, value)?;
                    if !r.is_finite() {
                        return Err(LineError::Recoverable(format!("invalid redundancy '{value}'")));
                    }
                    if r < 0.0 {
                        warnings.push(format!("negative redundancy for '{name}'; using 0"));
                    }
                    entry.redundancy = r.max(0.0);
                }
                "inst_code" => {
                    if value.is_empty() || !value.bytes().all(|b| b == b'0' || b == b'1') {
                        return Err(LineError::Recoverable(format!(
                            "inst_code '{value}' is not a bit string"
                        )));
                    }
                    if value.len() > 31 {
                        return Err(LineError::Recoverable("inst_code longer than 31 bits".into()));
                    }
                    match self.code_len {
                        Some(len) if len != value.len() => {
                            return Err(LineError::Recoverable(format!(
                                "inst_code '{value}' must be {len} bits"
                            )));
                        }
                        _ => {}
                    }
                    entry.inst_code = Some(value.to_string());
                }
                _ => {
                    return Err(LineError::Recoverable(format!("unknown key '{key}'")));
                }
            }
        }
        if entry.energy_cost < 0.0 || !entry.energy_cost.is_finite() {
            return Err(LineError::Recoverable("energy_cost must be non-negative".into()));
        }
        Ok((entry, warnings))
    }

    fn push(&mut self, entry: InstEntry, line_no: usize) -> Result<()> {
        if self.entries.len() >= usize::from(u8::MAX) + 1 {
            return Err(CoreError::InvalidConfig(
                "instruction sets are limited to 256 entries".into(),
            ));
        }
        if entry.opcode.is_nop() {
            if self.num_nops != self.entries.len() {
                return Err(CoreError::NopOrdering { line: line_no });
            }
            self.num_nops += 1;
        }
        if let Some(code) = &entry.inst_code {
            self.code_len.get_or_insert(code.len());
        }
        self.by_name.insert(entry.opcode.name(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    fn rebuild_weights(&mut self) {
        self.weights = WeightedIndex::new(self.entries.iter().map(|e| e.redundancy)).ok();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[InstEntry] {
        &self.entries
    }

    /// Entry for `inst`; out-of-range bytes resolve to entry 0.
    #[must_use]
    pub fn entry(&self, inst: Instruction) -> &InstEntry {
        self.entries.get(inst.op()).unwrap_or(&self.entries[0])
    }

    #[must_use]
    pub fn opcode(&self, inst: Instruction) -> Opcode {
        self.entry(inst).opcode
    }

    #[must_use]
    pub fn num_nops(&self) -> usize {
        self.num_nops
    }

    #[must_use]
    pub fn is_nop(&self, inst: Instruction) -> bool {
        inst.op() < self.num_nops
    }

    /// Modifier value of a no-op: its position among the no-ops.
    #[must_use]
    pub fn nop_mod(&self, inst: Instruction) -> Option<usize> {
        self.is_nop(inst).then_some(inst.op())
    }

    #[must_use]
    pub fn name(&self, inst: Instruction) -> &'static str {
        self.opcode(inst).name()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<Instruction> {
        self.by_name.get(name).map(|&i| Instruction(i as u8))
    }

    #[must_use]
    pub fn find_opcode(&self, opcode: Opcode) -> Option<Instruction> {
        self.find(opcode.name())
    }

    /// Bit length of `inst_code` values, if any entry defines one.
    #[must_use]
    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    #[must_use]
    pub fn default_instruction(&self) -> Instruction {
        Instruction(0)
    }

    /// Draws an instruction weighted by redundancy; `None` when every weight is zero.
    pub fn random_instruction<R: Rng>(&self, rng: &mut R) -> Option<Instruction> {
        self.weights
            .as_ref()
            .map(|w| Instruction(w.sample(rng) as u8))
    }

    /// Re-emits a description that loads back to an identical table.
    #[must_use]
    pub fn to_description(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&format!(
                "INST {}:cost={},initial_cost={},energy_cost={},addl_time_cost={},prob_fail={},redundancy={}",
                e.opcode.name(),
                e.cost,
                e.initial_cost,
                e.energy_cost,
                e.addl_time_cost,
                e.prob_fail,
                e.redundancy
            ));
            if let Some(code) = &e.inst_code {
                out.push_str(&format!(",inst_code={code}"));
            }
            out.push('\n');
        }
        out
    }

    /// Parses genome text: one instruction name per line.
    pub fn parse_sequence(&self, text: &str) -> Result<Sequence> {
        let mut seq = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let inst = self.find(line).ok_or_else(|| CoreError::UnknownName {
                line: idx + 1,
                name: line.to_string(),
            })?;
            seq.push(inst);
        }
        Ok(seq)
    }

    #[must_use]
    pub fn format_sequence(&self, seq: &[Instruction]) -> String {
        let mut out = String::with_capacity(seq.len() * 8);
        for &inst in seq {
            out.push_str(self.name(inst));
            out.push('\n');
        }
        out
    }

    /// Compact one-line rendering, names joined by spaces.
    #[must_use]
    pub fn sequence_string(&self, seq: &[Instruction]) -> String {
        seq.iter()
            .map(|&i| self.name(i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.to_description().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn load(text: &str) -> (Result<InstSet>, Feedback) {
        let mut fb = Feedback::new();
        let set = InstSet::from_description(text, &mut fb);
        (set, fb)
    }

    #[test]
    fn test_basic_load() {
        let (set, fb) = load("INST nop-A\nINST nop-B\n# comment\n\nINST inc:cost=3,initial_cost=2\n");
        let set = set.unwrap();
        assert!(!fb.has_errors());
        assert_eq!(set.len(), 3);
        assert_eq!(set.num_nops(), 2);
        let inc = set.find("inc").unwrap();
        assert_eq!(set.entry(inc).cost, 3);
        assert_eq!(set.entry(inc).initial_cost, 2);
        assert_eq!(set.nop_mod(Instruction(1)), Some(1));
        assert_eq!(set.nop_mod(inc), None);
    }

    #[test]
    fn test_unknown_opcode_is_fatal_with_suggestion() {
        let (set, fb) = load("INST nop-A\nINST h-cpy\n");
        match set {
            Err(CoreError::UnknownInstruction { name, suggestion }) => {
                assert_eq!(name, "h-cpy");
                assert_eq!(suggestion.as_deref(), Some("h-copy"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(fb.has_errors());
    }

    #[test]
    fn test_nop_after_non_nop_is_fatal() {
        let (set, _) = load("INST nop-A\nINST inc\nINST nop-B\n");
        assert_eq!(set.unwrap_err(), CoreError::NopOrdering { line: 3 });
    }

    #[test]
    fn test_bad_value_rejects_only_its_line() {
        let (set, fb) = load("INST nop-A\nINST inc:cost=abc\nINST dec:bogus=1\nINST add\n");
        let set = set.unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.find("inc").is_none());
        assert!(set.find("add").is_some());
        assert_eq!(fb.errors().count(), 2);
    }

    #[test]
    fn test_negative_redundancy_warns_and_zeroes() {
        let (set, fb) = load("INST nop-A\nINST inc:redundancy=-2\n");
        let set = set.unwrap();
        assert_eq!(set.entry(Instruction(1)).redundancy, 0.0);
        assert!(!fb.has_errors());
        assert_eq!(fb.warnings().count(), 1);
    }

    #[test]
    fn test_colon_and_comma_separators() {
        let (set, _) = load("INST nop-A:redundancy=2:cost=3\n");
        let binding = set.unwrap();
        let e = &binding.entries()[0];
        assert_eq!(e.redundancy, 2.0);
        assert_eq!(e.cost, 3);
    }

    #[test]
    fn test_inst_code_length_is_fixed_by_first_entry() {
        let (set, fb) = load("INST nop-A:inst_code=101\nINST nop-B:inst_code=11\nINST inc:inst_code=011\n");
        let set = set.unwrap();
        assert_eq!(set.code_len(), Some(3));
        assert_eq!(set.len(), 2);
        assert_eq!(fb.errors().count(), 1);
        assert_eq!(set.entry(Instruction(1)).code_value(), Some(3));
    }

    #[test]
    fn test_weighted_random_instruction() {
        let (set, _) = load(
            "INST nop-A:redundancy=1\nINST nop-B:redundancy=1\nINST inc:redundancy=2\nINST h-divide:redundancy=0\n",
        );
        let set = set.unwrap();
        let inc = set.find("inc").unwrap();
        let divide = set.find("h-divide").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut inc_hits = 0;
        for _ in 0..10_000 {
            let inst = set.random_instruction(&mut rng).unwrap();
            assert_ne!(inst, divide);
            if inst == inc {
                inc_hits += 1;
            }
        }
        let freq = f64::from(inc_hits) / 10_000.0;
        assert!((freq - 0.5).abs() < 0.03, "inc frequency {freq}");
    }

    #[test]
    fn test_all_zero_weights_disable_random_instruction() {
        let (set, fb) = load("INST nop-A:redundancy=0\n");
        let set = set.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(set.random_instruction(&mut rng).is_none());
        assert_eq!(fb.warnings().count(), 1);
    }

    #[test]
    fn test_description_roundtrip() {
        let text = "INST nop-A:redundancy=0.25\nINST nop-B\nINST inc:cost=4,prob_fail=0.125,inst_code=0110\nINST h-copy:energy_cost=1.5,addl_time_cost=2\n";
        let (first, _) = load(text);
        let first = first.unwrap();
        let (second, _) = load(&first.to_description());
        assert_eq!(second.unwrap(), first);
    }

    #[test]
    fn test_sequence_text_roundtrip() {
        let (set, _) = load("INST nop-A\nINST nop-B\nINST inc\n");
        let set = set.unwrap();
        let seq = set.parse_sequence("inc\n# comment\nnop-B\n\nnop-A\n").unwrap();
        assert_eq!(seq, vec![Instruction(2), Instruction(1), Instruction(0)]);
        assert_eq!(set.parse_sequence(&set.format_sequence(&seq)).unwrap(), seq);
        assert!(matches!(
            set.parse_sequence("inc\nbogus\n"),
            Err(CoreError::UnknownName { line: 2, .. })
        ));
    }
}
